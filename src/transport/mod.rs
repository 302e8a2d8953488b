mod http_transport;
mod prepared_upstream;

pub use http_transport::{HttpTransport, UpstreamReply};
pub use prepared_upstream::PreparedUpstream;
