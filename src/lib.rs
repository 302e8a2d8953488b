pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod observability;
pub mod passthrough;
pub mod protocol;
pub mod routing;
pub mod state;
pub mod stream;
pub mod synth;
pub mod transport;

mod util;

pub use util::normalize_base_path;
