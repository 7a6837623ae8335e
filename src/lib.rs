pub(crate) mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod normalize;
pub mod observability;
pub mod protocol;
pub mod routing;
pub mod state;
pub mod stream;
pub mod transport;
