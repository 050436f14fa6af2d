//! HTTP transport to the generation provider.

mod http;

pub use http::{HttpTransport, TransportError};
