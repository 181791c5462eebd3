//! Utility modules shared by the provider adapters.
//!
//! - [`HttpClient`]: reqwest client with the configured timeouts

mod http;

pub use http::{HttpClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
