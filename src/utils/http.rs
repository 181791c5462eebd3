//! HTTP client utilities.

use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for a whole provider call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for establishing a connection
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared HTTP client used by every provider adapter
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
}

impl HttpClient {
    /// Create a new HTTP client with default timeouts
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_timeouts(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new HTTP client with explicit timeouts
    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clients_share_connection_pool() {
        let client = HttpClient::new().unwrap();
        let shared = HttpClient::from_client(client.client.clone());
        assert!(Arc::ptr_eq(&client.client, &shared.client));
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .match_header(
                "user-agent",
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .with_status(204)
            .create_async()
            .await;

        let client =
            HttpClient::with_timeouts(Duration::from_secs(5), DEFAULT_CONNECT_TIMEOUT).unwrap();
        let response = client
            .client()
            .get(format!("{}/ping", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 204);
        mock.assert_async().await;
    }
}
