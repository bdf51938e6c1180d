//! HTTP transport to the display endpoint.
//!
//! The trait seam exists so the publisher and content sync can be exercised
//! against a recording stub; production wires in [`HttpTransport`].

use std::time::Duration;

use expo_core::config::Endpoint;

use crate::error::SyncError;

/// One-way push to the external endpoint.
pub trait Transport: Send + Sync {
    /// POST a JSON body to `{base_url}{path}`.
    fn post_json(&self, path: &str, body: &str) -> Result<(), SyncError>;

    /// POST raw bytes (`application/octet-stream`) to `{base_url}{path}`.
    fn post_bytes(&self, path: &str, body: &[u8]) -> Result<(), SyncError>;
}

/// `ureq`-backed transport with a client-side timeout and a static API key
/// header. The timeout is the bound on every in-flight call at shutdown.
pub struct HttpTransport {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(endpoint: &Endpoint) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .build();
        Self {
            agent,
            base_url: endpoint.base_url.trim_end_matches('/').to_owned(),
            api_key: endpoint.api_key.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, path: &str, body: &str) -> Result<(), SyncError> {
        self.agent
            .post(&self.url(path))
            .set("X-Api-Key", &self.api_key)
            .set("Content-Type", "application/json")
            .send_string(body)
            .map(|_| ())
            .map_err(|err| map_err(path, err))
    }

    fn post_bytes(&self, path: &str, body: &[u8]) -> Result<(), SyncError> {
        self.agent
            .post(&self.url(path))
            .set("X-Api-Key", &self.api_key)
            .set("Content-Type", "application/octet-stream")
            .send_bytes(body)
            .map(|_| ())
            .map_err(|err| map_err(path, err))
    }
}

fn map_err(path: &str, err: ureq::Error) -> SyncError {
    match err {
        ureq::Error::Status(status, _) => SyncError::Status {
            status,
            path: path.to_owned(),
        },
        ureq::Error::Transport(transport) => SyncError::Transport {
            path: path.to_owned(),
            message: transport.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let transport = HttpTransport::new(&Endpoint {
            base_url: "https://boards.example.com/".to_string(),
            api_key: "k".to_string(),
            timeout_secs: 1,
        });
        assert_eq!(
            transport.url("/api/stations/grill"),
            "https://boards.example.com/api/stations/grill"
        );
    }
}
