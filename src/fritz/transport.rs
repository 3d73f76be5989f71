use std::time::Duration;

use async_trait::async_trait;

use super::error::{FritzError, Result};

/// Raw response as seen at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Narrow HTTP seam between the protocol logic and the concrete client.
///
/// Protocol modules only ever see status and body, which keeps them
/// testable against a scripted transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> Result<HttpResponse>;
}

/// Production transport backed by a reqwest client.
///
/// Redirects are followed, matching the console's occasional page-level
/// redirects after login.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Ok(Self { client })
    }

    async fn read_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Self::read_response(response).await
    }

    async fn post_form(&self, url: &str, fields: &[(&str, String)]) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .form(fields)
            .send()
            .await
            .map_err(|e| FritzError::Transport(e.to_string()))?;

        Self::read_response(response).await
    }
}
