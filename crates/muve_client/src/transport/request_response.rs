//! One-shot HTTP transport: each message is a POST, each 2xx body is a response.

use reqwest::header::CONTENT_TYPE;

use super::{Callback, Transport, TransportKind};
use crate::endpoint::Endpoint;
use crate::error::TransportError;

/// Request/response transport. Nothing is opened until [`send`](Transport::send).
///
/// Sends are independent: no queuing, no ordering between responses, no
/// cancellation of in-flight requests. The callback is fixed for the
/// transport's lifetime.
pub struct RequestResponseTransport {
    url: String,
    client: reqwest::Client,
    callback: Callback,
}

impl RequestResponseTransport {
    pub fn new(endpoint: &Endpoint, callback: Callback) -> Self {
        Self::with_client(endpoint, callback, reqwest::Client::new())
    }

    pub fn with_client(endpoint: &Endpoint, callback: Callback, client: reqwest::Client) -> Self {
        Self {
            url: endpoint.http_url(),
            client,
            callback,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for RequestResponseTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::RequestResponse
    }

    /// Spawns the request on the current Tokio runtime.
    fn send(&self, message: String) {
        let client = self.client.clone();
        let url = self.url.clone();
        let callback = self.callback.clone();
        tokio::spawn(async move {
            match post(&client, &url, message).await {
                Ok(body) => {
                    tracing::debug!(url = %url, bytes = body.len(), "response received");
                    callback(body);
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "request failed"),
            }
        });
    }
}

async fn post(client: &reqwest::Client, url: &str, message: String) -> Result<String, TransportError> {
    let resp = client
        .post(url)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(message)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(TransportError::Status(status.as_u16()));
    }
    Ok(resp.text().await?)
}
