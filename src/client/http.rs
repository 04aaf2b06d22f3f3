//! reqwest-backed transport

use super::{ByteStream, ClientConfig, ClientError, Endpoint, StreamRequest, Transport};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use std::time::Duration;

pub struct HttpTransport {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        // Endpoints resolve relative to the base, so a path prefix such as
        // `/trainy` must end in a slash to survive the join
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .map_err(|e| ClientError::invalid_url(format!("Invalid base URL {}: {e}", config.base_url)))?;

        // No overall timeout on the client: event streams stay open for as
        // long as the backend keeps working
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url, ClientError> {
        self.base_url
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|e| ClientError::invalid_url(format!("{}: {e}", endpoint.path())))
    }

    async fn check_status(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::status(status.as_u16(), &body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ByteStream, ClientError> {
        let url = self.url(request.endpoint)?;
        let builder = match &request.body {
            Some(body) => self.client.post(url).json(body),
            None => self.client.get(url),
        };

        tracing::debug!(path = request.endpoint.path(), "Opening event stream");
        let response = builder
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&request.query)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }

    async fn post_json(&self, endpoint: Endpoint, body: &Value) -> Result<Value, ClientError> {
        let response = self
            .client
            .post(self.url(endpoint)?)
            .timeout(self.request_timeout)
            .json(body)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::network(format!("Failed to read response: {e}")))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::decode(format!("Failed to parse response: {e} - body: {text}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_urls_join_base() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:8000".to_string(),
            ..ClientConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url(Endpoint::ImportProgress).unwrap().as_str(),
            "http://127.0.0.1:8000/api/v1/import/stream"
        );
        assert_eq!(
            transport.url(Endpoint::CoachingAccept).unwrap().as_str(),
            "http://127.0.0.1:8000/api/v1/coaching/accept-proposal"
        );
    }

    #[test]
    fn test_endpoint_urls_keep_base_path() {
        for base_url in ["http://127.0.0.1:8000/trainy", "http://127.0.0.1:8000/trainy/"] {
            let config = ClientConfig {
                base_url: base_url.to_string(),
                ..ClientConfig::default()
            };
            let transport = HttpTransport::new(&config).unwrap();
            assert_eq!(
                transport.url(Endpoint::ImportProgress).unwrap().as_str(),
                "http://127.0.0.1:8000/trainy/api/v1/import/stream"
            );
            assert_eq!(
                transport.url(Endpoint::PlanningRefine).unwrap().as_str(),
                "http://127.0.0.1:8000/trainy/api/v1/planned-workouts/refine/stream"
            );
        }
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        let err = HttpTransport::new(&config).err().unwrap();
        assert_eq!(err.kind, crate::client::error::ClientErrorKind::InvalidUrl);
    }
}
