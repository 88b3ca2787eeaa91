//! The download processor: one TDM article fetch per work item.

use std::time::Duration;

use reqwest::Client;

use crate::error::ProcessingError;
use crate::pipeline::{Artifact, Processor, WorkItem};

const DEFAULT_BASE_URL: &str = "https://api.wiley.com/onlinelibrary/tdm/v1";
const TOKEN_HEADER: &str = "Wiley-TDM-Client-Token";

pub struct TdmClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TdmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Client pointing at a custom base URL (useful for testing).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url,
            api_key,
        }
    }
}

impl Processor for TdmClient {
    /// Fetch the article behind the item's DOI. Any rejection (auth, not
    /// found, throttling by the remote) surfaces as a per-item error and
    /// never aborts the batch.
    async fn process(&self, item: &WorkItem) -> Result<Artifact, ProcessingError> {
        let url = format!("{}/articles/{}", self.base_url, item.locator);
        let response = self
            .client
            .get(&url)
            .header(TOKEN_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProcessingError::RemoteStatus {
                status: status.as_u16(),
                detail,
            });
        }

        let bytes = response.bytes().await?;
        Ok(Artifact::Bytes(bytes.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn successful_fetch_returns_the_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles/10.1111/alpha"))
            .and(header(TOKEN_HEADER, "tdm-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7 stub".as_slice()))
            .mount(&server)
            .await;

        let client = TdmClient::with_base_url("tdm-key".into(), server.uri());
        let artifact = client
            .process(&WorkItem::new("10.1111/alpha"))
            .await
            .unwrap();

        assert_eq!(artifact, Artifact::Bytes(b"%PDF-1.7 stub".to_vec()));
    }

    #[tokio::test]
    async fn rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/articles/10.1111/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such article"))
            .mount(&server)
            .await;

        let client = TdmClient::with_base_url("tdm-key".into(), server.uri());
        let err = client
            .process(&WorkItem::new("10.1111/missing"))
            .await
            .unwrap_err();

        match err {
            ProcessingError::RemoteStatus { status, detail } => {
                assert_eq!(status, 404);
                assert_eq!(detail, "no such article");
            }
            other => panic!("expected RemoteStatus, got {other:?}"),
        }
    }
}
