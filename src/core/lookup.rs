use crate::domain::model::{Cnpj, LookupRecord};
use crate::domain::ports::{ConfigProvider, LookupService};
use crate::utils::error::{EnrichError, Result};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;

/// HTTP client for the CNPJ registry service (`GET {endpoint}/{14 digits}`).
pub struct LookupClient {
    client: Client,
    endpoint: String,
}

impl LookupClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        Self::new(config.api_endpoint(), config.request_timeout())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn url_for(&self, cnpj: &Cnpj) -> String {
        format!("{}/{}", self.endpoint, cnpj.as_str())
    }
}

#[async_trait::async_trait]
impl LookupService for LookupClient {
    async fn resolve(&self, identifier: &str) -> Result<LookupRecord> {
        let cnpj = Cnpj::parse(identifier)?;
        let url = self.url_for(&cnpj);

        tracing::debug!("Making lookup request to: {}", url);
        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Lookup response status for {}: {}", cnpj, status);
        if !status.is_success() {
            return Err(EnrichError::LookupFailed {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(serde_json::Value::Object(record)) => Ok(record),
            Ok(other) => Err(EnrichError::Decode {
                message: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
            Err(e) => Err(EnrichError::Decode {
                message: e.to_string(),
            }),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> LookupClient {
        LookupClient::new(server.base_url(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_successful_lookup() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/49752997000125")
                .header("Accept", "application/json");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"razao_social": "ACME LTDA", "opcao_pelo_mei": true}));
        });

        let record = client_for(&server)
            .resolve("49.752.997/0001-25")
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(
            record.get("razao_social").and_then(|v| v.as_str()),
            Some("ACME LTDA")
        );
        assert_eq!(record.get("opcao_pelo_mei").and_then(|v| v.as_bool()), Some(true));
    }

    #[tokio::test]
    async fn test_resolve_invalid_identifier_makes_no_request() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET);
            then.status(200).json_body(serde_json::json!({}));
        });

        let result = client_for(&server).resolve("123.456").await;

        assert!(matches!(result, Err(EnrichError::InvalidIdentifier { digits: 6, .. })));
        api_mock.assert_hits(0);
    }

    #[tokio::test]
    async fn test_resolve_http_failure() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/11222333000181");
            then.status(404);
        });

        let result = client_for(&server).resolve("11222333000181").await;

        api_mock.assert();
        assert!(matches!(result, Err(EnrichError::LookupFailed { status: 404 })));
    }

    #[tokio::test]
    async fn test_resolve_invalid_json_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/11222333000181");
            then.status(200).body("<html>not json</html>");
        });

        let result = client_for(&server).resolve("11222333000181").await;
        assert!(matches!(result, Err(EnrichError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_resolve_non_object_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/11222333000181");
            then.status(200).json_body(serde_json::json!([1, 2, 3]));
        });

        let result = client_for(&server).resolve("11222333000181").await;
        match result {
            Err(EnrichError::Decode { message }) => assert!(message.contains("an array")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resolve_connection_refused_is_transport_error() {
        let client = LookupClient::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let result = client.resolve("11222333000181").await;
        assert!(matches!(result, Err(EnrichError::Transport(_))));
    }

    #[tokio::test]
    async fn test_endpoint_trailing_slash_is_trimmed() {
        let client = LookupClient::new("https://minhareceita.org/", Duration::from_secs(1)).unwrap();
        let cnpj = Cnpj::parse("49752997000125").unwrap();
        assert_eq!(client.url_for(&cnpj), "https://minhareceita.org/49752997000125");
    }
}
