//! HTTP client for the GreyNoise community endpoint.

use crate::config::GreyNoiseConfig;
use crate::context::RunContext;
use crate::core::{EnrichmentRecord, ReputationLookup};
use crate::reputation::LookupError;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

/// Header carrying the API key.
const API_KEY_HEADER: &str = "key";

/// Looks up addresses with a pooled, explicitly owned HTTP client.
#[derive(Debug, Clone)]
pub struct ReputationClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ReputationClient {
    /// Creates a client from the `[greynoise]` configuration section.
    pub fn new(config: &GreyNoiseConfig) -> Result<Self, LookupError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.max_idle_connections)
            .pool_idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .build()
            .map_err(|e| LookupError::Transport {
                status: None,
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, address: &str) -> String {
        format!("{}/v3/community/{}", self.base_url, address)
    }

    /// Issues the request and maps the response, without cancellation.
    async fn fetch(&self, address: &str) -> Result<EnrichmentRecord, LookupError> {
        let response = self
            .http
            .get(self.endpoint(address))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| LookupError::Transport {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        match status {
            StatusCode::BAD_REQUEST => return Err(LookupError::InvalidRequest),
            StatusCode::UNAUTHORIZED => return Err(LookupError::Auth),
            StatusCode::TOO_MANY_REQUESTS => return Err(LookupError::RateLimited),
            StatusCode::INTERNAL_SERVER_ERROR => return Err(LookupError::Server),
            _ => {}
        }

        let body = response.text().await.map_err(|e| LookupError::Transport {
            status: Some(status.as_u16()),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(LookupError::Transport {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let parsed: CommunityResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(parsed.into_record(address))
    }
}

#[async_trait]
impl ReputationLookup for ReputationClient {
    #[instrument(skip(self, ctx))]
    async fn lookup(
        &self,
        ctx: &RunContext,
        address: &str,
    ) -> Result<EnrichmentRecord, LookupError> {
        if ctx.is_cancelled() {
            return Err(LookupError::Cancelled);
        }

        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(LookupError::Cancelled),
            result = self.fetch(address) => result,
        };
        metrics::histogram!("lookup_duration_seconds").record(start.elapsed().as_secs_f64());

        if let Err(e) = &result {
            debug!(error = %e, "Lookup failed");
        }
        result
    }
}

/// Wire format of a community API response.
#[derive(Debug, Deserialize)]
struct CommunityResponse {
    #[serde(default)]
    ip: Option<String>,
    #[serde(default)]
    noise: bool,
    #[serde(default)]
    riot: bool,
    #[serde(default)]
    classification: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    last_seen: String,
}

impl CommunityResponse {
    fn into_record(self, requested: &str) -> EnrichmentRecord {
        EnrichmentRecord {
            address: self.ip.unwrap_or_else(|| requested.to_string()),
            is_noise: self.noise,
            is_riot: self.riot,
            classification: self.classification,
            actor_name: self.name,
            reference_link: self.link,
            last_seen: self.last_seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ReputationClient {
        let config = GreyNoiseConfig {
            api_key: "test-key".to_string(),
            base_url: server.uri(),
            ..Default::default()
        };
        ReputationClient::new(&config).unwrap()
    }

    async fn respond_with(status: u16, body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/community/1.2.3.4"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_lookup_success_decodes_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/community/1.2.3.4"))
            .and(header("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ip": "1.2.3.4",
                "noise": true,
                "riot": false,
                "classification": "malicious",
                "name": "unknown",
                "link": "https://viz.greynoise.io/ip/1.2.3.4",
                "last_seen": "2024-01-01",
                "message": "Success"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (ctx, _handle) = RunContext::new();
        let record = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap();

        assert_eq!(
            record,
            EnrichmentRecord {
                address: "1.2.3.4".to_string(),
                is_noise: true,
                is_riot: false,
                classification: "malicious".to_string(),
                actor_name: "unknown".to_string(),
                reference_link: "https://viz.greynoise.io/ip/1.2.3.4".to_string(),
                last_seen: "2024-01-01".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_status_codes_map_to_typed_errors() {
        let cases = [
            (400, LookupError::InvalidRequest),
            (401, LookupError::Auth),
            (429, LookupError::RateLimited),
            (500, LookupError::Server),
        ];

        for (status, expected) in cases {
            let server = respond_with(status, "{}").await;
            let (ctx, _handle) = RunContext::new();
            let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();
            assert_eq!(err, expected, "status {status}");
        }
    }

    #[tokio::test]
    async fn test_unexpected_status_is_transport_error_with_body() {
        let server = respond_with(503, "maintenance").await;
        let (ctx, _handle) = RunContext::new();

        let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();

        assert_eq!(
            err,
            LookupError::Transport {
                status: Some(503),
                message: "maintenance".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_not_found_without_ip_is_transport_error() {
        let server = respond_with(404, r#"{"message":"IP not observed"}"#).await;
        let (ctx, _handle) = RunContext::new();

        let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport { status: Some(404), .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = respond_with(200, "not json").await;
        let (ctx, _handle) = RunContext::new();

        let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_ip_field_falls_back_to_requested_address() {
        let server = respond_with(200, r#"{"noise": false}"#).await;
        let (ctx, _handle) = RunContext::new();

        let record = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap();
        assert_eq!(record.address, "1.2.3.4");
        assert!(!record.is_noise);
        assert!(record.classification.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let config = GreyNoiseConfig {
            api_key: "test-key".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let client = ReputationClient::new(&config).unwrap();
        let (ctx, _handle) = RunContext::new();

        let err = client.lookup(&ctx, "1.2.3.4").await.unwrap_err();
        assert!(matches!(err, LookupError::Transport { status: None, .. }));
    }

    #[tokio::test]
    async fn test_deadline_aborts_slow_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"ip": "1.2.3.4"}))
                    .set_delay(Duration::from_secs(10)),
            )
            .mount(&server)
            .await;

        let (ctx, _handle) = RunContext::with_timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();

        assert_eq!(err, LookupError::Cancelled);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_already_cancelled_context_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let (ctx, handle) = RunContext::new();
        handle.cancel();

        let err = client_for(&server).lookup(&ctx, "1.2.3.4").await.unwrap_err();
        assert_eq!(err, LookupError::Cancelled);
    }
}
