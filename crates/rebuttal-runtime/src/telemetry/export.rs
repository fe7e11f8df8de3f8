//! HTTP export of buffered spans.

use serde::Serialize;
use std::time::Duration;

use super::SpanRecord;
use crate::providers::ApiCredential;

const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Resource attributes attached to an export.
#[derive(Debug, Serialize)]
pub struct Resource<'a> {
    #[serde(rename = "service.name")]
    pub service_name: &'a str,
    #[serde(rename = "deployment.environment")]
    pub deployment_environment: &'a str,
}

/// One export request body.
#[derive(Debug, Serialize)]
pub struct ExportBatch<'a> {
    pub resource: Resource<'a>,
    pub spans: &'a [SpanRecord],
}

impl<'a> ExportBatch<'a> {
    pub fn new(service_name: &'a str, environment: &'a str, spans: &'a [SpanRecord]) -> Self {
        Self {
            resource: Resource {
                service_name,
                deployment_environment: environment,
            },
            spans,
        }
    }
}

/// Posts span batches as JSON with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpSpanExporter {
    endpoint: String,
    token: ApiCredential,
    client: reqwest::Client,
}

impl HttpSpanExporter {
    pub fn new(endpoint: impl Into<String>, token: ApiCredential) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(EXPORT_TIMEOUT).build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            token,
            client,
        })
    }

    /// Send one batch; non-2xx responses are errors.
    pub async fn export(&self, batch: &ExportBatch<'_>) -> Result<(), reqwest::Error> {
        self.client
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(batch)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{attributes, SpanStatus};
    use chrono::Utc;

    #[test]
    fn test_batch_serialization() {
        let spans = vec![SpanRecord {
            name: "generate_counter".to_string(),
            attributes: attributes([("agent_side", "con"), ("format", "points")]),
            start: Utc::now(),
            duration_ms: 812,
            status: SpanStatus::Ok,
        }];

        let batch = ExportBatch::new("rebuttal", "prod", &spans);
        let json = serde_json::to_value(&batch).unwrap();

        assert_eq!(json["resource"]["service.name"], "rebuttal");
        assert_eq!(json["resource"]["deployment.environment"], "prod");
        assert_eq!(json["spans"][0]["name"], "generate_counter");
        assert_eq!(json["spans"][0]["status"], "ok");
        assert_eq!(json["spans"][0]["attributes"]["agent_side"], "con");
    }

    #[test]
    fn test_exporter_debug_redacts_token() {
        let token = ApiCredential::new(
            "obs-secret",
            crate::providers::CredentialSource::Programmatic,
            "observability token",
        );
        let exporter = HttpSpanExporter::new("https://traces.example.com", token).unwrap();
        assert!(!format!("{:?}", exporter).contains("obs-secret"));
    }
}
