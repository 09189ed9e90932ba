//! Compliance recording functions over HTTP

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use wellspring_api::{ComplianceKind, ComplianceRecord};
use wellspring_billing_api::{BearerToken, BillingResult, ComplianceSink};
use wellspring_config::Settings;

use crate::client::{build_client, post, send_unit};

/// Sends audit, consent and waiver records to their recording functions
pub struct HttpComplianceSink {
    client: Client,
    api_key: Option<String>,
    audit_url: String,
    consent_url: String,
    waiver_url: String,
}

impl HttpComplianceSink {
    pub fn new(settings: &Settings) -> BillingResult<Self> {
        Ok(Self {
            client: build_client(settings.billing.request_timeout)?,
            api_key: settings.billing.api_key.clone(),
            audit_url: settings.compliance_url(ComplianceKind::Audit),
            consent_url: settings.compliance_url(ComplianceKind::Consent),
            waiver_url: settings.compliance_url(ComplianceKind::Waiver),
        })
    }

    fn url_for(&self, kind: ComplianceKind) -> &str {
        match kind {
            ComplianceKind::Audit => &self.audit_url,
            ComplianceKind::Consent => &self.consent_url,
            ComplianceKind::Waiver => &self.waiver_url,
        }
    }
}

#[async_trait]
impl ComplianceSink for HttpComplianceSink {
    async fn submit(
        &self,
        kind: ComplianceKind,
        record: &ComplianceRecord,
        token: &BearerToken,
    ) -> BillingResult<()> {
        let url = self.url_for(kind);
        debug!(url = %url, kind = %kind, action = %record.action, "Submitting compliance record");

        let request = post(&self.client, url, self.api_key.as_deref(), Some(token)).json(record);
        send_unit(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wellspring_config::parse_config;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        let toml = format!(
            r#"
            config_version = 1

            [billing]
            base_url = "{}"
            "#,
            server.uri()
        );
        parse_config(&toml).unwrap()
    }

    #[tokio::test]
    async fn consent_goes_to_consent_function() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/record-consent"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "action": "consent_granted",
                "table_name": "consent_records",
                "metadata": {
                    "consent_type": "health_data",
                    "granted": true,
                    "policy_version": "2025-01"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let sink = HttpComplianceSink::new(&settings_for(&server)).unwrap();
        sink.submit(
            ComplianceKind::Consent,
            &ComplianceRecord::consent("health_data", true, "2025-01"),
            &BearerToken::new("tok"),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn rejected_record_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sign-waiver"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "error": "signed_name required" })),
            )
            .mount(&server)
            .await;

        let sink = HttpComplianceSink::new(&settings_for(&server)).unwrap();
        let err = sink
            .submit(
                ComplianceKind::Waiver,
                &ComplianceRecord::waiver("v3", ""),
                &BearerToken::new("tok"),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("signed_name required"));
    }
}
