//! Billing functions over HTTP

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use wellspring_api::{BillingStatus, CheckoutRequest, RedirectUrl};
use wellspring_billing_api::{BearerToken, BillingBackend, BillingResult};
use wellspring_config::BillingSettings;

use crate::client::{build_client, post, send_json};

/// Billing backend calling the hosted billing functions
pub struct HttpBilling {
    client: Client,
    settings: BillingSettings,
}

impl HttpBilling {
    pub fn new(settings: BillingSettings) -> BillingResult<Self> {
        let client = build_client(settings.request_timeout)?;
        Ok(Self { client, settings })
    }

    fn api_key(&self) -> Option<&str> {
        self.settings.api_key.as_deref()
    }
}

#[async_trait]
impl BillingBackend for HttpBilling {
    async fn check_subscription(&self, token: &BearerToken) -> BillingResult<BillingStatus> {
        let url = self.settings.check_subscription_url();
        debug!(url = %url, "Checking subscription");

        let request = post(&self.client, &url, self.api_key(), Some(token));
        send_json(request).await
    }

    async fn create_checkout(
        &self,
        request: &CheckoutRequest,
        token: Option<&BearerToken>,
    ) -> BillingResult<RedirectUrl> {
        let url = self.settings.create_checkout_url();
        info!(
            plan = %request.price_type,
            guest = token.is_none(),
            "Creating checkout session"
        );

        let http = post(&self.client, &url, self.api_key(), token).json(request);
        send_json(http).await
    }

    async fn customer_portal(&self, token: &BearerToken) -> BillingResult<RedirectUrl> {
        let url = self.settings.customer_portal_url();
        info!("Opening customer portal session");

        let request = post(&self.client, &url, self.api_key(), Some(token));
        send_json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wellspring_api::Plan;
    use wellspring_billing_api::BillingError;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn billing_for(server: &MockServer) -> HttpBilling {
        let mut settings = BillingSettings::with_base_url(server.uri());
        settings.api_key = Some("anon".into());
        HttpBilling::new(settings).unwrap()
    }

    #[tokio::test]
    async fn status_sends_bearer_and_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .and(header("authorization", "Bearer tok-1"))
            .and(header("apikey", "anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subscribed": true,
                "plan": "monthly",
                "subscription_end": "2026-03-01T00:00:00Z"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let status = billing
            .check_subscription(&BearerToken::new("tok-1"))
            .await
            .unwrap();

        assert!(status.subscribed);
        assert_eq!(status.plan, Some(Plan::Monthly));
        assert!(status.subscription_end.is_some());
    }

    #[tokio::test]
    async fn status_absent_fields_mean_unsubscribed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let status = billing
            .check_subscription(&BearerToken::new("t"))
            .await
            .unwrap();

        assert_eq!(status, BillingStatus::default());
    }

    #[tokio::test]
    async fn status_401_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "error": "JWT expired" })),
            )
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let err = billing
            .check_subscription(&BearerToken::new("old"))
            .await
            .unwrap_err();

        match err {
            BillingError::Unauthorized(message) => assert_eq!(message, "JWT expired"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_body_is_folded_into_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({ "error": "Stripe unavailable" })),
            )
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let err = billing
            .check_subscription(&BearerToken::new("t"))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Request failed with status 500: Stripe unavailable"
        );
    }

    #[tokio::test]
    async fn ok_status_with_error_field_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "error": "No customer" })),
            )
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        assert!(billing
            .check_subscription(&BearerToken::new("t"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_plan_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/check-subscription"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "subscribed": true, "plan": "weekly" })),
            )
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let err = billing
            .check_subscription(&BearerToken::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Decode(_)));
    }

    #[tokio::test]
    async fn guest_checkout_sends_no_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-checkout"))
            .and(body_json(json!({ "priceType": "annual" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://checkout.example.com/c/pay/cs_1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let url = billing
            .create_checkout(
                &CheckoutRequest {
                    price_type: Plan::Annual,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(url.as_str(), "https://checkout.example.com/c/pay/cs_1");

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn portal_returns_redirect_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/customer-portal"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "url": "https://billing.example.com/p/session/abc"
            })))
            .mount(&server)
            .await;

        let billing = billing_for(&server).await;
        let url = billing
            .customer_portal(&BearerToken::new("tok"))
            .await
            .unwrap();
        assert_eq!(url.url, "https://billing.example.com/p/session/abc");
    }

    #[tokio::test]
    async fn unreachable_server_is_transport_error() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let billing = HttpBilling::new(BillingSettings::with_base_url(uri)).unwrap();
        let err = billing
            .check_subscription(&BearerToken::new("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Transport(_)));
    }
}
