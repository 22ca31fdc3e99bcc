//! Webhook tools (`/webhooks`).

use serde_json::Value;

use super::args::{Args, Payload};
use super::ToolHandler;
use crate::client::{ApiFamily, CalClient, RemoteRequest};
use crate::error::ToolError;

const WEBHOOK: &str = "Webhook";

/// Trigger events Cal.com can deliver to a webhook subscriber
pub const WEBHOOK_TRIGGERS: &[&str] = &[
    "BOOKING_CREATED",
    "BOOKING_PAYMENT_INITIATED",
    "BOOKING_PAID",
    "BOOKING_RESCHEDULED",
    "BOOKING_REQUESTED",
    "BOOKING_CANCELLED",
    "BOOKING_REJECTED",
    "BOOKING_NO_SHOW_UPDATED",
    "FORM_SUBMITTED",
    "MEETING_ENDED",
    "MEETING_STARTED",
    "RECORDING_READY",
    "INSTANT_MEETING",
    "RECORDING_TRANSCRIPTION_GENERATED",
    "OOO_CREATED",
    "AFTER_HOSTS_CAL_VIDEO_NO_SHOW",
    "AFTER_GUESTS_CAL_VIDEO_NO_SHOW",
    "FORM_SUBMITTED_NO_EVENT",
];

fn optional_fields(args: &Args, payload: Payload) -> Result<Payload, ToolError> {
    Ok(payload
        .field_opt("payloadTemplate", args.optional_str("payloadTemplate")?)
        .field_opt("secret", args.optional_str("secret")?))
}

/// `cal_get_all_webhooks`
#[derive(Debug)]
pub struct GetAllWebhooksHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetAllWebhooksHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let take = args.optional_int("take")?;
        let skip = args.optional_int("skip")?;

        tracing::info!("Requesting webhooks (take: {:?}, skip: {:?})", take, skip);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::Webhooks, &["webhooks"])
                    .action("get webhooks")
                    .query_opt("take", take)
                    .query_opt("skip", skip),
            )
            .await
    }
}

/// `cal_create_webhook`
#[derive(Debug)]
pub struct CreateWebhookHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for CreateWebhookHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let active = args.required_bool("active")?;
        let subscriber_url = args.required_str("subscriberUrl")?;
        let triggers = args.required_array("triggers")?;

        let payload = Payload::new()
            .field("active", active)
            .field("subscriberUrl", subscriber_url.as_str())
            .field("triggers", triggers);
        let body = optional_fields(&args, payload)?.build();

        tracing::info!("Creating webhook for URL: {}", subscriber_url);
        self.client
            .send(
                RemoteRequest::post(ApiFamily::Webhooks, &["webhooks"])
                    .action("create webhook")
                    .json(body),
            )
            .await
    }
}

/// `cal_get_webhook`
#[derive(Debug)]
pub struct GetWebhookHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetWebhookHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_id("webhook_id")?;

        tracing::info!("Requesting webhook with ID: {}", id);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::Webhooks, &["webhooks", id.as_str()])
                    .action("get webhook")
                    .lookup(WEBHOOK, id.as_str()),
            )
            .await
    }
}

/// `cal_update_webhook`
#[derive(Debug)]
pub struct UpdateWebhookHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for UpdateWebhookHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_id("webhook_id")?;

        let payload = Payload::new()
            .field_opt("active", args.optional_bool("active")?)
            .field_opt("subscriberUrl", args.optional_str("subscriberUrl")?)
            .field_opt("triggers", args.optional_array("triggers")?);
        let body = optional_fields(&args, payload)?.build();

        tracing::info!("Updating webhook with ID: {}", id);
        self.client
            .send(
                RemoteRequest::patch(ApiFamily::Webhooks, &["webhooks", id.as_str()])
                    .action("update webhook")
                    .lookup(WEBHOOK, id.as_str())
                    .json(body),
            )
            .await
    }
}

/// `cal_delete_webhook`
#[derive(Debug)]
pub struct DeleteWebhookHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for DeleteWebhookHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_id("webhook_id")?;

        tracing::info!("Deleting webhook with ID: {}", id);
        self.client
            .send(
                RemoteRequest::delete(ApiFamily::Webhooks, &["webhooks", id.as_str()])
                    .action("delete webhook")
                    .lookup(WEBHOOK, id.as_str()),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{self, AuthToken};
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;

    fn client(url: &str) -> CalClient {
        CalClient::new(url, Duration::from_secs(5)).unwrap()
    }

    async fn run(handler: &dyn ToolHandler, args: Value) -> Result<Value, ToolError> {
        credential::scope(
            AuthToken::new("tok"),
            handler.execute(Args::from_value(args).unwrap()),
        )
        .await
    }

    #[tokio::test]
    async fn test_pagination_passthrough() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/webhooks")
            .match_header("content-type", "application/json")
            .match_query(Matcher::Exact("take=10&skip=5".into()))
            .with_status(200)
            .with_body(r#"{"status":"success","data":[]}"#)
            .create_async()
            .await;

        let handler = GetAllWebhooksHandler {
            client: client(&server.url()),
        };
        run(&handler, json!({ "take": 10, "skip": 5 })).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_webhook_returns_body_unmodified() {
        let body = r#"{"status":"success","data":{"id":123,"userId":456,"subscriberUrl":"https://example.com/hook","active":true,"triggers":["BOOKING_CREATED"]}}"#;
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhooks")
            .match_body(Matcher::Json(json!({
                "active": true,
                "subscriberUrl": "https://example.com/hook",
                "triggers": ["BOOKING_CREATED"]
            })))
            .with_status(201)
            .with_body(body)
            .create_async()
            .await;

        let handler = CreateWebhookHandler {
            client: client(&server.url()),
        };
        let value = run(
            &handler,
            json!({
                "active": true,
                "subscriberUrl": "https://example.com/hook",
                "triggers": ["BOOKING_CREATED"]
            }),
        )
        .await
        .unwrap();

        assert_eq!(value, serde_json::from_str::<Value>(body).unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_webhook_omits_absent_fields() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PATCH", "/webhooks/wh-1")
            .match_body(Matcher::Json(json!({ "active": false, "secret": "s3cret" })))
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let handler = UpdateWebhookHandler {
            client: client(&server.url()),
        };
        run(
            &handler,
            json!({ "webhook_id": "wh-1", "active": false, "secret": "s3cret", "triggers": null }),
        )
        .await
        .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_webhook_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/webhooks/does-not-exist")
            .with_status(404)
            .create_async()
            .await;

        let handler = GetWebhookHandler {
            client: client(&server.url()),
        };
        let err = run(&handler, json!({ "webhook_id": "does-not-exist" }))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Webhook not found with ID: does-not-exist");
    }

    #[tokio::test]
    async fn test_delete_webhook() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/webhooks/77")
            .with_status(200)
            .with_body(r#"{"status":"success"}"#)
            .create_async()
            .await;

        let handler = DeleteWebhookHandler {
            client: client(&server.url()),
        };
        run(&handler, json!({ "webhook_id": 77 })).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_webhook_id_makes_no_request() {
        let mut server = mockito::Server::new_async().await;
        let list = server
            .mock("GET", "/webhooks/")
            .expect(0)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/webhooks/")
            .expect(0)
            .create_async()
            .await;

        let get = GetWebhookHandler {
            client: client(&server.url()),
        };
        let err = run(&get, json!({ "webhook_id": "" })).await.unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("webhook_id".into()));

        let remove = DeleteWebhookHandler {
            client: client(&server.url()),
        };
        let err = run(&remove, json!({ "webhook_id": "   " })).await.unwrap_err();
        assert_eq!(err, ToolError::MissingArgument("webhook_id".into()));

        list.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_webhook_requires_triggers_array() {
        let handler = CreateWebhookHandler {
            client: client("http://127.0.0.1:1"),
        };
        let err = run(
            &handler,
            json!({ "active": true, "subscriberUrl": "https://example.com", "triggers": "BOOKING_CREATED" }),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ToolError::invalid("triggers", "an array"));
    }
}
