//! Verified email and phone tools (`/verified-resources`).

use serde_json::Value;

use super::args::{Args, Payload};
use super::ToolHandler;
use crate::client::{ApiFamily, CalClient, RemoteRequest};
use crate::error::ToolError;

const ROOT: &str = "verified-resources";

/// `cal_request_email_verification_code`
#[derive(Debug)]
pub struct RequestEmailCodeHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for RequestEmailCodeHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let email = args.required_str("email")?;

        tracing::info!("Requesting email verification code");
        self.client
            .send(
                RemoteRequest::post(
                    ApiFamily::VerifiedResources,
                    &[ROOT, "emails", "verification-code", "request"],
                )
                .action("request email verification code")
                .json(Payload::new().field("email", email).build()),
            )
            .await
    }
}

/// `cal_verify_email_code`
///
/// The code is sent as a string even when the caller passes a number.
#[derive(Debug)]
pub struct VerifyEmailCodeHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for VerifyEmailCodeHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let email = args.required_str("email")?;
        let code = args.required_text("code")?;

        tracing::info!("Verifying email with code");
        self.client
            .send(
                RemoteRequest::post(
                    ApiFamily::VerifiedResources,
                    &[ROOT, "emails", "verification-code", "verify"],
                )
                .action("verify email")
                .json(Payload::new().field("email", email).field("code", code).build()),
            )
            .await
    }
}

/// `cal_get_verified_emails`
#[derive(Debug)]
pub struct GetVerifiedEmailsHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetVerifiedEmailsHandler {
    async fn execute(&self, _args: Args) -> Result<Value, ToolError> {
        tracing::info!("Requesting list of verified emails");
        self.client
            .send(
                RemoteRequest::get(ApiFamily::VerifiedResources, &[ROOT, "emails"])
                    .action("get verified emails"),
            )
            .await
    }
}

/// `cal_get_verified_email_by_id`
#[derive(Debug)]
pub struct GetVerifiedEmailHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetVerifiedEmailHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_int("email_id")?.to_string();

        tracing::info!("Requesting verified email with ID: {}", id);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::VerifiedResources, &[ROOT, "emails", id.as_str()])
                    .action("get verified email")
                    .lookup("Verified email", id.as_str()),
            )
            .await
    }
}

/// `cal_get_verified_phones`
///
/// `take` and `skip` go out as given. The 1..=250 range on `take` is
/// advertised in the schema and left to the API to enforce.
#[derive(Debug)]
pub struct GetVerifiedPhonesHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetVerifiedPhonesHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let take = args.optional_int("take")?;
        let skip = args.optional_int("skip")?;

        tracing::info!("Requesting verified phones (take: {:?}, skip: {:?})", take, skip);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::VerifiedResources, &[ROOT, "phones"])
                    .action("get verified phones")
                    .query_opt("take", take)
                    .query_opt("skip", skip),
            )
            .await
    }
}

/// `cal_get_verified_phone_by_id`
#[derive(Debug)]
pub struct GetVerifiedPhoneHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetVerifiedPhoneHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_int("phone_id")?.to_string();

        tracing::info!("Requesting verified phone with ID: {}", id);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::VerifiedResources, &[ROOT, "phones", id.as_str()])
                    .action("get verified phone")
                    .lookup("Verified phone", id.as_str()),
            )
            .await
    }
}
