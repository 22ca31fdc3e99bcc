//! Schedule tools (`/schedules`).

use serde_json::Value;

use super::args::{Args, Payload};
use super::ToolHandler;
use crate::client::{ApiFamily, CalClient, RemoteRequest};
use crate::error::ToolError;

const SCHEDULE: &str = "Schedule";

fn schedule_body(args: &Args, payload: Payload) -> Result<Payload, ToolError> {
    Ok(payload
        .field_opt("availability", args.optional_array("availability")?)
        .field_opt("overrides", args.optional_array("overrides")?))
}

/// `cal_get_all_schedules`
#[derive(Debug)]
pub struct GetAllSchedulesHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetAllSchedulesHandler {
    async fn execute(&self, _args: Args) -> Result<Value, ToolError> {
        tracing::info!("Requesting Cal.com schedules");
        self.client
            .send(
                RemoteRequest::get(ApiFamily::Schedules, &["schedules", ""])
                    .action("get Cal.com schedules"),
            )
            .await
    }
}

/// `cal_create_a_schedule`
#[derive(Debug)]
pub struct CreateScheduleHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for CreateScheduleHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let name = args.required_str("name")?;
        let time_zone = args.required_str("timeZone")?;
        let is_default = args.required_bool("isDefault")?;

        let payload = Payload::new()
            .field("name", name.as_str())
            .field("timeZone", time_zone)
            .field("isDefault", is_default);
        let body = schedule_body(&args, payload)?.build();

        tracing::info!("Creating schedule '{}'", name);
        self.client
            .send(
                RemoteRequest::post(ApiFamily::Schedules, &["schedules", ""])
                    .action("create schedule")
                    .json(body),
            )
            .await
    }
}

/// `cal_update_a_schedule`
#[derive(Debug)]
pub struct UpdateScheduleHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for UpdateScheduleHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_int("schedule_id")?.to_string();

        let payload = Payload::new()
            .field_opt("name", args.optional_str("name")?)
            .field_opt("timeZone", args.optional_str("timeZone")?)
            .field_opt("isDefault", args.optional_bool("isDefault")?);
        let body = schedule_body(&args, payload)?.build();

        tracing::info!("Updating schedule with ID: {}", id);
        self.client
            .send(
                RemoteRequest::patch(ApiFamily::Schedules, &["schedules", id.as_str()])
                    .action("update schedule")
                    .lookup(SCHEDULE, id.as_str())
                    .json(body),
            )
            .await
    }
}

/// `cal_get_default_schedule`
#[derive(Debug)]
pub struct GetDefaultScheduleHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetDefaultScheduleHandler {
    async fn execute(&self, _args: Args) -> Result<Value, ToolError> {
        tracing::info!("Requesting default schedule");
        self.client
            .send(
                RemoteRequest::get(ApiFamily::Schedules, &["schedules", "default"])
                    .action("get default schedule"),
            )
            .await
    }
}

/// `cal_get_schedule`
#[derive(Debug)]
pub struct GetScheduleHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for GetScheduleHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_int("schedule_id")?.to_string();

        tracing::info!("Requesting schedule with ID: {}", id);
        self.client
            .send(
                RemoteRequest::get(ApiFamily::Schedules, &["schedules", id.as_str()])
                    .action("get schedule")
                    .lookup(SCHEDULE, id.as_str()),
            )
            .await
    }
}

/// `cal_delete_a_schedule`
#[derive(Debug)]
pub struct DeleteScheduleHandler {
    pub client: CalClient,
}

#[async_trait::async_trait]
impl ToolHandler for DeleteScheduleHandler {
    async fn execute(&self, args: Args) -> Result<Value, ToolError> {
        let id = args.required_int("schedule_id")?.to_string();

        tracing::info!("Deleting schedule with ID: {}", id);
        self.client
            .send(
                RemoteRequest::delete(ApiFamily::Schedules, &["schedules", id.as_str()])
                    .action("delete schedule")
                    .lookup(SCHEDULE, id.as_str()),
            )
            .await
    }
}
