//! Static tool descriptors advertised through `tools/list`.

use serde::Serialize;
use serde_json::{json, Value};

use super::webhooks::WEBHOOK_TRIGGERS;

/// Name, description and JSON input schema of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    fn new(name: &'static str, description: &'static str, input_schema: Value) -> Self {
        Self {
            name,
            description,
            input_schema,
        }
    }

    /// Names listed under the schema's `required` key
    pub fn required_fields(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|fields| fields.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

fn no_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

fn id_parameter(name: &str, kind: &str, description: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            name: {
                "type": kind,
                "description": description
            }
        },
        "required": [name]
    })
}

/// `take` is only forwarded when supplied
const TAKE_DESCRIPTION: &str =
    "Number of records to return (max: 250). When omitted, Cal.com applies its own default.";

fn pagination() -> Value {
    json!({
        "type": "object",
        "properties": {
            "take": {
                "type": "integer",
                "description": TAKE_DESCRIPTION,
                "minimum": 1,
                "maximum": 250
            },
            "skip": {
                "type": "integer",
                "description": "Number of records to skip for pagination",
                "minimum": 0
            }
        },
        "required": []
    })
}

fn time_block(date_field: (&str, Value)) -> Value {
    let (field, schema) = date_field;
    json!({
        "type": "object",
        "properties": {
            field: schema,
            "startTime": {
                "type": "string",
                "description": "Start time in HH:mm format (e.g., '09:00')"
            },
            "endTime": {
                "type": "string",
                "description": "End time in HH:mm format (e.g., '17:00')"
            }
        }
    })
}

fn availability_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": time_block(("days", json!({
            "type": "array",
            "items": { "type": "string" },
            "description": "Capitalized day names (e.g., ['Monday','Tuesday'])"
        })))
    })
}

fn overrides_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": time_block(("date", json!({
            "type": "string",
            "description": "Date in YYYY-MM-DD format (e.g., '2023-12-31')"
        })))
    })
}

fn triggers_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "description": description,
        "items": {
            "type": "string",
            "enum": WEBHOOK_TRIGGERS
        }
    })
}

/// Every tool this server exposes, in presentation order
pub fn catalog() -> Vec<ToolDescriptor> {
    vec![
        // Schedules
        ToolDescriptor::new(
            "cal_get_all_schedules",
            "Retrieve all schedules from Cal.com API.",
            no_parameters(),
        ),
        ToolDescriptor::new(
            "cal_create_a_schedule",
            "Create a new schedule in Cal.com.",
            json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Name of the new schedule"
                    },
                    "timeZone": {
                        "type": "string",
                        "description": "Time zone ID (e.g., 'America/New_York')"
                    },
                    "isDefault": {
                        "type": "boolean",
                        "description": "Whether this should be the default schedule"
                    },
                    "availability": availability_schema("List of availability blocks"),
                    "overrides": overrides_schema("Date-specific overrides")
                },
                "required": ["name", "timeZone", "isDefault"]
            }),
        ),
        ToolDescriptor::new(
            "cal_update_a_schedule",
            "Update an existing schedule in Cal.com.",
            json!({
                "type": "object",
                "properties": {
                    "schedule_id": {
                        "type": "integer",
                        "description": "ID of the schedule to update"
                    },
                    "name": {
                        "type": "string",
                        "description": "Updated schedule name"
                    },
                    "timeZone": {
                        "type": "string",
                        "description": "Updated time zone ID (e.g., 'America/New_York')"
                    },
                    "isDefault": {
                        "type": "boolean",
                        "description": "Whether to make this the default schedule"
                    },
                    "availability": availability_schema("Updated availability blocks"),
                    "overrides": overrides_schema("Updated date overrides")
                },
                "required": ["schedule_id"]
            }),
        ),
        ToolDescriptor::new(
            "cal_get_default_schedule",
            "Get the default schedule from Cal.com.",
            no_parameters(),
        ),
        ToolDescriptor::new(
            "cal_get_schedule",
            "Get a specific schedule by its ID.",
            id_parameter("schedule_id", "integer", "ID of the schedule to retrieve"),
        ),
        ToolDescriptor::new(
            "cal_delete_a_schedule",
            "Delete a schedule by its ID.",
            id_parameter("schedule_id", "integer", "ID of the schedule to delete"),
        ),
        // Verified resources
        ToolDescriptor::new(
            "cal_request_email_verification_code",
            "Request an email verification code from Cal.com API.",
            json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "Email address to verify",
                        "format": "email"
                    }
                },
                "required": ["email"]
            }),
        ),
        ToolDescriptor::new(
            "cal_verify_email_code",
            "Verify an email address with the received verification code.",
            json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "Email address to verify",
                        "format": "email"
                    },
                    "code": {
                        "type": "string",
                        "description": "Verification code received via email"
                    }
                },
                "required": ["email", "code"]
            }),
        ),
        ToolDescriptor::new(
            "cal_get_verified_emails",
            "Retrieve all verified emails from Cal.com API.",
            no_parameters(),
        ),
        ToolDescriptor::new(
            "cal_get_verified_email_by_id",
            "Get a specific verified email by its ID from Cal.com.",
            id_parameter("email_id", "integer", "ID of the verified email to retrieve"),
        ),
        ToolDescriptor::new(
            "cal_get_verified_phones",
            "Retrieve verified phone numbers with pagination support.",
            pagination(),
        ),
        ToolDescriptor::new(
            "cal_get_verified_phone_by_id",
            "Get a specific verified phone number by its ID from Cal.com.",
            id_parameter("phone_id", "integer", "ID of the verified phone to retrieve"),
        ),
        // Webhooks
        ToolDescriptor::new(
            "cal_get_all_webhooks",
            "Retrieve all webhooks with pagination support from Cal.com API.",
            pagination(),
        ),
        ToolDescriptor::new(
            "cal_create_webhook",
            "Create a new webhook in Cal.com.",
            json!({
                "type": "object",
                "properties": {
                    "active": {
                        "type": "boolean",
                        "description": "Whether the webhook is active"
                    },
                    "subscriberUrl": {
                        "type": "string",
                        "description": "URL to receive webhook payloads",
                        "format": "uri"
                    },
                    "triggers": triggers_schema("List of trigger events"),
                    "payloadTemplate": {
                        "type": "string",
                        "description": "Custom payload template (JSON string with Liquid variables)"
                    },
                    "secret": {
                        "type": "string",
                        "description": "Secret for verifying webhooks"
                    }
                },
                "required": ["active", "subscriberUrl", "triggers"]
            }),
        ),
        ToolDescriptor::new(
            "cal_get_webhook",
            "Get a specific webhook by its ID from Cal.com.",
            id_parameter("webhook_id", "string", "ID of the webhook to retrieve"),
        ),
        ToolDescriptor::new(
            "cal_update_webhook",
            "Update an existing webhook in Cal.com.",
            json!({
                "type": "object",
                "properties": {
                    "webhook_id": {
                        "type": "string",
                        "description": "ID of the webhook to update"
                    },
                    "active": {
                        "type": "boolean",
                        "description": "Whether the webhook is active"
                    },
                    "subscriberUrl": {
                        "type": "string",
                        "description": "New URL to receive webhook payloads",
                        "format": "uri"
                    },
                    "triggers": triggers_schema("Updated list of trigger events"),
                    "payloadTemplate": {
                        "type": "string",
                        "description": "Updated payload template (JSON string with Liquid variables)"
                    },
                    "secret": {
                        "type": "string",
                        "description": "New secret for verifying webhooks"
                    }
                },
                "required": ["webhook_id"]
            }),
        ),
        ToolDescriptor::new(
            "cal_delete_webhook",
            "Delete a webhook by its ID from Cal.com.",
            id_parameter("webhook_id", "string", "ID of the webhook to delete"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let tools = catalog();
        let names: HashSet<_> = tools.iter().map(|t| t.name).collect();
        assert_eq!(names.len(), tools.len());
        assert_eq!(tools.len(), 17);
    }

    #[test]
    fn test_required_fields_are_declared_properties() {
        for tool in catalog() {
            let properties = tool.input_schema["properties"].as_object().unwrap();
            for field in tool.required_fields() {
                assert!(
                    properties.contains_key(field),
                    "{} requires undeclared field {}",
                    tool.name,
                    field
                );
            }
        }
    }

    #[test]
    fn test_take_bounds_advertised() {
        let tools = catalog();
        let webhooks = tools.iter().find(|t| t.name == "cal_get_all_webhooks").unwrap();
        let take = &webhooks.input_schema["properties"]["take"];
        assert_eq!(take["minimum"], 1);
        assert_eq!(take["maximum"], 250);
    }

    #[test]
    fn test_take_has_no_advertised_default() {
        for tool in catalog() {
            if let Some(take) = tool.input_schema["properties"].get("take") {
                assert!(take.get("default").is_none(), "{} advertises a default", tool.name);
            }
        }
    }

    #[test]
    fn test_serializes_with_input_schema_key() {
        let value = serde_json::to_value(&catalog()[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
        assert!(value.get("input_schema").is_none());
    }

    #[test]
    fn test_triggers_enum() {
        let tools = catalog();
        let create = tools.iter().find(|t| t.name == "cal_create_webhook").unwrap();
        let triggers = create.input_schema["properties"]["triggers"]["items"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(triggers.len(), WEBHOOK_TRIGGERS.len());
        assert!(triggers.iter().any(|t| t == "BOOKING_CREATED"));
    }
}
