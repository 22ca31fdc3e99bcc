//! Cal.com tools: handlers, argument parsing and the static catalog.
//!
//! Each handler performs one Cal.com operation and reports failures as
//! [`ToolError`] values. [`ToolRegistry`] is the routing table from tool name
//! to handler; [`catalog`] is the matching list of descriptors. The two must
//! name exactly the same tools, which [`ToolRegistry::validate`] checks at
//! startup.

mod args;
mod catalog;
mod schedules;
mod verified_resources;
mod webhooks;

pub use args::{Args, Payload};
pub use catalog::{catalog, ToolDescriptor};
pub use webhooks::WEBHOOK_TRIGGERS;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;

use crate::client::CalClient;
use crate::error::ToolError;

use schedules::{
    CreateScheduleHandler, DeleteScheduleHandler, GetAllSchedulesHandler,
    GetDefaultScheduleHandler, GetScheduleHandler, UpdateScheduleHandler,
};
use verified_resources::{
    GetVerifiedEmailHandler, GetVerifiedEmailsHandler, GetVerifiedPhoneHandler,
    GetVerifiedPhonesHandler, RequestEmailCodeHandler, VerifyEmailCodeHandler,
};
use webhooks::{
    CreateWebhookHandler, DeleteWebhookHandler, GetAllWebhooksHandler, GetWebhookHandler,
    UpdateWebhookHandler,
};

/// Handler for executing a tool
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync + std::fmt::Debug {
    /// Execute the tool with the given arguments
    async fn execute(&self, args: Args) -> Result<Value, ToolError>;
}

/// Catalog and routing table disagree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("tool catalog and dispatch table differ (undocumented: {undocumented:?}, unrouted: {unrouted:?})")]
pub struct CatalogMismatch {
    /// Routed tools without a descriptor
    pub undocumented: Vec<String>,
    /// Described tools without a handler
    pub unrouted: Vec<String>,
}

/// Routing table from tool name to handler
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create the registry with every Cal.com tool bound to `client`
    pub fn new(client: CalClient) -> Self {
        let mut registry = Self::empty();

        // Schedules
        registry.register(
            "cal_get_all_schedules",
            GetAllSchedulesHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_create_a_schedule",
            CreateScheduleHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_update_a_schedule",
            UpdateScheduleHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_default_schedule",
            GetDefaultScheduleHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_schedule",
            GetScheduleHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_delete_a_schedule",
            DeleteScheduleHandler {
                client: client.clone(),
            },
        );

        // Verified resources
        registry.register(
            "cal_request_email_verification_code",
            RequestEmailCodeHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_verify_email_code",
            VerifyEmailCodeHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_verified_emails",
            GetVerifiedEmailsHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_verified_email_by_id",
            GetVerifiedEmailHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_verified_phones",
            GetVerifiedPhonesHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_verified_phone_by_id",
            GetVerifiedPhoneHandler {
                client: client.clone(),
            },
        );

        // Webhooks
        registry.register(
            "cal_get_all_webhooks",
            GetAllWebhooksHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_create_webhook",
            CreateWebhookHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_get_webhook",
            GetWebhookHandler {
                client: client.clone(),
            },
        );
        registry.register(
            "cal_update_webhook",
            UpdateWebhookHandler {
                client: client.clone(),
            },
        );
        registry.register("cal_delete_webhook", DeleteWebhookHandler { client });

        registry
    }

    /// Register a handler under `name`, replacing any previous one
    pub fn register(&mut self, name: impl Into<String>, handler: impl ToolHandler + 'static) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Get a handler by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that `descriptors` and this table name exactly the same tools
    pub fn validate(&self, descriptors: &[ToolDescriptor]) -> Result<(), CatalogMismatch> {
        let routed: BTreeSet<&str> = self.handlers.keys().map(String::as_str).collect();
        let described: BTreeSet<&str> = descriptors.iter().map(|d| d.name).collect();

        let undocumented: Vec<String> = routed
            .difference(&described)
            .map(|s| s.to_string())
            .collect();
        let unrouted: Vec<String> = described
            .difference(&routed)
            .map(|s| s.to_string())
            .collect();

        if undocumented.is_empty() && unrouted.is_empty() {
            Ok(())
        } else {
            Err(CatalogMismatch {
                undocumented,
                unrouted,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry() -> ToolRegistry {
        let client = CalClient::new(crate::client::DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        ToolRegistry::new(client)
    }

    #[test]
    fn test_catalog_and_registry_in_lockstep() {
        let registry = registry();
        let descriptors = catalog();
        registry.validate(&descriptors).unwrap();
        assert_eq!(registry.names().len(), descriptors.len());
    }

    #[test]
    fn test_validate_reports_both_directions() {
        let mut registry = ToolRegistry::empty();
        let client = CalClient::new(crate::client::DEFAULT_BASE_URL, Duration::from_secs(5)).unwrap();
        registry.register("cal_extra_tool", GetAllSchedulesHandler { client });

        let descriptors: Vec<ToolDescriptor> = catalog()
            .into_iter()
            .filter(|d| d.name == "cal_get_webhook")
            .collect();
        let mismatch = registry.validate(&descriptors).unwrap_err();

        assert_eq!(mismatch.undocumented, vec!["cal_extra_tool".to_string()]);
        assert_eq!(mismatch.unrouted, vec!["cal_get_webhook".to_string()]);
    }

    #[test]
    fn test_stripe_tools_not_exposed() {
        let registry = registry();
        assert!(registry.names().iter().all(|n| !n.contains("stripe")));
    }
}
