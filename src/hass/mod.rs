mod client;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use client::{is_valid_slug, HomeAssistantClient};

/// The slice of the Home Assistant host this agent talks to.
#[async_trait]
pub trait HomeAssistant: Send + Sync {
    /// Invoke `domain.service` with `data`; returns whatever the host reports back.
    async fn call_service(&self, domain: &str, service: &str, data: &Value) -> Result<Value>;

    /// Current state of an entity, `None` when the entity does not exist.
    async fn get_state(&self, entity_id: &str) -> Result<Option<String>>;

    /// The configured name of the home.
    async fn location_name(&self) -> Result<String>;
}
