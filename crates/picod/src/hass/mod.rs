mod rest;

pub use rest::RestClient;

use async_trait::async_trait;

use crate::entity::EntityId;

/// Errors from the host platform transport.
#[derive(Debug, thiserror::Error)]
pub enum HassError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
}

/// The contract the controller needs from the host platform.
///
/// This trait allows for mocking the host platform for testing purposes.
/// The controller never manages the connection lifecycle; it assumes the
/// API stays available for as long as the controller is armed.
#[async_trait]
pub trait HassApi: Send + Sync {
    /// Read an entity's state value. Returns None for an unknown entity.
    async fn get_state(&self, entity: &EntityId) -> Result<Option<String>, HassError>;

    /// Read one attribute of an entity. Returns None if the entity is
    /// unknown or does not report the attribute.
    async fn get_attribute(
        &self,
        entity: &EntityId,
        attribute: &str,
    ) -> Result<Option<serde_json::Value>, HassError>;

    /// Turn an entity (light or group) on, optionally at a brightness.
    async fn turn_on(
        &self,
        entity: &EntityId,
        brightness: Option<u32>,
        transition: u32,
    ) -> Result<(), HassError>;

    /// Turn an entity (light or group) off.
    async fn turn_off(&self, entity: &EntityId, transition: u32) -> Result<(), HassError>;

    /// Persist a value to an input_number entity.
    async fn set_value(&self, entity: &EntityId, value: f64) -> Result<(), HassError>;
}

/// Mock host platform for testing.
///
/// Entity states can be seeded directly or scripted: a scripted entity
/// serves its queued values one `get_state` at a time and keeps returning
/// the final value once the queue is drained, which is how tests simulate
/// a button being released mid-loop.
#[cfg(test)]
#[derive(Default)]
pub struct MockHass {
    states: std::sync::Mutex<std::collections::HashMap<String, String>>,
    scripts: std::sync::Mutex<std::collections::HashMap<String, std::collections::VecDeque<String>>>,
    attributes: std::sync::Mutex<std::collections::HashMap<(String, String), serde_json::Value>>,
    calls: std::sync::Mutex<Vec<ServiceCall>>,
}

/// A service invocation recorded by [`MockHass`].
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    TurnOn {
        entity: String,
        brightness: Option<u32>,
        transition: u32,
    },
    TurnOff {
        entity: String,
        transition: u32,
    },
    SetValue {
        entity: String,
        value: f64,
    },
}

#[cfg(test)]
impl MockHass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_state(&self, entity: &str, state: &str) {
        self.states
            .lock()
            .unwrap()
            .insert(entity.to_string(), state.to_string());
    }

    /// Queue a sequence of states for an entity; the last one persists.
    pub fn script_states(&self, entity: &str, states: &[&str]) {
        self.scripts.lock().unwrap().insert(
            entity.to_string(),
            states.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn set_attribute(&self, entity: &str, attribute: &str, value: serde_json::Value) {
        self.attributes
            .lock()
            .unwrap()
            .insert((entity.to_string(), attribute.to_string()), value);
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Brightness values written through `turn_on`, in order.
    pub fn brightness_writes(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ServiceCall::TurnOn {
                    brightness: Some(b),
                    ..
                } => Some(b),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
#[async_trait]
impl HassApi for MockHass {
    async fn get_state(&self, entity: &EntityId) -> Result<Option<String>, HassError> {
        let mut scripts = self.scripts.lock().unwrap();
        if let Some(queue) = scripts.get_mut(entity.as_str()) {
            if queue.len() > 1 {
                return Ok(queue.pop_front());
            }
            if let Some(last) = queue.front() {
                return Ok(Some(last.clone()));
            }
        }
        Ok(self.states.lock().unwrap().get(entity.as_str()).cloned())
    }

    async fn get_attribute(
        &self,
        entity: &EntityId,
        attribute: &str,
    ) -> Result<Option<serde_json::Value>, HassError> {
        Ok(self
            .attributes
            .lock()
            .unwrap()
            .get(&(entity.as_str().to_string(), attribute.to_string()))
            .cloned())
    }

    async fn turn_on(
        &self,
        entity: &EntityId,
        brightness: Option<u32>,
        transition: u32,
    ) -> Result<(), HassError> {
        self.calls.lock().unwrap().push(ServiceCall::TurnOn {
            entity: entity.as_str().to_string(),
            brightness,
            transition,
        });
        Ok(())
    }

    async fn turn_off(&self, entity: &EntityId, transition: u32) -> Result<(), HassError> {
        self.calls.lock().unwrap().push(ServiceCall::TurnOff {
            entity: entity.as_str().to_string(),
            transition,
        });
        Ok(())
    }

    async fn set_value(&self, entity: &EntityId, value: f64) -> Result<(), HassError> {
        self.calls.lock().unwrap().push(ServiceCall::SetValue {
            entity: entity.as_str().to_string(),
            value,
        });
        Ok(())
    }
}
