use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::HassApi;
use super::HassError;
use crate::config::HassConfig;
use crate::entity::EntityId;

/// Home Assistant REST API client.
///
/// State reads go through `GET /api/states/{entity_id}`; actions are
/// service calls via `POST /api/services/{domain}/{service}`. Every
/// request carries the configured long-lived access token.
pub struct RestClient {
    base: String,
    token: String,
    http: reqwest::Client,
}

/// The relevant parts of an `/api/states/{entity_id}` response.
#[derive(Debug, Deserialize)]
struct StateObject {
    state: String,

    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl RestClient {
    pub fn new(config: &HassConfig) -> Result<Self, HassError> {
        Ok(Self {
            base: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            http: reqwest::Client::builder().build()?,
        })
    }

    fn state_url(&self, entity: &EntityId) -> String {
        format!("{}/api/states/{}", self.base, entity)
    }

    fn service_url(&self, domain: &str, service: &str) -> String {
        format!("{}/api/services/{}/{}", self.base, domain, service)
    }

    async fn fetch_state(&self, entity: &EntityId) -> Result<Option<StateObject>, HassError> {
        let url = self.state_url(entity);
        let response = self.http.get(&url).bearer_auth(&self.token).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(HassError::Status {
                status: response.status(),
                url,
            });
        }

        Ok(Some(response.json().await?))
    }

    async fn call_service(
        &self,
        domain: &str,
        service: &str,
        body: serde_json::Value,
    ) -> Result<(), HassError> {
        let url = self.service_url(domain, service);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HassError::Status {
                status: response.status(),
                url,
            });
        }

        Ok(())
    }
}

/// Build the body for a `homeassistant.turn_on` call.
fn turn_on_body(entity: &EntityId, brightness: Option<u32>, transition: u32) -> serde_json::Value {
    let mut body = json!({
        "entity_id": entity.as_str(),
        "transition": transition,
    });
    if let Some(brightness) = brightness {
        body["brightness"] = json!(brightness);
    }
    body
}

#[async_trait]
impl HassApi for RestClient {
    async fn get_state(&self, entity: &EntityId) -> Result<Option<String>, HassError> {
        Ok(self.fetch_state(entity).await?.map(|obj| obj.state))
    }

    async fn get_attribute(
        &self,
        entity: &EntityId,
        attribute: &str,
    ) -> Result<Option<serde_json::Value>, HassError> {
        Ok(self
            .fetch_state(entity)
            .await?
            .and_then(|obj| obj.attributes.get(attribute).cloned()))
    }

    async fn turn_on(
        &self,
        entity: &EntityId,
        brightness: Option<u32>,
        transition: u32,
    ) -> Result<(), HassError> {
        // homeassistant.turn_on covers both light and group targets.
        self.call_service(
            "homeassistant",
            "turn_on",
            turn_on_body(entity, brightness, transition),
        )
        .await
    }

    async fn turn_off(&self, entity: &EntityId, transition: u32) -> Result<(), HassError> {
        self.call_service(
            "homeassistant",
            "turn_off",
            json!({
                "entity_id": entity.as_str(),
                "transition": transition,
            }),
        )
        .await
    }

    async fn set_value(&self, entity: &EntityId, value: f64) -> Result<(), HassError> {
        self.call_service(
            "input_number",
            "set_value",
            json!({
                "entity_id": entity.as_str(),
                "value": value,
            }),
        )
        .await
    }
}
