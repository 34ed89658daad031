use serde_json::Value;

use crate::entity::Domain;
use crate::entity::EntityId;
use crate::hass::HassApi;
use crate::hass::HassError;

/// Errors from brightness sampling.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// No light in the target reports a numeric brightness (all off, or
    /// the target resolves to no lights). Recoverable; callers decide.
    #[error("no light in the target reports a numeric brightness")]
    Undefined,

    #[error(transparent)]
    Hass(#[from] HassError),
}

/// Resolve a target reference into the lights it controls.
///
/// A single light resolves to itself; a group resolves to its members
/// restricted to the light namespace. Membership is re-read on every call
/// because it can change externally. Any other namespace resolves to no
/// lights, which callers must treat as "nothing to control", not failure.
pub async fn light_members(
    api: &dyn HassApi,
    target: &EntityId,
) -> Result<Vec<EntityId>, HassError> {
    match target.domain() {
        Domain::Light => Ok(vec![target.clone()]),
        Domain::Group => {
            let members = api.get_attribute(target, "entity_id").await?;
            Ok(members
                .as_ref()
                .and_then(Value::as_array)
                .map(|ids| {
                    ids.iter()
                        .filter_map(Value::as_str)
                        .map(EntityId::new)
                        .filter(|id| id.domain() == Domain::Light)
                        .collect()
                })
                .unwrap_or_default())
        }
        _ => Ok(Vec::new()),
    }
}

/// Average brightness across the target's lights, rounded to the nearest
/// integer (half away from zero).
///
/// A light without a numeric brightness attribute (typically one that is
/// off) is excluded from the average rather than counted as zero.
pub async fn average_brightness(api: &dyn HassApi, target: &EntityId) -> Result<u32, SampleError> {
    let lights = light_members(api, target).await?;

    let mut readings = Vec::new();
    for light in &lights {
        let brightness = api.get_attribute(light, "brightness").await?;
        if let Some(value) = brightness.as_ref().and_then(Value::as_u64) {
            readings.push(value);
        }
    }

    if readings.is_empty() {
        return Err(SampleError::Undefined);
    }

    let sum: u64 = readings.iter().sum();
    Ok((sum as f64 / readings.len() as f64).round() as u32)
}
