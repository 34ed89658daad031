use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Namespace prefix of an entity identifier (the part before the first `.`).
///
/// The namespace decides how a reference may be used: `sensor` entities feed
/// the dispatcher, `light`/`group` entities are dim targets, `input_number`
/// entities store a favorite brightness.
#[derive(Debug, Clone, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Domain {
    Sensor,
    Light,
    Group,
    InputNumber,
    #[strum(default)]
    Other(String),
}

/// A Home Assistant entity identifier, e.g. `light.kitchen` or
/// `sensor.kitchen_pico`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The namespace of this identifier. An identifier without a `.` is its
    /// own namespace, which never matches a recognized domain.
    pub fn domain(&self) -> Domain {
        let prefix = self.0.split('.').next().unwrap_or_default();
        Domain::from_str(prefix).unwrap_or_else(|_| Domain::Other(prefix.to_string()))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_from_prefix() {
        assert_eq!(EntityId::new("sensor.kitchen_pico").domain(), Domain::Sensor);
        assert_eq!(EntityId::new("light.bulb0").domain(), Domain::Light);
        assert_eq!(EntityId::new("group.kitchen_lights").domain(), Domain::Group);
        assert_eq!(
            EntityId::new("input_number.kitchen_favorite").domain(),
            Domain::InputNumber
        );
    }

    #[test]
    fn test_unknown_domain() {
        assert_eq!(
            EntityId::new("switch.kitchen").domain(),
            Domain::Other("switch".to_string())
        );
    }

    #[test]
    fn test_identifier_without_separator() {
        assert_eq!(
            EntityId::new("kitchen").domain(),
            Domain::Other("kitchen".to_string())
        );
    }

    #[test]
    fn test_display_round_trip() {
        let id = EntityId::new("light.bulb0");
        assert_eq!(id.to_string(), "light.bulb0");
        assert_eq!(id.as_str(), "light.bulb0");
    }
}
