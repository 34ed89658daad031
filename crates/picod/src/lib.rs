pub mod clock;
pub mod config;
pub mod controller;
pub mod entity;
pub mod hass;

pub use clock::Clock;
pub use clock::TokioClock;
pub use config::Config;
pub use config::ConfigError;
pub use controller::ButtonCode;
pub use controller::Controller;
pub use entity::Domain;
pub use entity::EntityId;
pub use hass::HassApi;
pub use hass::HassError;
pub use hass::RestClient;
