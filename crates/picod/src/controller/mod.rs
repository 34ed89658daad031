mod button;
mod dim;
mod favorite;
mod sampler;

pub use button::ButtonCode;
pub use button::UnrecognizedCode;
pub use dim::DimDirection;
pub use sampler::average_brightness;
pub use sampler::light_members;
pub use sampler::SampleError;

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::clock::Clock;
use crate::config::RemoteConfig;
use crate::entity::EntityId;
use crate::hass::HassApi;
use crate::hass::HassError;
use dim::DimSession;
use favorite::FavoriteSession;

/// Errors from a single dispatched interaction.
///
/// None of these end the controller; the watch loop logs them and keeps
/// listening for the next state change.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    UnrecognizedCode(#[from] UnrecognizedCode),

    #[error(transparent)]
    Hass(#[from] HassError),

    #[error("stored favorite in {entity} is not numeric: {value:?}")]
    BadStoredValue {
        entity: EntityId,
        value: Option<String>,
    },
}

/// One armed remote: a validated config plus handles to the host platform
/// and the clock.
///
/// A controller owns no mutable state between interactions. Everything a
/// dim or favorite interaction needs lives in a session created per
/// dispatch and dropped when its loop exits, so any button code may follow
/// any other.
pub struct Controller {
    pub(crate) name: String,
    pub(crate) config: RemoteConfig,
    poll_interval: Duration,
    pub(crate) api: Arc<dyn HassApi>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Controller {
    pub fn new(
        name: impl Into<String>,
        config: RemoteConfig,
        poll_interval: Duration,
        api: Arc<dyn HassApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            poll_interval,
            api,
            clock,
        }
    }

    /// Watch the sensor and dispatch every observed state change.
    ///
    /// Dispatch is awaited inline: while a dim ramp or favorite hold is
    /// running, no further changes are observed. That is deliberate — the
    /// sensor is single-valued, and the running loop re-reads it itself.
    pub async fn run(&self) {
        info!(
            "[{}] armed: sensor {} controls {}",
            self.name, self.config.sensor, self.config.entity
        );

        let mut last = match self.api.get_state(&self.config.sensor).await {
            Ok(state) => state,
            Err(e) => {
                warn!("[{}] initial sensor read failed: {}", self.name, e);
                None
            }
        };

        loop {
            self.clock.sleep(self.poll_interval).await;

            let state = match self.api.get_state(&self.config.sensor).await {
                Ok(state) => state,
                Err(e) => {
                    warn!("[{}] sensor read failed: {}", self.name, e);
                    continue;
                }
            };

            if state == last {
                continue;
            }
            last = state.clone();

            let Some(new) = state else {
                warn!("[{}] sensor {} disappeared", self.name, self.config.sensor);
                continue;
            };

            if let Err(e) = self.on_state_change(&new).await {
                warn!("[{}] action failed: {}", self.name, e);
            }
        }
    }

    /// Entry point for one sensor state transition.
    pub async fn on_state_change(&self, new: &str) -> Result<(), ControllerError> {
        let code = ButtonCode::parse(new)?;
        self.dispatch(code).await
    }

    /// The dispatch table: a fixed, exhaustive mapping from button code to
    /// action. The call does not return until the action, including any
    /// polling loop it runs, has completed.
    async fn dispatch(&self, code: ButtonCode) -> Result<(), ControllerError> {
        debug!("[{}] dispatching {}", self.name, code);

        match code {
            ButtonCode::Idle => Ok(()),
            ButtonCode::On => Ok(self.api.turn_on(&self.config.entity, None, 0).await?),
            ButtonCode::Off => Ok(self.api.turn_off(&self.config.entity, 0).await?),
            ButtonCode::Center => FavoriteSession::new(self).run().await,
            ButtonCode::Up => Ok(DimSession::new(self, DimDirection::Up).run().await?),
            ButtonCode::Down => Ok(DimSession::new(self, DimDirection::Down).run().await?),
        }
    }
}

/// Clamp a stepped brightness into the configured bounds.
///
/// Validation guarantees min <= max. Clamping happens on every ramp
/// iteration, not just at entry, and is idempotent.
pub(crate) fn clamp_brightness(value: i64, min: u32, max: u32) -> u32 {
    value.clamp(min as i64, max as i64) as u32
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::clock::MockClock;
    use crate::hass::MockHass;

    /// Bounds [10, 90], step 5, no favorite store, generous hold cap.
    pub(crate) fn remote_config() -> RemoteConfig {
        RemoteConfig {
            sensor: EntityId::new("sensor.pico0"),
            entity: EntityId::new("light.bulb0"),
            input_number: None,
            min_brightness: 10,
            max_brightness: 90,
            dim_delay: Duration::from_millis(50),
            dim_interval: 5,
            favorite_long_press: Duration::from_secs(3),
            hold_cap: Duration::from_secs(30),
        }
    }

    pub(crate) fn controller(api: Arc<MockHass>, config: RemoteConfig) -> Controller {
        Controller::new(
            "test",
            config,
            Duration::from_millis(100),
            api,
            Arc::new(MockClock::new()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hass::MockHass;
    use crate::hass::ServiceCall;

    #[test]
    fn test_clamp_within_bounds() {
        assert_eq!(clamp_brightness(50, 10, 90), 50);
        assert_eq!(clamp_brightness(5, 10, 90), 10);
        assert_eq!(clamp_brightness(95, 10, 90), 90);
        assert_eq!(clamp_brightness(-20, 10, 90), 10);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        for value in [-100i64, 0, 10, 42, 90, 1000] {
            let once = clamp_brightness(value, 10, 90);
            let twice = clamp_brightness(once as i64, 10, 90);
            assert_eq!(once, twice);
        }
    }

    #[tokio::test]
    async fn test_on_code_turns_target_on() {
        let hass = Arc::new(MockHass::new());
        let controller = testutil::controller(hass.clone(), testutil::remote_config());

        controller.on_state_change("1").await.unwrap();

        assert_eq!(
            hass.calls(),
            vec![ServiceCall::TurnOn {
                entity: "light.bulb0".to_string(),
                brightness: None,
                transition: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_off_code_turns_target_off() {
        let hass = Arc::new(MockHass::new());
        let controller = testutil::controller(hass.clone(), testutil::remote_config());

        controller.on_state_change("4").await.unwrap();

        assert_eq!(
            hass.calls(),
            vec![ServiceCall::TurnOff {
                entity: "light.bulb0".to_string(),
                transition: 0,
            }]
        );
    }

    #[tokio::test]
    async fn test_idle_code_is_a_no_op() {
        let hass = Arc::new(MockHass::new());
        let controller = testutil::controller(hass.clone(), testutil::remote_config());

        controller.on_state_change("0").await.unwrap();

        assert!(hass.calls().is_empty());
    }

    #[tokio::test]
    async fn test_center_code_always_invokes_favorite() {
        let hass = Arc::new(MockHass::new());
        let controller = testutil::controller(hass.clone(), testutil::remote_config());

        // Favorite runs regardless of what was dispatched before.
        controller.on_state_change("1").await.unwrap();
        controller.on_state_change("2").await.unwrap();
        controller.on_state_change("0").await.unwrap();
        controller.on_state_change("2").await.unwrap();

        let midpoint_writes = hass.brightness_writes();
        assert_eq!(midpoint_writes, vec![50, 50]);
    }

    #[tokio::test]
    async fn test_unknown_code_is_rejected() {
        let hass = Arc::new(MockHass::new());
        let controller = testutil::controller(hass.clone(), testutil::remote_config());

        let result = controller.on_state_change("3").await;

        assert!(matches!(
            result,
            Err(ControllerError::UnrecognizedCode(UnrecognizedCode(code))) if code == "3"
        ));
        assert!(hass.calls().is_empty());
    }
}
