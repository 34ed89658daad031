use tracing::debug;

use super::clamp_brightness;
use super::sampler;
use super::sampler::SampleError;
use super::ButtonCode;
use super::Controller;
use crate::hass::HassError;

/// How many times to re-read brightness after turning the target on,
/// waiting one dim delay between attempts. Lights can take a moment to
/// report state once powered.
const BRIGHTNESS_READ_ATTEMPTS: usize = 5;

/// Ramp direction for a dim session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimDirection {
    Up,
    Down,
}

impl DimDirection {
    /// The button code that keeps the ramp alive.
    fn activation(self) -> ButtonCode {
        match self {
            DimDirection::Up => ButtonCode::Up,
            DimDirection::Down => ButtonCode::Down,
        }
    }

    fn step(self, brightness: i64, interval: i64) -> i64 {
        match self {
            DimDirection::Up => brightness + interval,
            DimDirection::Down => brightness - interval,
        }
    }
}

/// One dim-while-held interaction.
///
/// Created when an up/down press is dispatched and discarded when the
/// button is released; holds no state that outlives the ramp.
pub(crate) struct DimSession<'a> {
    controller: &'a Controller,
    direction: DimDirection,
}

impl<'a> DimSession<'a> {
    pub(crate) fn new(controller: &'a Controller, direction: DimDirection) -> Self {
        Self {
            controller,
            direction,
        }
    }

    /// Run the ramp until the button is released or the hold cap elapses.
    ///
    /// Brightness steps by the configured interval each poll and is clamped
    /// to the configured bounds every iteration, so holding the button past
    /// a bound parks the lights there instead of overshooting. Writes use a
    /// zero transition for immediate visual feedback.
    pub(crate) async fn run(&self) -> Result<(), HassError> {
        let config = &self.controller.config;
        let api = self.controller.api.as_ref();
        let clock = self.controller.clock.as_ref();

        // The target must be on before brightness can be sampled at all.
        api.turn_on(&config.entity, None, 0).await?;

        let mut brightness = match self.initial_brightness().await? {
            Some(value) => value as i64,
            None => {
                debug!(
                    "[{}] no brightness reading from {}, skipping ramp",
                    self.controller.name, config.entity
                );
                return Ok(());
            }
        };

        let start = clock.now();
        while self.button_held().await? && clock.now() - start < config.hold_cap {
            brightness = self.direction.step(brightness, config.dim_interval as i64);
            let clamped = clamp_brightness(brightness, config.min_brightness, config.max_brightness);
            brightness = clamped as i64;

            api.turn_on(&config.entity, Some(clamped), 0).await?;
            clock.sleep(config.dim_delay).await;
        }

        Ok(())
    }

    /// Sample the starting brightness, retrying while the lights come up.
    /// Exhausting the retries is an accepted edge case, not an error.
    async fn initial_brightness(&self) -> Result<Option<u32>, HassError> {
        let config = &self.controller.config;

        for _ in 0..BRIGHTNESS_READ_ATTEMPTS {
            match sampler::average_brightness(self.controller.api.as_ref(), &config.entity).await {
                Ok(brightness) => return Ok(Some(brightness)),
                Err(SampleError::Undefined) => {
                    self.controller.clock.sleep(config.dim_delay).await;
                }
                Err(SampleError::Hass(e)) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Release detection: re-read the sensor and compare against the
    /// activation code. Anything else (other button, idle, unknown value,
    /// missing sensor) ends the ramp.
    async fn button_held(&self) -> Result<bool, HassError> {
        let state = self
            .controller
            .api
            .get_state(&self.controller.config.sensor)
            .await?;

        let code = state.as_deref().and_then(|s| ButtonCode::parse(s).ok());
        Ok(code == Some(self.direction.activation()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::testutil;
    use crate::hass::MockHass;
    use crate::hass::ServiceCall;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_ramp_up_until_release() {
        let hass = Arc::new(MockHass::new());
        hass.set_attribute("light.bulb0", "brightness", json!(50));
        hass.script_states("sensor.pico0", &["8", "8", "0"]);

        let controller = testutil::controller(hass.clone(), testutil::remote_config());
        DimSession::new(&controller, DimDirection::Up)
            .run()
            .await
            .unwrap();

        assert_eq!(hass.brightness_writes(), vec![55, 60]);
        // The first service call turns the target on without a brightness.
        assert_eq!(
            hass.calls()[0],
            ServiceCall::TurnOn {
                entity: "light.bulb0".to_string(),
                brightness: None,
                transition: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_ramp_clamps_at_max() {
        let hass = Arc::new(MockHass::new());
        hass.set_attribute("light.bulb0", "brightness", json!(85));
        hass.script_states("sensor.pico0", &["8", "8", "8", "0"]);

        let controller = testutil::controller(hass.clone(), testutil::remote_config());
        DimSession::new(&controller, DimDirection::Up)
            .run()
            .await
            .unwrap();

        assert_eq!(hass.brightness_writes(), vec![90, 90, 90]);
    }

    #[tokio::test]
    async fn test_ramp_clamps_at_min() {
        let hass = Arc::new(MockHass::new());
        hass.set_attribute("light.bulb0", "brightness", json!(12));
        hass.script_states("sensor.pico0", &["16", "16", "0"]);

        let controller = testutil::controller(hass.clone(), testutil::remote_config());
        DimSession::new(&controller, DimDirection::Down)
            .run()
            .await
            .unwrap();

        assert_eq!(hass.brightness_writes(), vec![10, 10]);
    }

    #[tokio::test]
    async fn test_ramp_aborts_silently_without_brightness() {
        let hass = Arc::new(MockHass::new());
        // No brightness attribute: every sampling attempt is undefined.
        hass.script_states("sensor.pico0", &["8"]);

        let controller = testutil::controller(hass.clone(), testutil::remote_config());
        DimSession::new(&controller, DimDirection::Up)
            .run()
            .await
            .unwrap();

        assert!(hass.brightness_writes().is_empty());
        assert_eq!(hass.calls().len(), 1); // just the initial turn-on
    }

    #[tokio::test]
    async fn test_ramp_stops_at_hold_cap() {
        let hass = Arc::new(MockHass::new());
        hass.set_attribute("light.bulb0", "brightness", json!(50));
        // The sensor never reports a release.
        hass.script_states("sensor.pico0", &["8"]);

        let mut config = testutil::remote_config();
        config.hold_cap = Duration::from_millis(200);

        let controller = testutil::controller(hass.clone(), config);
        DimSession::new(&controller, DimDirection::Up)
            .run()
            .await
            .unwrap();

        // One write per dim delay (50ms) until the cap: 0, 50, 100, 150ms.
        assert_eq!(hass.brightness_writes(), vec![55, 60, 65, 70]);
    }

    #[tokio::test]
    async fn test_ramp_stops_when_other_button_pressed() {
        let hass = Arc::new(MockHass::new());
        hass.set_attribute("light.bulb0", "brightness", json!(50));
        hass.script_states("sensor.pico0", &["8", "4"]);

        let controller = testutil::controller(hass.clone(), testutil::remote_config());
        DimSession::new(&controller, DimDirection::Up)
            .run()
            .await
            .unwrap();

        assert_eq!(hass.brightness_writes(), vec![55]);
    }
}
