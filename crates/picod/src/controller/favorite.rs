use std::time::Duration;

use tracing::info;
use tracing::warn;

use super::clamp_brightness;
use super::sampler;
use super::sampler::SampleError;
use super::ButtonCode;
use super::Controller;
use super::ControllerError;

/// Poll interval while measuring how long the center button is held.
const HOLD_POLL_DELAY: Duration = Duration::from_millis(10);

/// One center-button interaction.
///
/// With a favorite store configured, the session measures hold duration by
/// polling the sensor until it stops reporting the center code, then either
/// stores the current brightness (long press) or recalls the stored one
/// (short press). Without a store it falls back to the stateless midpoint.
pub(crate) struct FavoriteSession<'a> {
    controller: &'a Controller,
}

impl<'a> FavoriteSession<'a> {
    pub(crate) fn new(controller: &'a Controller) -> Self {
        Self { controller }
    }

    pub(crate) async fn run(&self) -> Result<(), ControllerError> {
        let config = &self.controller.config;
        let api = self.controller.api.as_ref();
        let clock = self.controller.clock.as_ref();

        let Some(store) = &config.input_number else {
            let midpoint = midpoint_brightness(config.min_brightness, config.max_brightness);
            api.turn_on(&config.entity, Some(midpoint), 0).await?;
            return Ok(());
        };

        // Hold duration has to be reconstructed from repeated sensor reads:
        // the sensor carries button identity only, there is no separate
        // press/release event.
        let start = clock.now();
        while self.center_held().await? && clock.now() - start < config.hold_cap {
            clock.sleep(HOLD_POLL_DELAY).await;
        }
        let held = clock.now() - start;

        if held >= config.favorite_long_press {
            match sampler::average_brightness(api, &config.entity).await {
                Ok(brightness) => {
                    let brightness =
                        clamp_brightness(brightness as i64, config.min_brightness, config.max_brightness);
                    api.set_value(store, brightness as f64).await?;
                    info!(
                        "[{}] stored favorite brightness {} to {}",
                        self.controller.name, brightness, store
                    );
                }
                Err(SampleError::Undefined) => {
                    warn!(
                        "[{}] no brightness to store from {}, favorite unchanged",
                        self.controller.name, config.entity
                    );
                }
                Err(SampleError::Hass(e)) => return Err(e.into()),
            }
        } else {
            let raw = api.get_state(store).await?;
            let stored = raw
                .as_deref()
                .and_then(|s| s.trim().parse::<f64>().ok())
                .ok_or_else(|| ControllerError::BadStoredValue {
                    entity: store.clone(),
                    value: raw.clone(),
                })?;

            // Fractional stored values are truncated before clamping.
            let brightness =
                clamp_brightness(stored as i64, config.min_brightness, config.max_brightness);
            api.turn_on(&config.entity, Some(brightness), 0).await?;
        }

        Ok(())
    }

    async fn center_held(&self) -> Result<bool, ControllerError> {
        let state = self
            .controller
            .api
            .get_state(&self.controller.config.sensor)
            .await?;

        let code = state.as_deref().and_then(|s| ButtonCode::parse(s).ok());
        Ok(code == Some(ButtonCode::Center))
    }
}

/// Midpoint between the configured bounds, rounded half away from zero.
fn midpoint_brightness(min: u32, max: u32) -> u32 {
    ((max - min) as f64 / 2.0 + min as f64).round() as u32
}
