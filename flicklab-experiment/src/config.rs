use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use flicklab_core::DEFAULT_PULSE_MS;

/// Session parameters, loaded from a JSON file with every field optional.
///
/// Durations are wall-clock seconds; frequencies are Hz. Pin indices must
/// be within the controller sketch's valid range, which is not re-checked
/// here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SessionConfig {
    pub led_pin: u8,
    pub sound_pin: u8,
    pub reward_pin: u8,
    /// Reward pins by side for two-choice schedules.
    pub reward_pins: Vec<u8>,
    /// The pin whose events decide trials.
    pub response_pin: i16,
    /// Every pin the router forwards to the controller.
    pub response_pins: Vec<i16>,

    pub reward_duration: f64,
    pub flick_duration: f64,
    pub decision_duration: f64,
    pub timeout_duration: f64,
    pub postpone: f64,
    pub minimum_duration: f64,
    pub maximum_duration: f64,
    pub pulse_ms: u16,

    pub led_flick_hz: Vec<f32>,
    pub sound_flick_hz: Vec<f32>,
    pub boundary: f32,

    pub go_ratio: usize,
    pub nogo_ratio: usize,
    pub visual_ratio: usize,
    pub sound_ratio: usize,

    pub iti: f64,
    pub iti_range: f64,
    pub number_of_trial: usize,

    pub required_licks: u32,
    pub number_of_reward: u32,
    pub audio_reward_probability: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            led_pin: 3,
            sound_pin: 2,
            reward_pin: 4,
            reward_pins: vec![4, 5],
            response_pin: 6,
            response_pins: vec![6, 7],

            reward_duration: 0.02,
            flick_duration: 2.0,
            decision_duration: 1.0,
            timeout_duration: 5.0,
            postpone: 10.0,
            minimum_duration: 2.0,
            maximum_duration: 10.0,
            pulse_ms: DEFAULT_PULSE_MS,

            led_flick_hz: vec![2.0, 10.0],
            sound_flick_hz: vec![2.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 20.0],
            boundary: 6.5,

            go_ratio: 1,
            nogo_ratio: 1,
            visual_ratio: 1,
            sound_ratio: 1,

            iti: 3.0,
            iti_range: 1.0,
            number_of_trial: 200,

            required_licks: 1,
            number_of_reward: 200,
            audio_reward_probability: 0.5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read session config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse session config: {0}")]
    Parse(#[from] serde_json::Error),
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<SessionConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
