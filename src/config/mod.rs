//! Stopping limits for the session loop.

use crate::consts::{PROGRESS_THRESHOLD, STEP_CEILING};
use crate::engine::SessionState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriverConfig {
    /// Stop once the engine's progress reaches this value.
    pub progress_threshold: f64,
    /// Stop once the engine's own step counter reaches this value.
    pub step_ceiling: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            progress_threshold: PROGRESS_THRESHOLD,
            step_ceiling: STEP_CEILING,
        }
    }
}

impl DriverConfig {
    /// Keep asking only while BOTH limits are still below their thresholds.
    /// Crossing either one stops the loop.
    pub fn should_continue(&self, state: &SessionState) -> bool {
        state.progress < self.progress_threshold && state.step < self.step_ceiling
    }
}
