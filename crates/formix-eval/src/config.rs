//! Session configuration
//!
//! Algorithm defaults used when a calculus mark leaves a parameter open, plus
//! library descriptor lines applied at session start. Every field has a
//! default, so a partial JSON document is enough.

use formix_types::{FormixError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Default finite-difference step per derivative order, first order first
    pub derivative_delta: Vec<f64>,
    pub trapezoid_panels: usize,
    pub tanh_sinh_levels: u32,
    pub tanh_sinh_tolerance: f64,
    pub clenshaw_points: usize,
    pub interval_step: f64,
    /// Descriptor lines imported after the standard library
    pub libraries: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            derivative_delta: vec![1e-8, 1e-5, 1e-4],
            trapezoid_panels: 1000,
            tanh_sinh_levels: 10,
            tanh_sinh_tolerance: 1e-10,
            clenshaw_points: 33,
            interval_step: 0.1,
            libraries: Vec::new(),
        }
    }
}

/// Step used for orders beyond the configured list
const FALLBACK_DELTA: f64 = 1e-3;

impl SessionConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(text)
            .map_err(|e| FormixError::configuration("session config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| FormixError::configuration("session config", e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.trapezoid_panels == 0 {
            return Err(FormixError::configuration("trapezoid_panels", "must be positive"));
        }
        if self.clenshaw_points < 2 {
            return Err(FormixError::configuration("clenshaw_points", "must be at least 2"));
        }
        if !(self.interval_step > 0.0) {
            return Err(FormixError::configuration("interval_step", "must be positive"));
        }
        if !(self.tanh_sinh_tolerance > 0.0) {
            return Err(FormixError::configuration("tanh_sinh_tolerance", "must be positive"));
        }
        if let Some(bad) = self.derivative_delta.iter().find(|d| !(**d > 0.0)) {
            return Err(FormixError::configuration(
                "derivative_delta",
                format!("step {} is not positive", bad),
            ));
        }
        Ok(())
    }

    /// Default step for a derivative of the given order
    pub fn derivative_delta_for(&self, order: u32) -> f64 {
        order
            .checked_sub(1)
            .and_then(|i| self.derivative_delta.get(i as usize))
            .copied()
            .unwrap_or(FALLBACK_DELTA)
    }
}
