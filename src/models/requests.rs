//! Request DTOs for the admin API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

/// Request body for the shed operation (POST /caches/shed)
///
/// # Fields
/// - `fraction`: Share of tracked soft values to reclaim, in (0, 1]
#[derive(Debug, Clone, Deserialize)]
pub struct ShedRequest {
    pub fraction: f64,
}

impl ShedRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if !self.fraction.is_finite() || self.fraction <= 0.0 || self.fraction > 1.0 {
            return Some(format!(
                "Fraction must be in (0, 1], got {}",
                self.fraction
            ));
        }
        None
    }
}
