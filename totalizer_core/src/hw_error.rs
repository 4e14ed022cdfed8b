//! Maps `Box<dyn Error>` from trait boundaries to typed `TotalizerError`.
//!
//! `WeightSource` and `TotalsStore` return `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `totalizer_hardware::SensorError` downcasting.

use crate::error::TotalizerError;

/// Map a sensor-side error to a typed `TotalizerError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_sensor_error(e: &(dyn std::error::Error + 'static)) -> TotalizerError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<totalizer_hardware::SensorError>() {
            return TotalizerError::SensorFault(hw.to_string());
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        TotalizerError::Timeout
    } else {
        TotalizerError::Sensor(s)
    }
}

/// Map a store-side error; already-typed errors pass through.
pub fn map_store_error(e: &(dyn std::error::Error + 'static)) -> TotalizerError {
    if let Some(t) = e.downcast_ref::<TotalizerError>() {
        return t.clone();
    }
    TotalizerError::Persistence(e.to_string())
}
