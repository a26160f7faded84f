//! Wrap-safe smoothing of compass headings
//!
//! Smoothing the scalar angle directly breaks at the 0/360 boundary: the
//! average of 359 and 1 degrees is 180, not 0. The circular filter instead
//! projects the heading onto the unit circle and runs one scalar filter per
//! Cartesian component, so the wrap discontinuity never reaches the filters.

use crate::geodesy::normalize_deg;
use crate::types::SmoothingSettings;

/// One-dimensional recursive Kalman filter over a constant-value model.
///
/// Holds a scalar estimate and its error covariance; each update predicts by
/// inflating the covariance with the process noise, then corrects toward the
/// measurement with the resulting gain.
#[derive(Debug, Clone, Copy)]
pub struct ScalarKalman {
    process_noise: f64,
    measurement_noise: f64,
    estimate: f64,
    error_covariance: f64,
    initialized: bool,
}

impl ScalarKalman {
    /// Create a filter with the given process noise (q) and measurement
    /// noise (r).
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate: 0.0,
            error_covariance: 1.0,
            initialized: false,
        }
    }

    /// Fold one measurement into the estimate and return the filtered value.
    ///
    /// The first measurement seeds the estimate directly.
    pub fn update(&mut self, measurement: f64) -> f64 {
        if !self.initialized {
            self.estimate = measurement;
            self.error_covariance = self.measurement_noise;
            self.initialized = true;
            return self.estimate;
        }

        let predicted_covariance = self.error_covariance + self.process_noise;
        let gain = predicted_covariance / (predicted_covariance + self.measurement_noise);

        self.estimate += gain * (measurement - self.estimate);
        self.error_covariance = (1.0 - gain) * predicted_covariance;

        self.estimate
    }

    /// Current filtered estimate.
    pub fn estimate(&self) -> f64 {
        self.estimate
    }
}

/// Smooths a circular (mod-360) quantity without wrap discontinuity.
///
/// Internally runs two independent [`ScalarKalman`] filters over the cosine
/// and sine of the heading. State is created once at session start and
/// mutated on every sample; it is never reset within a session.
///
/// # Example
/// ```
/// use fusion_compass::{CircularFilter, SmoothingSettings};
///
/// let mut filter = CircularFilter::new(SmoothingSettings::default()).unwrap();
/// let smoothed = filter.smooth(359.0);
/// assert!((smoothed - 359.0).abs() < 1e-9); // first sample passes through
/// ```
#[derive(Debug, Clone, Copy)]
pub struct CircularFilter {
    heading_x: ScalarKalman,
    heading_y: ScalarKalman,
}

impl CircularFilter {
    /// Capability probe and constructor.
    ///
    /// Returns `None` when the settings cannot produce a working filter
    /// (non-finite or non-positive noise terms). Callers treat `None` as
    /// "smoothing unavailable" and bypass the filter rather than failing.
    pub fn new(settings: SmoothingSettings) -> Option<Self> {
        let usable = settings.process_noise.is_finite()
            && settings.process_noise > 0.0
            && settings.measurement_noise.is_finite()
            && settings.measurement_noise > 0.0;
        if !usable {
            return None;
        }

        Some(Self {
            heading_x: ScalarKalman::new(settings.process_noise, settings.measurement_noise),
            heading_y: ScalarKalman::new(settings.process_noise, settings.measurement_noise),
        })
    }

    /// Smooth one heading reading in degrees, returning a value in `[0, 360)`.
    ///
    /// If either filtered component comes back non-finite, the raw input is
    /// returned unchanged for this sample and the filter state is left as it
    /// was, so one degenerate reading cannot poison later samples.
    pub fn smooth(&mut self, heading_deg: f64) -> f64 {
        let theta = heading_deg.to_radians();

        let saved = *self;
        let filtered_x = self.heading_x.update(theta.cos());
        let filtered_y = self.heading_y.update(theta.sin());

        if !filtered_x.is_finite() || !filtered_y.is_finite() {
            *self = saved;
            return normalize_deg(heading_deg);
        }

        normalize_deg(filtered_y.atan2(filtered_x).to_degrees())
    }
}
