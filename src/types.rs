//! Core types for the heading fusion and projection engine

use serde::{Deserialize, Serialize};

/// Which sensor source produced a heading sample.
///
/// The source affects downstream declination policy: absolute-orientation
/// quaternions are already referenced to true north, while legacy compass
/// events report magnetic headings that need a declination correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingSource {
    /// Quaternion-based absolute-orientation sensor.
    Absolute,
    /// Legacy per-event orientation (compass heading or rotation angle).
    Legacy,
}

/// Whether a heading is referenced to true north or magnetic north.
///
/// Legacy headings stay `Magnetic` until a declination lookup for the current
/// location succeeds; consumers label the reading accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingReference {
    /// Referenced to geographic (true) north.
    True,
    /// Referenced to magnetic north; no declination correction applied.
    Magnetic,
}

/// One fused heading reading, emitted per raw sensor event.
///
/// Immutable once emitted. Consumers read the latest sample synchronously;
/// there is no buffering and the last value wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingSample {
    /// Fused compass heading in degrees, normalized to `[0, 360)`.
    /// 0 = north, 90 = east.
    pub heading_deg: f64,
    /// Device pitch in degrees. Not wrapped; out-of-range inputs pass through.
    pub pitch_deg: f64,
    /// Sensor source that produced this sample.
    pub source: HeadingSource,
    /// True-north or magnetic-north reference.
    pub reference: HeadingReference,
    /// Platform event timestamp in milliseconds.
    pub timestamp_ms: f64,
}

impl HeadingSample {
    /// True when the sample came from the absolute-orientation source.
    pub fn is_absolute(&self) -> bool {
        self.source == HeadingSource::Absolute
    }
}

/// A geographic coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A geographic point with an asynchronously resolved elevation.
///
/// Elevation starts unknown and is resolved exactly once per point by an
/// external lookup. Until then, 3D projection involving the point is deferred.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub point: GeoPoint,
    /// Elevation above sea level in meters, `None` until resolved.
    pub elevation_m: Option<f64>,
}

impl Position {
    /// New position with unresolved elevation.
    pub fn new(point: GeoPoint) -> Self {
        Self {
            point,
            elevation_m: None,
        }
    }

    /// True once the elevation lookup has completed for this point.
    pub fn is_resolved(&self) -> bool {
        self.elevation_m.is_some()
    }
}

/// Fixed origin of the local 3D scene, captured once and immutable thereafter.
///
/// Anchoring the scene to the first resolved location fix decouples target
/// placement from GPS jitter on later fixes: the target offset is computed
/// once against the anchor and only the viewer offset is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldAnchor {
    pub point: GeoPoint,
    pub elevation_m: f64,
}

/// Magnetic declination for the current user location.
///
/// `available` stays false until a declination lookup succeeds. While
/// unavailable, legacy headings pass through uncorrected and are labeled
/// [`HeadingReference::Magnetic`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeclinationState {
    /// Angular offset between magnetic north and true north, degrees.
    pub value_deg: f64,
    pub available: bool,
}

impl DeclinationState {
    /// Apply the correction to a magnetic heading, returning the corrected
    /// heading and the reference it now carries.
    pub fn correct(&self, magnetic_heading_deg: f64) -> (f64, HeadingReference) {
        if self.available {
            (magnetic_heading_deg + self.value_deg, HeadingReference::True)
        } else {
            (magnetic_heading_deg, HeadingReference::Magnetic)
        }
    }
}

/// Tuning for the two scalar smoothing filters behind the circular filter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingSettings {
    /// Process noise (q). Higher values track fast rotation with less lag.
    pub process_noise: f64,
    /// Measurement noise (r). Higher values damp sensor jitter harder.
    pub measurement_noise: f64,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        // Tuned for hand-held compass rates, roughly 30-60 events/s.
        Self {
            process_noise: 0.01,
            measurement_noise: 0.25,
        }
    }
}

/// Fusion controller configuration.
///
/// # Example
/// ```
/// use fusion_compass::FusionSettings;
///
/// let settings = FusionSettings {
///     calibration_offset_deg: -3.5, // manual trim from the UI slider
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FusionSettings {
    /// Manual calibration trim, added to every fused heading.
    pub calibration_offset_deg: f64,
    /// Screen rotation compensation in degrees, applied to legacy readings
    /// only. Absolute-orientation readings are already world-referenced.
    pub screen_orientation_deg: f64,
    pub smoothing: SmoothingSettings,
}

/// A legacy orientation event as delivered by the platform.
///
/// Mirrors the browser `deviceorientation` shape: `alpha` is the rotation
/// around the vertical axis, `beta` the front-back tilt, and
/// `compass_heading` the compass-specific field that some platforms expose
/// and which is preferred when present.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LegacyOrientationEvent {
    /// Rotation around the vertical axis in degrees, if reported.
    pub alpha: Option<f64>,
    /// Front-back tilt in degrees, if reported.
    pub beta: Option<f64>,
    /// Compass-specific heading field in degrees, if the platform exposes one.
    pub compass_heading: Option<f64>,
    /// Whether the platform flagged the event as absolutely referenced.
    pub absolute: bool,
    /// Platform event timestamp in milliseconds.
    pub timestamp_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declination_correction() {
        let unavailable = DeclinationState::default();
        let (heading, reference) = unavailable.correct(100.0);
        assert_eq!(heading, 100.0);
        assert_eq!(reference, HeadingReference::Magnetic);

        let available = DeclinationState {
            value_deg: 2.5,
            available: true,
        };
        let (heading, reference) = available.correct(100.0);
        assert_eq!(heading, 102.5);
        assert_eq!(reference, HeadingReference::True);
    }

    #[test]
    fn test_position_resolution() {
        let mut position = Position::new(GeoPoint::new(48.8566, 2.3522));
        assert!(!position.is_resolved());

        position.elevation_m = Some(35.0);
        assert!(position.is_resolved());
    }

    #[test]
    fn test_sample_source_flag() {
        let sample = HeadingSample {
            heading_deg: 0.0,
            pitch_deg: 0.0,
            source: HeadingSource::Legacy,
            reference: HeadingReference::Magnetic,
            timestamp_ms: 0.0,
        };
        assert!(!sample.is_absolute());
    }
}
