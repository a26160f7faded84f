//! Heading fusion controller
//!
//! Selects between the absolute-orientation sensor and legacy orientation
//! events, applies declination and configured corrections, drives the
//! circular smoothing filter, and emits one canonical heading/pitch sample
//! per raw reading.

use log::{debug, info, warn};
use nalgebra::Quaternion;

use crate::filter::CircularFilter;
use crate::geodesy::normalize_deg;
use crate::orientation::{legacy_heading_from_event, quaternion_to_euler};
use crate::types::{
    DeclinationState, FusionSettings, HeadingReference, HeadingSample, HeadingSource,
    LegacyOrientationEvent,
};

/// States of the source selection machine.
///
/// The controller starts `Uninitialized`, probes the platform on
/// [`HeadingFusion::start`], and settles on one source. A sensor error while
/// `AdvancedActive` demotes the session to `LegacyActive` permanently; the
/// advanced source is not retried within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FusionState {
    /// Controller constructed, platform not probed yet.
    Uninitialized,
    /// Probed, but no orientation source is available; no samples are ever
    /// emitted from this state.
    AwaitingSource,
    /// Absolute-orientation quaternion source active.
    AdvancedActive,
    /// Legacy orientation events active. Terminal for the session.
    LegacyActive,
}

impl FusionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::AwaitingSource => "AwaitingSource",
            Self::AdvancedActive => "AdvancedActive",
            Self::LegacyActive => "LegacyActive",
        }
    }
}

/// Result of probing the platform for orientation capabilities.
///
/// Capability absence is ordinary data here, not an exception path: the
/// hosting shell checks what it can construct or register once at session
/// start and hands the outcome over.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceProbe {
    /// An absolute-orientation sensor could be constructed.
    pub absolute_orientation: bool,
    /// The platform exposes an absolutely-referenced legacy event type.
    pub legacy_absolute_events: bool,
    /// The platform exposes the standard relative orientation event.
    pub legacy_events: bool,
}

impl SourceProbe {
    /// Preferred legacy registration, if any: absolutely-referenced events
    /// beat relative ones.
    fn legacy_binding(&self) -> Option<LegacyBinding> {
        if self.legacy_absolute_events {
            Some(LegacyBinding::AbsoluteEvents)
        } else if self.legacy_events {
            Some(LegacyBinding::RelativeEvents)
        } else {
            None
        }
    }
}

/// Which legacy event registration the controller chose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyBinding {
    AbsoluteEvents,
    RelativeEvents,
}

impl LegacyBinding {
    fn label(self) -> &'static str {
        match self {
            Self::AbsoluteEvents => "absolute",
            Self::RelativeEvents => "relative",
        }
    }
}

type Observer = Box<dyn FnMut(&HeadingSample)>;

/// The heading fusion state machine.
///
/// Owns the smoothing filter state, the declination state, and the current
/// sample. Single-threaded by construction: all entry points are plain
/// `&mut self` methods invoked from the host's event loop, and consumers read
/// the latest sample synchronously.
///
/// # Example
/// ```
/// use fusion_compass::{FusionSettings, FusionState, HeadingFusion, SourceProbe};
/// use fusion_compass::orientation::quaternion_from_xyzw;
///
/// let mut fusion = HeadingFusion::new(FusionSettings::default());
/// let probe = SourceProbe {
///     absolute_orientation: true,
///     ..Default::default()
/// };
/// assert_eq!(fusion.start(probe), FusionState::AdvancedActive);
///
/// fusion.on_quaternion_reading(quaternion_from_xyzw([0.0, 0.0, 0.0, 1.0]), 0.0);
/// let sample = fusion.current_sample().unwrap();
/// assert_eq!(sample.heading_deg, 0.0);
/// ```
pub struct HeadingFusion {
    state: FusionState,
    settings: FusionSettings,
    probe: SourceProbe,
    declination: DeclinationState,
    filter: Option<CircularFilter>,
    legacy_binding: Option<LegacyBinding>,
    legacy_fault_reported: bool,
    current: Option<HeadingSample>,
    observer: Option<Observer>,
}

impl HeadingFusion {
    /// Create a controller with the given settings.
    ///
    /// The smoothing filter is constructed here, once. If construction fails
    /// the controller runs unsmoothed; that is a degradation, not an error.
    pub fn new(settings: FusionSettings) -> Self {
        let filter = CircularFilter::new(settings.smoothing);
        if filter.is_none() {
            warn!("smoothing filter unavailable; headings pass through unsmoothed");
        }

        Self {
            state: FusionState::Uninitialized,
            settings,
            probe: SourceProbe::default(),
            declination: DeclinationState::default(),
            filter,
            legacy_binding: None,
            legacy_fault_reported: false,
            current: None,
            observer: None,
        }
    }

    /// Start the session using the platform capabilities reported by `probe`.
    ///
    /// Returns the state the controller settled on. With no orientation
    /// source at all the controller stays in [`FusionState::AwaitingSource`]
    /// and simply never emits samples; consumers must tolerate "heading
    /// unknown" indefinitely.
    pub fn start(&mut self, probe: SourceProbe) -> FusionState {
        self.probe = probe;
        self.state = FusionState::AwaitingSource;

        if probe.absolute_orientation {
            self.state = FusionState::AdvancedActive;
            info!("absolute orientation sensor active");
        } else if let Some(binding) = probe.legacy_binding() {
            self.bind_legacy(binding);
        } else {
            warn!("no orientation source available; heading remains unknown");
        }

        self.state
    }

    /// Process one absolute-orientation quaternion reading.
    ///
    /// The yaw angle is converted from counterclockwise mathematical
    /// convention to a clockwise-from-north compass heading. Absolute
    /// orientation is already referenced to true north, so no declination is
    /// applied. Pitch assumes the device held vertically with the camera
    /// looking along -z.
    pub fn on_quaternion_reading(&mut self, q: Quaternion<f64>, timestamp_ms: f64) {
        if self.state != FusionState::AdvancedActive {
            debug!(
                "quaternion reading ignored in state {}",
                self.state.label()
            );
            return;
        }

        let euler = quaternion_to_euler(&q);
        let heading = normalize_deg(360.0 - euler.yaw.to_degrees());
        let pitch = euler.pitch.to_degrees();

        self.emit(
            heading,
            pitch,
            HeadingSource::Absolute,
            HeadingReference::True,
            timestamp_ms,
        );
    }

    /// Process one legacy orientation event.
    ///
    /// Legacy headings are magnetic; the declination correction is applied
    /// whenever a lookup has resolved, otherwise the sample is labeled
    /// [`HeadingReference::Magnetic`] and passed through. An event without a
    /// usable heading field is dropped and reported once; later readings are
    /// processed normally.
    pub fn on_legacy_reading(&mut self, event: &LegacyOrientationEvent) {
        if self.state != FusionState::LegacyActive {
            debug!("legacy reading ignored in state {}", self.state.label());
            return;
        }

        match legacy_heading_from_event(event) {
            Ok((magnetic, pitch)) => {
                self.legacy_fault_reported = false;
                let (corrected, reference) = self.declination.correct(magnetic);
                self.emit(
                    normalize_deg(corrected),
                    pitch,
                    HeadingSource::Legacy,
                    reference,
                    event.timestamp_ms,
                );
            }
            Err(err) => {
                if !self.legacy_fault_reported {
                    warn!("legacy orientation reading dropped: {err}");
                    self.legacy_fault_reported = true;
                }
            }
        }
    }

    /// Handle an error reported by the active sensor.
    ///
    /// For the advanced source this permanently demotes the session to the
    /// legacy path (or to `AwaitingSource` when no legacy events exist).
    /// Legacy errors are logged and the session keeps going.
    pub fn on_sensor_error(&mut self, reason: &str) {
        match self.state {
            FusionState::AdvancedActive => {
                warn!("absolute orientation sensor failed ({reason}); falling back");
                match self.probe.legacy_binding() {
                    Some(binding) => self.bind_legacy(binding),
                    None => {
                        warn!("no legacy orientation events available; heading remains unknown");
                        self.state = FusionState::AwaitingSource;
                    }
                }
            }
            FusionState::LegacyActive => {
                warn!("legacy orientation error: {reason}");
            }
            _ => {
                debug!("sensor error in state {}: {reason}", self.state.label());
            }
        }
    }

    /// Record a resolved magnetic declination for the current location.
    pub fn set_declination(&mut self, value_deg: f64) {
        self.declination = DeclinationState {
            value_deg,
            available: true,
        };
        info!("magnetic declination resolved: {value_deg:.2} deg");
    }

    /// Note that the declination lookup failed or is unsupported.
    ///
    /// Permanent and non-fatal: legacy headings keep their magnetic label.
    pub fn declination_unavailable(&mut self, reason: &str) {
        warn!("declination lookup unavailable ({reason}); headings remain magnetic");
    }

    /// Latest fused sample, if any reading has been processed.
    pub fn current_sample(&self) -> Option<HeadingSample> {
        self.current
    }

    pub fn state(&self) -> FusionState {
        self.state
    }

    pub fn settings(&self) -> FusionSettings {
        self.settings
    }

    /// Legacy event registration chosen, if the legacy path is active.
    pub fn legacy_binding(&self) -> Option<LegacyBinding> {
        self.legacy_binding
    }

    pub fn declination(&self) -> DeclinationState {
        self.declination
    }

    /// Whether the smoothing filter was successfully constructed.
    pub fn smoothing_active(&self) -> bool {
        self.filter.is_some()
    }

    /// Update the manual calibration trim.
    pub fn set_calibration_offset(&mut self, offset_deg: f64) {
        self.settings.calibration_offset_deg = offset_deg;
    }

    /// Update the screen rotation compensation consulted per legacy reading.
    pub fn set_screen_orientation(&mut self, angle_deg: f64) {
        self.settings.screen_orientation_deg = angle_deg;
    }

    /// Install a callback invoked with every emitted sample.
    pub fn set_observer(&mut self, observer: impl FnMut(&HeadingSample) + 'static) {
        self.observer = Some(Box::new(observer));
    }

    fn bind_legacy(&mut self, binding: LegacyBinding) {
        self.legacy_binding = Some(binding);
        self.state = FusionState::LegacyActive;
        info!("legacy orientation events active ({})", binding.label());
    }

    /// Smooth, correct, and publish one heading reading.
    fn emit(
        &mut self,
        heading_deg: f64,
        pitch_deg: f64,
        source: HeadingSource,
        reference: HeadingReference,
        timestamp_ms: f64,
    ) {
        let smoothed = match self.filter.as_mut() {
            Some(filter) => filter.smooth(heading_deg),
            None => normalize_deg(heading_deg),
        };

        // Screen rotation applies to the legacy path only; absolute
        // orientation is already world-referenced.
        let screen_corrected = if source == HeadingSource::Legacy {
            normalize_deg(smoothed + self.settings.screen_orientation_deg)
        } else {
            smoothed
        };

        let final_heading = normalize_deg(screen_corrected + self.settings.calibration_offset_deg);

        let sample = HeadingSample {
            heading_deg: final_heading,
            pitch_deg,
            source,
            reference,
            timestamp_ms,
        };

        if let Some(observer) = self.observer.as_mut() {
            observer(&sample);
        }
        self.current = Some(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::quaternion_from_xyzw;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn advanced_probe() -> SourceProbe {
        SourceProbe {
            absolute_orientation: true,
            legacy_absolute_events: true,
            legacy_events: true,
        }
    }

    fn legacy_probe() -> SourceProbe {
        SourceProbe {
            absolute_orientation: false,
            legacy_absolute_events: false,
            legacy_events: true,
        }
    }

    fn identity_quaternion() -> nalgebra::Quaternion<f64> {
        quaternion_from_xyzw([0.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn test_start_prefers_advanced_source() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        assert_eq!(fusion.state(), FusionState::Uninitialized);
        assert_eq!(fusion.start(advanced_probe()), FusionState::AdvancedActive);
    }

    #[test]
    fn test_start_prefers_absolute_legacy_events() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        let probe = SourceProbe {
            absolute_orientation: false,
            legacy_absolute_events: true,
            legacy_events: true,
        };
        assert_eq!(fusion.start(probe), FusionState::LegacyActive);
        assert_eq!(fusion.legacy_binding(), Some(LegacyBinding::AbsoluteEvents));
    }

    #[test]
    fn test_start_without_any_source() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        assert_eq!(
            fusion.start(SourceProbe::default()),
            FusionState::AwaitingSource
        );

        // Readings in this state are ignored and nothing is ever emitted.
        fusion.on_quaternion_reading(identity_quaternion(), 0.0);
        fusion.on_legacy_reading(&LegacyOrientationEvent {
            alpha: Some(90.0),
            ..Default::default()
        });
        assert!(fusion.current_sample().is_none());
    }

    #[test]
    fn test_advanced_heading_from_yaw() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(advanced_probe());

        // 90 degree counterclockwise yaw reads as a 270 degree compass heading.
        let half = FRAC_PI_2 / 2.0;
        let q = quaternion_from_xyzw([0.0, 0.0, half.sin(), half.cos()]);
        fusion.on_quaternion_reading(q, 5.0);

        let sample = fusion.current_sample().unwrap();
        assert_relative_eq!(sample.heading_deg, 270.0, epsilon = 1e-9);
        assert_eq!(sample.source, HeadingSource::Absolute);
        assert_eq!(sample.reference, HeadingReference::True);
        assert_eq!(sample.timestamp_ms, 5.0);
    }

    #[test]
    fn test_advanced_path_skips_declination() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(advanced_probe());
        fusion.set_declination(10.0);

        fusion.on_quaternion_reading(identity_quaternion(), 0.0);
        let sample = fusion.current_sample().unwrap();
        assert_relative_eq!(sample.heading_deg, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_legacy_magnetic_until_declination_resolves() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(legacy_probe());

        let event = LegacyOrientationEvent {
            alpha: Some(100.0),
            beta: Some(20.0),
            timestamp_ms: 1.0,
            ..Default::default()
        };
        fusion.on_legacy_reading(&event);
        let sample = fusion.current_sample().unwrap();
        assert_relative_eq!(sample.heading_deg, 100.0, epsilon = 1e-9);
        assert_eq!(sample.reference, HeadingReference::Magnetic);
        assert_eq!(sample.pitch_deg, 20.0);

        fusion.set_declination(2.0);
        // Restart smoothing history by checking only the reference and the
        // eventual convergence target.
        for _ in 0..300 {
            fusion.on_legacy_reading(&event);
        }
        let sample = fusion.current_sample().unwrap();
        assert_eq!(sample.reference, HeadingReference::True);
        assert_relative_eq!(sample.heading_deg, 102.0, epsilon = 0.1);
    }

    #[test]
    fn test_screen_rotation_applies_to_legacy_only() {
        let settings = FusionSettings {
            screen_orientation_deg: 90.0,
            ..Default::default()
        };

        let mut advanced = HeadingFusion::new(settings);
        advanced.start(advanced_probe());
        advanced.on_quaternion_reading(identity_quaternion(), 0.0);
        assert_relative_eq!(
            advanced.current_sample().unwrap().heading_deg,
            0.0,
            epsilon = 1e-9
        );

        let mut legacy = HeadingFusion::new(settings);
        legacy.start(legacy_probe());
        legacy.on_legacy_reading(&LegacyOrientationEvent {
            alpha: Some(10.0),
            ..Default::default()
        });
        assert_relative_eq!(
            legacy.current_sample().unwrap().heading_deg,
            100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_calibration_offset_applies_to_both_paths() {
        let settings = FusionSettings {
            calibration_offset_deg: -5.0,
            ..Default::default()
        };

        let mut advanced = HeadingFusion::new(settings);
        advanced.start(advanced_probe());
        advanced.on_quaternion_reading(identity_quaternion(), 0.0);
        assert_relative_eq!(
            advanced.current_sample().unwrap().heading_deg,
            355.0,
            epsilon = 1e-9
        );

        let mut legacy = HeadingFusion::new(settings);
        legacy.start(legacy_probe());
        legacy.on_legacy_reading(&LegacyOrientationEvent {
            alpha: Some(10.0),
            ..Default::default()
        });
        assert_relative_eq!(
            legacy.current_sample().unwrap().heading_deg,
            5.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_sensor_error_demotes_permanently() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(advanced_probe());
        assert_eq!(fusion.state(), FusionState::AdvancedActive);

        fusion.on_sensor_error("read failure");
        assert_eq!(fusion.state(), FusionState::LegacyActive);
        assert_eq!(fusion.legacy_binding(), Some(LegacyBinding::AbsoluteEvents));

        // Quaternion readings are dead after demotion.
        fusion.on_quaternion_reading(identity_quaternion(), 0.0);
        assert!(fusion.current_sample().is_none());

        // A later legacy error does not change state.
        fusion.on_sensor_error("transient");
        assert_eq!(fusion.state(), FusionState::LegacyActive);
    }

    #[test]
    fn test_sensor_error_without_legacy_fallback() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(SourceProbe {
            absolute_orientation: true,
            ..Default::default()
        });
        fusion.on_sensor_error("read failure");
        assert_eq!(fusion.state(), FusionState::AwaitingSource);
    }

    #[test]
    fn test_unsmoothed_fallback() {
        let settings = FusionSettings {
            smoothing: crate::SmoothingSettings {
                process_noise: f64::NAN,
                measurement_noise: 0.25,
            },
            ..Default::default()
        };
        let mut fusion = HeadingFusion::new(settings);
        assert!(!fusion.smoothing_active());

        fusion.start(legacy_probe());
        for alpha in [350.0, 355.0, 2.0] {
            fusion.on_legacy_reading(&LegacyOrientationEvent {
                alpha: Some(alpha),
                ..Default::default()
            });
        }
        // Raw passthrough: the last reading is reported exactly.
        assert_relative_eq!(
            fusion.current_sample().unwrap().heading_deg,
            2.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_bad_legacy_reading_does_not_halt_pipeline() {
        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.start(legacy_probe());

        fusion.on_legacy_reading(&LegacyOrientationEvent::default());
        assert!(fusion.current_sample().is_none());

        fusion.on_legacy_reading(&LegacyOrientationEvent {
            alpha: Some(45.0),
            ..Default::default()
        });
        assert_relative_eq!(
            fusion.current_sample().unwrap().heading_deg,
            45.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_observer_sees_every_sample() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut fusion = HeadingFusion::new(FusionSettings::default());
        fusion.set_observer(move |sample: &HeadingSample| {
            sink.borrow_mut().push(sample.heading_deg);
        });
        fusion.start(legacy_probe());

        for alpha in [10.0, 10.0, 10.0] {
            fusion.on_legacy_reading(&LegacyOrientationEvent {
                alpha: Some(alpha),
                ..Default::default()
            });
        }
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn test_state_labels() {
        assert_eq!(FusionState::Uninitialized.label(), "Uninitialized");
        assert_eq!(FusionState::LegacyActive.label(), "LegacyActive");
    }
}
