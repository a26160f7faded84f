//! Session facade tying heading fusion to target projection
//!
//! One [`FusionSession`] is constructed per AR session and handed to every
//! platform callback, replacing the tangle of top-level mutable state the
//! callbacks would otherwise share. Entry points mirror the host callbacks
//! one to one; reads are synchronous.

use log::warn;

use crate::error::FusionResult;
use crate::fusion::{FusionState, HeadingFusion, SourceProbe};
use crate::orientation::quaternion_from_xyzw;
use crate::projection::{TargetDiagnostics, TargetTracker};
use crate::types::{
    FusionSettings, GeoPoint, HeadingSample, LegacyOrientationEvent, Position, WorldAnchor,
};
use nalgebra::Vector3;

/// Owns the fusion controller and the target tracker for one AR session.
///
/// # Example
/// ```
/// use fusion_compass::{FusionSession, FusionSettings, SourceProbe};
///
/// let mut session = FusionSession::new(FusionSettings::default());
/// session.start(SourceProbe {
///     absolute_orientation: true,
///     ..Default::default()
/// });
///
/// session.on_location_fix(50.0, 0.0);
/// session.resolve_user_elevation(Some(12.0));
/// session.select_target(50.0089, 0.0);
/// session.resolve_target_elevation(Some(30.0));
///
/// let placement = session.target_placement().unwrap();
/// assert!(placement.z < 0.0); // north of the viewer sits at negative z
/// ```
pub struct FusionSession {
    fusion: HeadingFusion,
    tracker: TargetTracker,
}

impl FusionSession {
    pub fn new(settings: FusionSettings) -> Self {
        Self {
            fusion: HeadingFusion::new(settings),
            tracker: TargetTracker::new(),
        }
    }

    /// Probe outcome in, source selection out. See [`HeadingFusion::start`].
    pub fn start(&mut self, probe: SourceProbe) -> FusionState {
        self.fusion.start(probe)
    }

    // ── Platform callbacks ──────────────────────────────────────────────

    /// A geolocation fix arrived.
    pub fn on_location_fix(&mut self, lat: f64, lng: f64) {
        self.tracker.on_location_fix(GeoPoint::new(lat, lng));
    }

    /// An absolute-orientation reading arrived, components in `[x, y, z, w]`
    /// wire order.
    pub fn on_quaternion_reading(&mut self, components: [f64; 4], timestamp_ms: f64) {
        self.fusion
            .on_quaternion_reading(quaternion_from_xyzw(components), timestamp_ms);
    }

    /// A legacy orientation event arrived.
    pub fn on_legacy_reading(&mut self, event: &LegacyOrientationEvent) {
        self.fusion.on_legacy_reading(event);
    }

    /// The active orientation sensor reported an error.
    pub fn on_sensor_error(&mut self, reason: &str) {
        self.fusion.on_sensor_error(reason);
    }

    // ── One-shot lookup resolutions ─────────────────────────────────────

    /// Outcome of the declination lookup for the current location.
    ///
    /// `None` means the lookup failed or the capability is absent; that is a
    /// permanent, non-fatal condition and headings keep their magnetic label.
    pub fn resolve_declination(&mut self, lookup: Option<f64>) {
        match lookup {
            Some(value_deg) => self.fusion.set_declination(value_deg),
            None => self.fusion.declination_unavailable("lookup failed"),
        }
    }

    /// Outcome of the elevation lookup for the user location. A failed
    /// lookup falls back to 0 m so projection can proceed.
    pub fn resolve_user_elevation(&mut self, lookup: Option<f64>) {
        self.tracker
            .resolve_user_elevation(Self::elevation_or_fallback(lookup, "user"));
    }

    /// Outcome of the elevation lookup for the selected target.
    pub fn resolve_target_elevation(&mut self, lookup: Option<f64>) {
        self.tracker
            .resolve_target_elevation(Self::elevation_or_fallback(lookup, "target"));
    }

    /// The user picked a target on the map.
    pub fn select_target(&mut self, lat: f64, lng: f64) {
        self.tracker.set_target(GeoPoint::new(lat, lng));
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Manual calibration trim from the UI.
    pub fn set_calibration_offset(&mut self, offset_deg: f64) {
        self.fusion.set_calibration_offset(offset_deg);
    }

    /// Current screen rotation angle, consulted per legacy reading.
    pub fn set_screen_orientation(&mut self, angle_deg: f64) {
        self.fusion.set_screen_orientation(angle_deg);
    }

    /// Install a per-sample callback for push-style consumers.
    pub fn set_observer(&mut self, observer: impl FnMut(&HeadingSample) + 'static) {
        self.fusion.set_observer(observer);
    }

    // ── Synchronous views ───────────────────────────────────────────────

    /// Latest fused heading sample, if any.
    pub fn current_sample(&self) -> Option<HeadingSample> {
        self.fusion.current_sample()
    }

    pub fn state(&self) -> FusionState {
        self.fusion.state()
    }

    /// Fixed anchor-relative target placement for the renderer.
    pub fn target_placement(&self) -> FusionResult<Vector3<f64>> {
        self.tracker.target_placement()
    }

    /// Anchor-relative viewer placement for the current fix.
    pub fn viewer_placement(&self) -> FusionResult<Vector3<f64>> {
        self.tracker.viewer_placement()
    }

    /// User-relative offset to the target.
    pub fn offset_to_target(&self) -> FusionResult<Vector3<f64>> {
        self.tracker.offset_to_target()
    }

    /// Distance, bearing, and view-cone readouts against the latest fused
    /// heading (or against heading 0 when no sample exists yet).
    pub fn diagnostics(&self) -> FusionResult<TargetDiagnostics> {
        let heading = self
            .current_sample()
            .map(|sample| sample.heading_deg)
            .unwrap_or(0.0);
        self.tracker.diagnostics(heading)
    }

    pub fn user_position(&self) -> Option<Position> {
        self.tracker.user()
    }

    pub fn target_position(&self) -> Option<Position> {
        self.tracker.target()
    }

    pub fn anchor(&self) -> Option<WorldAnchor> {
        self.tracker.anchor()
    }

    fn elevation_or_fallback(lookup: Option<f64>, which: &str) -> f64 {
        lookup.unwrap_or_else(|| {
            warn!("{which} elevation lookup failed; falling back to 0 m");
            0.0
        })
    }
}
