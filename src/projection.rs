//! Target placement and visibility reasoning
//!
//! Turns the pair of live geographic positions (user, target) into the 3D
//! placement vectors and scalar diagnostics the renderer consumes. Placement
//! uses a fixed world anchor captured on the first resolved location fix:
//! the target offset is computed once against the anchor and stays put, and
//! only the viewer offset is recomputed per fix, so GPS jitter moves the
//! camera instead of the target.

use log::{debug, info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};
use crate::geodesy::{bearing_deg, distance_km, local_offset_meters, wrap_signed_deg};
use crate::types::{GeoPoint, Position, WorldAnchor};

/// Default half-angle of the "in view" cone in degrees.
pub const IN_VIEW_THRESHOLD_DEG: f64 = 2.0;

/// Local 3D offset from `origin` to `target`, requiring both elevations.
///
/// Returns [`FusionError::ElevationPending`] until both lookups have
/// resolved; callers retry once the missing elevation arrives.
pub fn project_target(origin: &Position, target: &Position) -> FusionResult<Vector3<f64>> {
    let origin_elevation = origin
        .elevation_m
        .ok_or(FusionError::ElevationPending("origin"))?;
    let target_elevation = target
        .elevation_m
        .ok_or(FusionError::ElevationPending("target"))?;

    Ok(local_offset_meters(
        origin.point,
        origin_elevation,
        target.point,
        target_elevation,
    ))
}

/// Signed angle from the current heading to the target bearing, `(-180, 180]`.
///
/// Zero means the target is dead ahead; positive means the target lies
/// clockwise (to the right) of the current heading.
pub fn angle_to_target(user: GeoPoint, target: GeoPoint, current_heading_deg: f64) -> f64 {
    wrap_signed_deg(bearing_deg(user, target) - current_heading_deg)
}

/// Whether an angle difference falls inside the view cone.
pub fn in_view(angle_diff_deg: f64, threshold_deg: f64) -> bool {
    angle_diff_deg.abs() <= threshold_deg
}

/// Scalar readouts for the diagnostics overlay and arrow indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetDiagnostics {
    pub distance_m: f64,
    pub bearing_deg: f64,
    pub angle_diff_deg: f64,
    pub in_view: bool,
}

/// A scene pinned to a world anchor.
///
/// The target offset is computed once at construction and is immutable; the
/// viewer offset is recomputed from each location fix against the same
/// anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchoredScene {
    anchor: WorldAnchor,
    target_offset: Vector3<f64>,
}

impl AnchoredScene {
    /// Place `target` relative to `anchor`. Requires the target elevation.
    pub fn new(anchor: WorldAnchor, target: &Position) -> FusionResult<Self> {
        let target_elevation = target
            .elevation_m
            .ok_or(FusionError::ElevationPending("target"))?;

        Ok(Self {
            anchor,
            target_offset: local_offset_meters(
                anchor.point,
                anchor.elevation_m,
                target.point,
                target_elevation,
            ),
        })
    }

    /// Fixed offset from the anchor to the target in meters.
    pub fn target_offset(&self) -> Vector3<f64> {
        self.target_offset
    }

    /// Offset from the anchor to the viewer in meters, recomputed per fix.
    pub fn viewer_offset(&self, user: &Position) -> FusionResult<Vector3<f64>> {
        let user_elevation = user
            .elevation_m
            .ok_or(FusionError::ElevationPending("user"))?;

        Ok(local_offset_meters(
            self.anchor.point,
            self.anchor.elevation_m,
            user.point,
            user_elevation,
        ))
    }

    pub fn anchor(&self) -> WorldAnchor {
        self.anchor
    }
}

/// Stateful projection service owning the two live positions.
///
/// Tracks the user position across location fixes, the selected target, the
/// one-shot elevation resolution for each, and the world anchor captured
/// from the first fix once its elevation is known.
#[derive(Debug, Clone, Default)]
pub struct TargetTracker {
    user: Option<Position>,
    first_fix: Option<GeoPoint>,
    target: Option<Position>,
    anchor: Option<WorldAnchor>,
    scene: Option<AnchoredScene>,
}

impl TargetTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a location fix. The first fix is remembered as the anchor
    /// candidate; later fixes move the user but never the anchor.
    pub fn on_location_fix(&mut self, point: GeoPoint) {
        if self.first_fix.is_none() {
            self.first_fix = Some(point);
            info!("first location fix at {:.5}, {:.5}", point.lat, point.lng);
        }

        let elevation = self.user.and_then(|user| user.elevation_m);
        self.user = Some(Position {
            point,
            elevation_m: elevation,
        });
    }

    /// Select a new target. Resets the target elevation (a fresh lookup is
    /// expected) and the scene placement derived from it.
    pub fn set_target(&mut self, point: GeoPoint) {
        self.target = Some(Position::new(point));
        self.scene = None;
    }

    /// Resolve the user elevation, once.
    ///
    /// Completes the world anchor from the first fix and, when the target is
    /// already resolved, builds the anchored scene.
    pub fn resolve_user_elevation(&mut self, elevation_m: f64) {
        let Some(user) = self.user.as_mut() else {
            warn!("user elevation resolved before any location fix; ignored");
            return;
        };
        if user.elevation_m.is_some() {
            debug!("user elevation already resolved; ignoring duplicate");
            return;
        }
        user.elevation_m = Some(elevation_m);

        if self.anchor.is_none() {
            if let Some(point) = self.first_fix {
                self.anchor = Some(WorldAnchor {
                    point,
                    elevation_m,
                });
                info!("world anchor captured at {elevation_m:.1} m");
            }
        }
        self.rebuild_scene();
    }

    /// Resolve the target elevation, once per selected target.
    pub fn resolve_target_elevation(&mut self, elevation_m: f64) {
        let Some(target) = self.target.as_mut() else {
            warn!("target elevation resolved before target selection; ignored");
            return;
        };
        if target.elevation_m.is_some() {
            debug!("target elevation already resolved; ignoring duplicate");
            return;
        }
        target.elevation_m = Some(elevation_m);
        self.rebuild_scene();
    }

    /// Fixed anchor-relative target placement.
    pub fn target_placement(&self) -> FusionResult<Vector3<f64>> {
        match self.scene {
            Some(scene) => Ok(scene.target_offset()),
            None => Err(self.placement_blocker()),
        }
    }

    /// Anchor-relative viewer placement for the current fix.
    pub fn viewer_placement(&self) -> FusionResult<Vector3<f64>> {
        let scene = self.scene.as_ref().ok_or_else(|| self.placement_blocker())?;
        let user = self.user.as_ref().ok_or(FusionError::AwaitingLocationFix)?;
        scene.viewer_offset(user)
    }

    /// User-relative offset to the target, for diagnostics and for renderers
    /// that skip the anchor model.
    pub fn offset_to_target(&self) -> FusionResult<Vector3<f64>> {
        let user = self.user.as_ref().ok_or(FusionError::AwaitingLocationFix)?;
        let target = self.target.as_ref().ok_or(FusionError::NoTargetSelected)?;
        project_target(user, target)
    }

    /// Distance, bearing, and view-cone readouts for the given fused heading.
    pub fn diagnostics(&self, current_heading_deg: f64) -> FusionResult<TargetDiagnostics> {
        let user = self.user.ok_or(FusionError::AwaitingLocationFix)?;
        let target = self.target.ok_or(FusionError::NoTargetSelected)?;

        let bearing = bearing_deg(user.point, target.point);
        let angle_diff = angle_to_target(user.point, target.point, current_heading_deg);

        Ok(TargetDiagnostics {
            distance_m: distance_km(user.point, target.point) * 1000.0,
            bearing_deg: bearing,
            angle_diff_deg: angle_diff,
            in_view: in_view(angle_diff, IN_VIEW_THRESHOLD_DEG),
        })
    }

    pub fn user(&self) -> Option<Position> {
        self.user
    }

    pub fn target(&self) -> Option<Position> {
        self.target
    }

    pub fn anchor(&self) -> Option<WorldAnchor> {
        self.anchor
    }

    /// Most specific reason the anchored scene is not available yet.
    fn placement_blocker(&self) -> FusionError {
        match (&self.target, &self.anchor) {
            (None, _) => FusionError::NoTargetSelected,
            (Some(target), _) if !target.is_resolved() => FusionError::ElevationPending("target"),
            (_, None) => FusionError::AnchorPending,
            _ => FusionError::AnchorPending,
        }
    }

    fn rebuild_scene(&mut self) {
        if let (Some(anchor), Some(target)) = (self.anchor, self.target) {
            if let Ok(scene) = AnchoredScene::new(anchor, &target) {
                self.scene = Some(scene);
            }
        }
    }
}
