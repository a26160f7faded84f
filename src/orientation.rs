//! Orientation decoding for quaternion and legacy sensor events

use nalgebra::Quaternion;

use crate::error::{FusionError, FusionResult};
use crate::geodesy::normalize_deg;
use crate::types::LegacyOrientationEvent;

/// Euler angles in radians, ZYX intrinsic convention.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EulerAngles {
    /// Rotation around the vertical axis, counterclockwise positive.
    pub yaw: f64,
    /// Rotation around the lateral axis. Clamped to `[-pi/2, pi/2]`.
    pub pitch: f64,
    /// Rotation around the longitudinal axis.
    pub roll: f64,
}

/// Build a quaternion from the platform's `[x, y, z, w]` wire order.
///
/// Absolute-orientation sensors deliver components in that order; nalgebra
/// constructs from `(w, i, j, k)`.
pub fn quaternion_from_xyzw(components: [f64; 4]) -> Quaternion<f64> {
    Quaternion::new(components[3], components[0], components[1], components[2])
}

/// Decode a device orientation quaternion into ZYX Euler angles.
///
/// Pure and total: never fails or produces NaN for any finite quaternion.
/// The `asin` argument is clamped to `[-1, 1]` so floating-point overshoot
/// near the poles yields pitch of exactly +-pi/2 (gimbal lock) instead of NaN.
pub fn quaternion_to_euler(q: &Quaternion<f64>) -> EulerAngles {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);

    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));

    EulerAngles { yaw, pitch, roll }
}

/// Extract magnetic heading and pitch from a legacy orientation event.
///
/// Prefers the compass-specific field when the platform exposes one, falling
/// back to the generic rotation-around-vertical-axis field. Pitch comes from
/// the generic tilt field. Fails when the event carries neither heading field.
pub fn legacy_heading_from_event(event: &LegacyOrientationEvent) -> FusionResult<(f64, f64)> {
    let heading = event
        .compass_heading
        .or(event.alpha)
        .ok_or(FusionError::MissingHeadingField)?;

    Ok((normalize_deg(heading), event.beta.unwrap_or(0.0)))
}
