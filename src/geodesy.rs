//! Great-circle distance, bearing, and local 3D offset calculations
//!
//! All functions here are pure. Headings and bearings are degrees clockwise
//! from north; the local offset frame is camera-style with east = +x,
//! up = +y, and north = -z.

use nalgebra::Vector3;

use crate::types::GeoPoint;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Normalize an angle in degrees into `[0, 360)`.
pub fn normalize_deg(angle_deg: f64) -> f64 {
    ((angle_deg % 360.0) + 360.0) % 360.0
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn wrap_signed_deg(angle_deg: f64) -> f64 {
    let normalized = normalize_deg(angle_deg);
    if normalized > 180.0 {
        normalized - 360.0
    } else {
        normalized
    }
}

/// Great-circle distance between two points in kilometers (Haversine).
///
/// `distance_km(p, p)` is exactly zero.
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // atan2 form is stable near antipodal points where h approaches 1
    let c = 2.0 * h.sqrt().atan2((1.0 - h).max(0.0).sqrt());
    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `a` to `b` in degrees, `[0, 360)`.
///
/// 0 = north, 90 = east. Undefined when `a == b` (any value may be returned).
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let y = d_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lng.cos();

    normalize_deg(y.atan2(x).to_degrees())
}

/// Local 3D offset in meters from `origin` to `target`.
///
/// The frame matches a forward-looking camera: east = +x, up = +y, and north
/// = -z, so a target at bearing 0 lands in front of a viewer facing north.
/// The z sign is load-bearing for renderers consuming this offset and must
/// not be flipped.
///
/// # Example
/// ```
/// use fusion_compass::geodesy::local_offset_meters;
/// use fusion_compass::GeoPoint;
///
/// let origin = GeoPoint::new(50.0, 0.0);
/// let target = GeoPoint::new(50.0089, 0.0); // roughly 989 m due north
/// let offset = local_offset_meters(origin, 0.0, target, 0.0);
///
/// assert!(offset.x.abs() < 1.0);
/// assert!((offset.z + 989.0).abs() < 2.0);
/// ```
pub fn local_offset_meters(
    origin: GeoPoint,
    origin_elevation_m: f64,
    target: GeoPoint,
    target_elevation_m: f64,
) -> Vector3<f64> {
    let distance_m = distance_km(origin, target) * 1000.0;
    let bearing_rad = bearing_deg(origin, target).to_radians();

    Vector3::new(
        distance_m * bearing_rad.sin(),
        target_elevation_m - origin_elevation_m,
        -distance_m * bearing_rad.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = GeoPoint::new(48.8566, 2.3522);
        assert_eq!(distance_km(p, p), 0.0);
    }

    #[test]
    fn test_paris_to_london_distance() {
        let paris = GeoPoint::new(48.8566, 2.3522);
        let london = GeoPoint::new(51.5074, -0.1278);
        let distance = distance_km(paris, london);
        assert!(
            (distance - 343.5).abs() < 1.0,
            "Paris-London should be ~343.5 km, got {distance}"
        );
    }

    #[test]
    fn test_bearing_due_north() {
        let bearing = bearing_deg(GeoPoint::new(50.0, 0.0), GeoPoint::new(51.0, 0.0));
        assert_relative_eq!(bearing, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_bearing_due_east_at_lat_50() {
        let bearing = bearing_deg(GeoPoint::new(50.0, 0.0), GeoPoint::new(50.0, 1.76));
        // Initial bearing on the great circle, slightly under 90 at this span
        assert!(
            (bearing - 90.0).abs() < 1.0,
            "eastward bearing should be ~90, got {bearing}"
        );
    }

    #[test]
    fn test_bearing_range() {
        let center = GeoPoint::new(40.0, -3.7);
        for step in 0..24 {
            let angle = f64::from(step) * 15.0f64.to_radians();
            let other = GeoPoint::new(40.0 + angle.cos(), -3.7 + angle.sin());
            let bearing = bearing_deg(center, other);
            assert!(
                (0.0..360.0).contains(&bearing),
                "bearing {bearing} out of range for step {step}"
            );
        }
    }

    #[test]
    fn test_offset_due_north() {
        let origin = GeoPoint::new(50.0, 0.0);
        let target = GeoPoint::new(50.0089, 0.0); // ~989 m north
        let offset = local_offset_meters(origin, 12.0, target, 30.0);

        assert!(offset.x.abs() < 1.0, "east component should be ~0");
        assert_relative_eq!(offset.y, 18.0);
        assert!(
            (offset.z + 989.0).abs() < 2.0,
            "north target must sit at negative z, got {}",
            offset.z
        );
    }

    #[test]
    fn test_offset_due_east() {
        let origin = GeoPoint::new(50.0, 0.0);
        let target = GeoPoint::new(50.0, 0.0159); // ~1137 m east at this latitude
        let offset = local_offset_meters(origin, 0.0, target, 0.0);

        assert!(
            (offset.x - 1137.0).abs() < 2.0,
            "east component should be ~1137, got {}",
            offset.x
        );
        assert!(offset.z.abs() < 1.0, "north component should be ~0");
    }

    #[test]
    fn test_normalize_deg() {
        assert_eq!(normalize_deg(0.0), 0.0);
        assert_eq!(normalize_deg(360.0), 0.0);
        assert_eq!(normalize_deg(-90.0), 270.0);
        assert_eq!(normalize_deg(719.5), 359.5);
    }

    #[test]
    fn test_wrap_signed_deg() {
        assert_eq!(wrap_signed_deg(180.0), 180.0);
        assert_eq!(wrap_signed_deg(180.5), -179.5);
        assert_eq!(wrap_signed_deg(-181.0), 179.0);
        assert_eq!(wrap_signed_deg(359.0), -1.0);
    }
}
