//! Heading fusion and geospatial projection for AR target pointing
//!
//! This library is the sensor-side core of a "find the target" augmented
//! reality experience: the user picks a geographic point, and a renderer
//! overlays a marker on the live camera feed pointing toward it. Everything
//! rendering-related (map widget, 3D scene, camera feed) stays outside; this
//! crate turns raw, noisy, heterogeneous orientation readings into one
//! smoothed true-north heading plus pitch, and turns coordinate pairs into
//! the local 3D placement vectors the renderer consumes.
//!
//! # Features
//!
//! - Source selection between absolute-orientation quaternions and legacy
//!   compass events, with permanent fallback on sensor error
//! - Wrap-safe heading smoothing through per-component scalar filters on the
//!   unit circle
//! - Magnetic declination handling with explicit magnetic/true labeling
//!   while the lookup is pending
//! - Great-circle distance, initial bearing, and camera-frame 3D offsets
//!   (east = +x, up = +y, north = -z)
//! - World-anchored target placement that keeps GPS jitter out of the target
//!   position
//!
//! Capability absence (no sensor, no filter, no declination service) is
//! modeled as data and degrades the output; it never aborts the pipeline.
//!
//! # Quick Start
//!
//! ```rust
//! use fusion_compass::{FusionSession, FusionSettings, SourceProbe};
//!
//! let mut session = FusionSession::new(FusionSettings::default());
//!
//! // The hosting shell probes the platform once and reports what exists.
//! session.start(SourceProbe {
//!     absolute_orientation: true,
//!     ..Default::default()
//! });
//!
//! // Wire the platform callbacks through the session.
//! session.on_location_fix(50.0, 0.0);
//! session.resolve_user_elevation(Some(12.0));
//! session.select_target(50.0089, 0.0);
//! session.resolve_target_elevation(Some(12.0));
//! session.on_quaternion_reading([0.0, 0.0, 0.0, 1.0], 0.0);
//!
//! let sample = session.current_sample().unwrap();
//! let diagnostics = session.diagnostics().unwrap();
//! println!(
//!     "heading {:.1} deg, target {:.0} m away, in view: {}",
//!     sample.heading_deg, diagnostics.distance_m, diagnostics.in_view
//! );
//! ```

mod error;
mod filter;
mod fusion;
pub mod geodesy;
pub mod orientation;
pub mod projection;
mod session;
mod types;

// Re-export all public types and functions
pub use error::{FusionError, FusionResult};
pub use filter::{CircularFilter, ScalarKalman};
pub use fusion::{FusionState, HeadingFusion, LegacyBinding, SourceProbe};
pub use projection::{
    AnchoredScene, IN_VIEW_THRESHOLD_DEG, TargetDiagnostics, TargetTracker, angle_to_target,
    in_view, project_target,
};
pub use session::FusionSession;
pub use types::*;
