//! Error types for the heading fusion and projection engine

use thiserror::Error;

/// Errors surfaced by the fusion pipeline and projection services.
///
/// None of these are fatal to the pipeline: a reading that produces an error
/// is dropped and the next reading is processed normally. Projection errors
/// signal "not yet placeable" conditions the caller retries once the missing
/// input arrives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FusionError {
    /// A legacy orientation event carried neither a compass heading nor a
    /// rotation angle.
    #[error("orientation event carries no heading field")]
    MissingHeadingField,

    /// No location fix has been delivered yet.
    #[error("no location fix received yet")]
    AwaitingLocationFix,

    /// No target has been selected yet.
    #[error("no target selected")]
    NoTargetSelected,

    /// Elevation for the named point has not been resolved yet, so a 3D
    /// placement cannot be computed.
    #[error("elevation not yet resolved for {0}")]
    ElevationPending(&'static str),

    /// The world anchor has not been captured yet (requires a location fix
    /// with resolved elevation).
    #[error("world anchor not yet captured")]
    AnchorPending,
}

/// Result type used throughout the crate.
pub type FusionResult<T> = Result<T, FusionError>;
