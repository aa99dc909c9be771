//! Per-frame grid location: align detected markers to the reference and
//! compose the grid→current-frame homography.

use nalgebra::Point2;

use crate::correspond::{match_markers, MatchError};
use crate::homography::{estimate_homography, Homography};
use crate::marker::{Marker, Quad};
use crate::reference::GridReference;

/// Per-cycle location failures.
///
/// These are recoverable: the async locator absorbs them into its
/// hysteresis counter and they never terminate the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum LocateError {
    #[error("found {found} markers, needed {expected}")]
    CountMismatch { found: usize, expected: usize },
    #[error("homography solve failed on a degenerate point configuration")]
    DegenerateHomography,
    #[error(transparent)]
    Match(#[from] MatchError),
}

/// Resolve the homography mapping grid coordinates to pixel coordinates of
/// the frame the markers were detected in.
///
/// The detected count must equal the reference count; a mismatch is
/// reported immediately, before any correspondence search runs. On
/// success the result is `(reference→current) ∘ (grid→reference)`, the
/// latter cached inside the reference.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(reference, detected), fields(markers = detected.len()))
)]
pub fn locate_grid(reference: &GridReference, detected: &[Marker]) -> Result<Homography, LocateError> {
    let expected = reference.markers().len();
    if detected.len() != expected {
        return Err(LocateError::CountMismatch {
            found: detected.len(),
            expected,
        });
    }

    let quads: Vec<Quad> = detected.iter().map(|m| m.corners).collect();
    let matched = match_markers(reference.markers(), &quads)?;

    // Flattened corner lists in canonical order; 4 points per marker.
    let mut src: Vec<Point2<f64>> = Vec::with_capacity(expected * 4);
    let mut dst: Vec<Point2<f64>> = Vec::with_capacity(expected * 4);
    for (slot, &det_idx) in matched.permutation.iter().enumerate() {
        src.extend_from_slice(&reference.markers()[slot]);
        dst.extend_from_slice(&quads[det_idx]);
    }

    let reference_to_current =
        estimate_homography(&src, &dst).ok_or(LocateError::DegenerateHomography)?;

    Ok(reference_to_current.compose(reference.grid_to_reference()))
}
