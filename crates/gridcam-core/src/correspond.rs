//! Correspondence matching between the reference marker set and a freshly
//! detected marker set, under unknown permutation and in-plane rotation.

use nalgebra::Vector2;

use crate::marker::Quad;

/// Hard cap on the marker count accepted by [`match_markers`].
///
/// The search below enumerates every permutation of the detected set, so
/// cost grows factorially; 8 markers is 40320 candidate orderings, which
/// is still cheap, and real boards carry far fewer.
pub const MAX_MARKERS: usize = 8;

/// A permutation of the detected set aligned to the reference order.
///
/// `permutation[i]` is the index into the detected set that corresponds to
/// reference marker `i`. `error` is the sum of squared displacement
/// residuals of the winning permutation.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerMatch {
    pub permutation: Vec<usize>,
    pub error: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum MatchError {
    #[error("cannot match an empty marker set")]
    Empty,
    #[error("found {found} markers, needed {expected}")]
    CountMismatch { found: usize, expected: usize },
    #[error("marker count {count} exceeds the permutation-search limit of {MAX_MARKERS}")]
    TooManyMarkers { count: usize },
    #[error("marker orientation basis is degenerate")]
    DegenerateBasis,
}

/// Local coordinate basis shared by all markers in one image: the X axis
/// is the average first-edge vector across markers, scaled by its own
/// component mean; the Y axis swaps the components.
///
/// This assumes all markers are mounted with a consistent edge
/// orientation. A board violating that precondition produces an
/// unpredictable basis; it is not detected here.
fn edge_basis(quads: &[Quad]) -> Option<(Vector2<f64>, Vector2<f64>)> {
    let mut ux = Vector2::zeros();
    for q in quads {
        ux += q[1] - q[0];
    }
    let mean = (ux.x + ux.y) / 2.0;
    if mean.abs() < 1e-9 {
        return None;
    }
    let ux = ux / mean;
    let uy = Vector2::new(ux.y, ux.x);
    Some((ux, uy))
}

/// Anchor corner of every quad projected into the image's edge basis.
/// Displacements between any two markers are differences of these.
fn projected_anchors(quads: &[Quad], ux: Vector2<f64>, uy: Vector2<f64>) -> Vec<Vector2<f64>> {
    quads
        .iter()
        .map(|q| {
            let c = q[0].coords;
            Vector2::new(ux.dot(&c), uy.dot(&c))
        })
        .collect()
}

fn search(
    depth: usize,
    det_proj: &[Vector2<f64>],
    ref_disp: &[Vector2<f64>],
    used: &mut [bool],
    current: &mut Vec<usize>,
    best: &mut Option<(f64, Vec<usize>)>,
) {
    let n = det_proj.len();
    if depth == n {
        let anchor = det_proj[current[0]];
        let mut err = 0.0;
        for (slot, &idx) in current.iter().enumerate().skip(1) {
            let d = det_proj[idx] - anchor;
            err += (d - ref_disp[slot - 1]).norm_squared();
        }
        // strict `<`: the first permutation reaching the minimum wins on
        // exact ties (enumeration is lexicographic)
        let take = match best {
            None => true,
            Some((best_err, _)) => err < *best_err,
        };
        if take {
            *best = Some((err, current.clone()));
        }
        return;
    }

    for idx in 0..n {
        if used[idx] {
            continue;
        }
        used[idx] = true;
        current.push(idx);
        search(depth + 1, det_proj, ref_disp, used, current, best);
        current.pop();
        used[idx] = false;
    }
}

/// Align `detected` marker quads to the canonical `reference` order.
///
/// Both sets are reduced to displacement vectors (anchor corner of each
/// marker relative to the first marker) expressed in a per-image edge
/// basis, and every permutation of the detected set is scored against the
/// reference displacements by sum of squared differences. The counts must
/// already agree; callers that want a cheap count check before paying for
/// the search should compare lengths first (see `locate_grid`).
pub fn match_markers(reference: &[Quad], detected: &[Quad]) -> Result<MarkerMatch, MatchError> {
    let expected = reference.len();
    let found = detected.len();
    if expected == 0 || found == 0 {
        return Err(MatchError::Empty);
    }
    if found != expected {
        return Err(MatchError::CountMismatch { found, expected });
    }
    if expected > MAX_MARKERS {
        return Err(MatchError::TooManyMarkers { count: expected });
    }

    let (ref_ux, ref_uy) = edge_basis(reference).ok_or(MatchError::DegenerateBasis)?;
    let (det_ux, det_uy) = edge_basis(detected).ok_or(MatchError::DegenerateBasis)?;

    let ref_proj = projected_anchors(reference, ref_ux, ref_uy);
    let det_proj = projected_anchors(detected, det_ux, det_uy);
    let ref_disp: Vec<Vector2<f64>> = ref_proj[1..].iter().map(|p| p - ref_proj[0]).collect();

    let mut used = vec![false; found];
    let mut current = Vec::with_capacity(found);
    let mut best = None;
    search(0, &det_proj, &ref_disp, &mut used, &mut current, &mut best);

    let (error, permutation) = best.expect("non-empty set always yields a permutation");
    Ok(MarkerMatch { permutation, error })
}
