//! Calibration reference: marker quads and control points recorded from a
//! reference image of the board, plus the cached grid→reference homography.

use std::fs;
use std::path::Path;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::homography::{estimate_homography, Homography};
use crate::marker::Quad;

/// Minimum control points needed for a non-degenerate grid→reference solve.
pub const MIN_CONTROL_POINTS: usize = 4;

/// An immutable (grid coordinate, reference-image pixel) pair captured at
/// calibration time.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub grid: Point2<f64>,
    pub image: Point2<f64>,
}

impl ControlPoint {
    pub fn new(grid: (f64, f64), image: (f64, f64)) -> Self {
        Self {
            grid: Point2::new(grid.0, grid.1),
            image: Point2::new(image.0, image.1),
        }
    }
}

/// Errors raised while building or loading a [`GridReference`].
///
/// All of these are fatal at startup: a reference that fails validation is
/// rejected before the tracking pipeline starts.
#[derive(thiserror::Error, Debug)]
pub enum ReferenceError {
    #[error("reference needs at least {MIN_CONTROL_POINTS} control points, got {got}")]
    TooFewControlPoints { got: usize },
    #[error("reference contains no marker quads")]
    NoMarkers,
    #[error("control points are degenerate (collinear or near-singular)")]
    DegenerateControlPoints,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Persisted calibration format, produced by the calibration capture tool
/// and consumed here at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct ReferenceFile {
    markers: Vec<Quad>,
    control_points: Vec<ControlPoint>,
}

/// Marker quads and control points from a reference image of the board.
///
/// The marker quads are stored in a fixed canonical order; detected sets
/// are permuted into this order by the correspondence matcher. Both the
/// quads and the control points describe a single physical board pose in
/// the same grid coordinate system.
///
/// Construction validates the control-point set and caches the
/// grid→reference homography, so per-frame resolution only has to solve
/// the reference→current half.
#[derive(Clone, Debug)]
pub struct GridReference {
    markers: Vec<Quad>,
    control_points: Vec<ControlPoint>,
    grid_to_reference: Homography,
}

impl GridReference {
    pub fn new(
        markers: Vec<Quad>,
        control_points: Vec<ControlPoint>,
    ) -> Result<Self, ReferenceError> {
        if markers.is_empty() {
            return Err(ReferenceError::NoMarkers);
        }
        if control_points.len() < MIN_CONTROL_POINTS {
            return Err(ReferenceError::TooFewControlPoints {
                got: control_points.len(),
            });
        }

        let grid: Vec<Point2<f64>> = control_points.iter().map(|cp| cp.grid).collect();
        let image: Vec<Point2<f64>> = control_points.iter().map(|cp| cp.image).collect();
        let grid_to_reference =
            estimate_homography(&grid, &image).ok_or(ReferenceError::DegenerateControlPoints)?;

        Ok(Self {
            markers,
            control_points,
            grid_to_reference,
        })
    }

    /// Marker quads in canonical order.
    pub fn markers(&self) -> &[Quad] {
        &self.markers
    }

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    /// The cached homography from grid coordinates to reference-image
    /// pixels.
    pub fn grid_to_reference(&self) -> &Homography {
        &self.grid_to_reference
    }

    /// Parse and validate a reference from its persisted JSON form.
    pub fn from_json_str(raw: &str) -> Result<Self, ReferenceError> {
        let file: ReferenceFile = serde_json::from_str(raw)?;
        Self::new(file.markers, file.control_points)
    }

    /// Load a reference from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ReferenceError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Serialize back to the persisted JSON form.
    pub fn to_json_string(&self) -> Result<String, ReferenceError> {
        let file = ReferenceFile {
            markers: self.markers.clone(),
            control_points: self.control_points.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the persisted JSON form to disk.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ReferenceError> {
        fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}
