//! Run the full tracking pipeline against a synthetic camera and marker
//! decoder, printing the resolved transform as it stabilizes.
//!
//! ```sh
//! cargo run --example track_synthetic
//! ```

use std::sync::Arc;
use std::time::Duration;

use nalgebra::{Point2, Vector2};

use gridcam::track::{CaptureError, CaptureParams, FrameSource};
use gridcam::{
    ControlPoint, Frame, GridReference, Marker, MarkerDetector, PipelineParams, Quad,
    VideoPipeline,
};

struct SyntheticCamera;

impl FrameSource for SyntheticCamera {
    fn frame_size(&self) -> (usize, usize) {
        (320, 240)
    }

    fn capture_into(&mut self, _frame: &mut Frame) -> Result<(), CaptureError> {
        std::thread::sleep(Duration::from_millis(30)); // ~30 fps camera
        Ok(())
    }
}

/// Pretends the board drifted a few pixels from its calibration pose.
struct DriftedBoardDetector {
    quads: Vec<Quad>,
    drift: Vector2<f64>,
}

impl MarkerDetector for DriftedBoardDetector {
    fn detect(&self, _frame: &Frame) -> Vec<Marker> {
        self.quads
            .iter()
            .enumerate()
            .map(|(i, q)| Marker::new(q.map(|p| p + self.drift), format!("board/{i}")))
            .collect()
    }
}

fn quad_at(x: f64, y: f64) -> Quad {
    [
        Point2::new(x, y),
        Point2::new(x + 12.0, y),
        Point2::new(x + 12.0, y + 12.0),
        Point2::new(x, y + 12.0),
    ]
}

fn main() {
    gridcam::core::init_with_level(log::LevelFilter::Info).expect("logger");

    let quads = vec![
        quad_at(20.0, 20.0),
        quad_at(240.0, 20.0),
        quad_at(20.0, 180.0),
        quad_at(250.0, 190.0),
    ];
    let control_points = [(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)]
        .iter()
        .map(|&(x, y)| ControlPoint::new((x, y), (x + 60.0, y + 50.0)))
        .collect();
    let reference = GridReference::new(quads.clone(), control_points).expect("valid reference");

    let pipeline = VideoPipeline::spawn(
        Box::new(SyntheticCamera),
        Arc::new(DriftedBoardDetector {
            quads,
            drift: Vector2::new(4.0, -2.5),
        }),
        reference,
        PipelineParams {
            capture: CaptureParams {
                process_period: Duration::from_millis(200),
                ..CaptureParams::default()
            },
            ..PipelineParams::default()
        },
    );

    let mut last_seq = 0;
    for _ in 0..10 {
        let (jpeg, seq) = pipeline
            .latest_jpeg(last_seq + 1)
            .expect("encode latest frame");
        last_seq = seq;
        println!(
            "frame {seq}: {} bytes, transform: {}",
            jpeg.len(),
            pipeline.latest_transform_json()
        );
    }
}
