//! End-to-end pipeline test against a synthetic camera and decoder: the
//! current frame shows the reference board under a pure translation, so
//! the resolved transform has a closed-form expectation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use nalgebra::{Point2, Vector2};

use gridcam::track::{CaptureError, CaptureParams, FrameSource};
use gridcam::{
    ControlPoint, Frame, GridReference, Marker, MarkerDetector, PipelineParams, Quad,
    VideoPipeline,
};

fn quad_at(x: f64, y: f64) -> Quad {
    [
        Point2::new(x, y),
        Point2::new(x + 12.0, y),
        Point2::new(x + 12.0, y + 12.0),
        Point2::new(x, y + 12.0),
    ]
}

fn board_quads() -> Vec<Quad> {
    vec![
        quad_at(0.0, 0.0),
        quad_at(200.0, 0.0),
        quad_at(0.0, 150.0),
        quad_at(220.0, 160.0),
        quad_at(80.0, 90.0),
    ]
}

/// Grid (x, y) sits at reference pixel (x + 40, y + 60).
fn reference() -> GridReference {
    let control_points = [(0.0, 0.0), (100.0, 0.0), (100.0, 80.0), (0.0, 80.0)]
        .iter()
        .map(|&(x, y)| ControlPoint::new((x, y), (x + 40.0, y + 60.0)))
        .collect();
    GridReference::new(board_quads(), control_points).expect("valid reference")
}

struct SyntheticCamera {
    counter: u8,
}

impl FrameSource for SyntheticCamera {
    fn frame_size(&self) -> (usize, usize) {
        (64, 48)
    }

    fn capture_into(&mut self, frame: &mut Frame) -> Result<(), CaptureError> {
        frame.data.fill(self.counter);
        self.counter = self.counter.wrapping_add(1);
        Ok(())
    }
}

/// Reports the board shifted by a fixed offset, in shuffled order,
/// regardless of frame contents.
struct ShiftedBoardDetector {
    shift: Vector2<f64>,
}

impl MarkerDetector for ShiftedBoardDetector {
    fn detect(&self, _frame: &Frame) -> Vec<Marker> {
        let quads = board_quads();
        [3usize, 0, 4, 1, 2]
            .iter()
            .map(|&i| Marker::new(quads[i].map(|p| p + self.shift), format!("board/{i}")))
            .collect()
    }
}

fn wait_for_transform(pipeline: &VideoPipeline) -> gridcam::Homography {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(t) = pipeline.latest_transform() {
            return t;
        }
        assert!(Instant::now() < deadline, "no transform within deadline");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn tracks_a_translated_board() {
    let shift = Vector2::new(25.0, -10.0);
    let pipeline = VideoPipeline::spawn(
        Box::new(SyntheticCamera { counter: 0 }),
        Arc::new(ShiftedBoardDetector { shift }),
        reference(),
        PipelineParams {
            capture: CaptureParams {
                process_period: Duration::ZERO,
                ..CaptureParams::default()
            },
            ..PipelineParams::default()
        },
    );

    let transform = wait_for_transform(&pipeline);

    // grid (10, 20) -> reference pixel (50, 80) -> current (75, 70)
    let p = transform.apply(Point2::new(10.0, 20.0));
    assert!((p.x - 75.0).abs() < 1e-6, "x was {}", p.x);
    assert!((p.y - 70.0).abs() < 1e-6, "y was {}", p.y);

    let markers = pipeline.latest_markers();
    assert_eq!(markers.len(), 5);

    let json = pipeline.latest_transform_json();
    assert_eq!(json.as_array().map(Vec::len), Some(3));

    assert!(pipeline.capture_error().is_none());
}

#[test]
fn streams_fresh_jpeg_frames() {
    let pipeline = VideoPipeline::spawn(
        Box::new(SyntheticCamera { counter: 0 }),
        Arc::new(ShiftedBoardDetector {
            shift: Vector2::zeros(),
        }),
        reference(),
        PipelineParams::default(),
    );

    let (first, first_seq) = pipeline.latest_jpeg(1).expect("encode");
    assert_eq!(&first[..2], &[0xFF, 0xD8], "JPEG SOI marker");

    let (_, second_seq) = pipeline.latest_jpeg(first_seq + 1).expect("encode");
    assert!(second_seq > first_seq, "long-poll must advance the sequence");
}
