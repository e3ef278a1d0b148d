//! Frame pipeline driver integration tests.
//!
//! Frames come from an in-memory source, so no fixture files are needed.

mod common;

use std::sync::{Arc, Mutex};

use common::{ARMED_YUV, DARK_YUV, MemorySink, NEUTRAL_YUV, ScriptedSource, SyntheticFrame};
use cuesnap::{
    CancellationToken, CueSnapError, FrameOutcome, FramePipeline, PipelineConfig, PlanarFormat,
    ProgressCallback, ProgressReport, RunPhase, convert_frame,
};

const WIDTH: u32 = 32;
const HEIGHT: u32 = 16;
const SAMPLE_X: u32 = 20;
const SAMPLE_Y: u32 = 9;
const BASE: i64 = 1_700_000_000;

fn config<P: AsRef<std::path::Path>>(output: P) -> PipelineConfig {
    PipelineConfig::new(output)
        .with_sample_point(SAMPLE_X, SAMPLE_Y)
        .with_base_time_offset(BASE)
}

/// A neutral frame whose sample point shows `colour`.
fn cue_frame(colour: (u8, u8, u8)) -> SyntheticFrame {
    let mut frame = SyntheticFrame::uniform(WIDTH, HEIGHT, NEUTRAL_YUV, 6);
    frame.paint(SAMPLE_X, SAMPLE_Y, colour);
    frame
}

fn source(colours: &[(u8, u8, u8)]) -> ScriptedSource {
    ScriptedSource::new(colours.iter().map(|&colour| cue_frame(colour)).collect())
}

// ── End to end ─────────────────────────────────────────────────────

#[test]
fn armed_then_dark_writes_one_png() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let mut second = cue_frame(DARK_YUV);
    second.paint(2, 2, ARMED_YUV);
    let expected = convert_frame(&second.view());

    let mut source = ScriptedSource::new(vec![
        cue_frame(ARMED_YUV),
        second,
        cue_frame(NEUTRAL_YUV),
        cue_frame(NEUTRAL_YUV),
    ]);

    let mut pipeline = FramePipeline::new(config(temp_dir.path()).with_start_frame(1));
    let summary = pipeline.run(&mut source).expect("run should succeed");

    assert_eq!(summary.frames_processed, 4);
    assert_eq!(summary.transitions_detected, 1);
    assert_eq!(summary.snapshots_written, 1);
    assert_eq!(summary.failed_exports, 0);
    assert!(!summary.cancelled);
    assert_eq!(pipeline.phase(), RunPhase::Done);

    let expected_path = temp_dir.path().join(format!("{}.png", BASE + 2 / 60));
    assert_eq!(summary.written_paths, vec![expected_path.clone()]);

    let files: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect();
    assert_eq!(files, vec![expected_path.clone()]);

    let decoded = image::open(&expected_path).unwrap().to_rgb8();
    assert_eq!((decoded.width(), decoded.height()), (WIDTH, HEIGHT));
    assert_eq!(decoded.as_raw(), &expected.to_packed());
    assert_eq!(decoded.get_pixel(SAMPLE_X, SAMPLE_Y).0, [0, 0, 0]);
    assert_eq!(decoded.get_pixel(2, 2).0, [0, 255, 1]);
}

#[test]
fn no_edge_writes_nothing() {
    let mut source = source(&[DARK_YUV, DARK_YUV, ARMED_YUV, ARMED_YUV, NEUTRAL_YUV, DARK_YUV]);

    let mut pipeline = FramePipeline::with_sink(config("unused"), MemorySink::default());
    let summary = pipeline.run(&mut source).unwrap();

    assert_eq!(summary.frames_processed, 6);
    assert_eq!(summary.transitions_detected, 0);
    assert!(pipeline.sink().written.is_empty());
}

#[test]
fn timestamps_follow_frame_numbers() {
    let mut source = source(&[ARMED_YUV, DARK_YUV, ARMED_YUV, DARK_YUV])
        .with_numbers(vec![10, 125, 300, 301]);

    let mut pipeline = FramePipeline::with_sink(config("unused"), MemorySink::default());
    let summary = pipeline.run(&mut source).unwrap();

    assert_eq!(summary.snapshots_written, 2);
    let timestamps: Vec<i64> = pipeline.sink().written.iter().map(|(ts, _)| *ts).collect();
    assert_eq!(timestamps, vec![BASE + 2, BASE + 5]);
}

// ── Start gate ─────────────────────────────────────────────────────

#[test]
fn gated_transition_is_not_exported() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut source = source(&[ARMED_YUV, DARK_YUV, NEUTRAL_YUV]);

    let mut pipeline = FramePipeline::new(config(temp_dir.path()).with_start_frame(2));
    let summary = pipeline.run(&mut source).unwrap();

    assert_eq!(summary.transitions_detected, 1);
    assert_eq!(summary.gated_transitions, 1);
    assert_eq!(summary.snapshots_written, 0);
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn detector_tracks_history_during_gate() {
    // Frame 2 is armed inside the gate; frame 3 is dark just past it.
    let mut source = source(&[NEUTRAL_YUV, ARMED_YUV, DARK_YUV]);

    let mut pipeline =
        FramePipeline::with_sink(config("unused").with_start_frame(2), MemorySink::default());
    let summary = pipeline.run(&mut source).unwrap();

    assert_eq!(summary.gated_transitions, 0);
    assert_eq!(summary.snapshots_written, 1);
    assert_eq!(pipeline.sink().written[0].0, BASE);
}

#[test]
fn phase_moves_past_the_gate() {
    let armed = cue_frame(ARMED_YUV);
    let dark = cue_frame(DARK_YUV);

    let mut pipeline =
        FramePipeline::with_sink(config("unused").with_start_frame(2), MemorySink::default());
    assert_eq!(pipeline.phase(), RunPhase::BeforeStartGate);

    assert_eq!(
        pipeline.process_frame(1, &armed.view(), None).unwrap(),
        FrameOutcome::Idle
    );
    assert_eq!(
        pipeline.process_frame(2, &dark.view(), None).unwrap(),
        FrameOutcome::Gated
    );
    assert_eq!(pipeline.phase(), RunPhase::BeforeStartGate);

    assert_eq!(
        pipeline.process_frame(3, &armed.view(), None).unwrap(),
        FrameOutcome::Idle
    );
    assert_eq!(pipeline.phase(), RunPhase::Active);

    let outcome = pipeline.process_frame(4, &dark.view(), None).unwrap();
    assert!(matches!(outcome, FrameOutcome::Exported(_)));
    assert_eq!(pipeline.detector_state().previous.green, 0);
}

// ── Failures ───────────────────────────────────────────────────────

#[test]
fn write_failure_is_not_fatal() {
    let mut source = source(&[ARMED_YUV, DARK_YUV, ARMED_YUV, DARK_YUV, NEUTRAL_YUV]);
    let sink = MemorySink {
        fail: true,
        ..MemorySink::default()
    };

    let mut pipeline = FramePipeline::with_sink(config("unused"), sink);
    let summary = pipeline.run(&mut source).expect("export failures are absorbed");

    assert_eq!(summary.frames_processed, 5);
    assert_eq!(summary.transitions_detected, 2);
    assert_eq!(summary.failed_exports, 2);
    assert_eq!(summary.snapshots_written, 0);
    assert!(summary.written_paths.is_empty());
}

#[test]
fn missing_output_directory_is_not_fatal() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut source = source(&[ARMED_YUV, DARK_YUV]);

    let mut pipeline = FramePipeline::new(config(temp_dir.path().join("missing")));
    let summary = pipeline.run(&mut source).unwrap();

    assert_eq!(summary.failed_exports, 1);
}

#[test]
fn decode_error_aborts_the_run() {
    let mut source = source(&[ARMED_YUV, NEUTRAL_YUV, DARK_YUV]).failing_at(2);

    let mut pipeline = FramePipeline::with_sink(config("unused"), MemorySink::default());
    let result = pipeline.run(&mut source);

    assert!(matches!(result, Err(CueSnapError::VideoDecodeError(_))));
    assert_eq!(pipeline.summary().frames_processed, 2);
    assert_eq!(pipeline.phase(), RunPhase::Done);
}

#[test]
fn unsupported_format_fails_before_the_first_frame() {
    let mut source = source(&[ARMED_YUV, DARK_YUV]);
    source.info_mut().pixel_format = PlanarFormat::Other("nv12".to_string());

    let mut pipeline = FramePipeline::with_sink(config("unused"), MemorySink::default());
    let result = pipeline.run(&mut source);

    assert!(matches!(result, Err(CueSnapError::UnsupportedFormat(_))));
    assert_eq!(source.frames_served, 0);
}

#[test]
fn sample_point_outside_frame_fails_at_startup() {
    let mut source = source(&[ARMED_YUV]);

    let config = PipelineConfig::new("unused").with_sample_point(WIDTH, 0);
    let mut pipeline = FramePipeline::with_sink(config, MemorySink::default());

    match pipeline.run(&mut source) {
        Err(CueSnapError::SamplePointOutOfBounds { x, width, .. }) => {
            assert_eq!((x, width), (WIDTH, WIDTH));
        }
        other => panic!("Expected SamplePointOutOfBounds, got: {other:?}"),
    }
    assert_eq!(source.frames_served, 0);
}

#[test]
fn zero_frame_rate_is_rejected() {
    let mut source = source(&[ARMED_YUV]);
    let mut pipeline = FramePipeline::with_sink(
        config("unused").with_assumed_frame_rate(0),
        MemorySink::default(),
    );

    assert!(matches!(
        pipeline.run(&mut source),
        Err(CueSnapError::InvalidConfiguration(_))
    ));
}

// ── Progress and cancellation ──────────────────────────────────────

#[derive(Default)]
struct RecordingProgress {
    reports: Mutex<Vec<ProgressReport>>,
    finished: Mutex<u32>,
    cancel_on_first: Option<CancellationToken>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, report: &ProgressReport) {
        self.reports.lock().unwrap().push(report.clone());
        if let Some(token) = &self.cancel_on_first {
            token.cancel();
        }
    }

    fn on_finish(&self) {
        *self.finished.lock().unwrap() += 1;
    }
}

#[test]
fn progress_is_reported_from_the_first_frame() {
    let progress = Arc::new(RecordingProgress::default());
    let mut source = source(&[NEUTRAL_YUV, NEUTRAL_YUV, NEUTRAL_YUV]);

    let mut pipeline = FramePipeline::with_sink(
        config("unused")
            .with_start_frame(10)
            .with_progress(progress.clone()),
        MemorySink::default(),
    );
    pipeline.run(&mut source).unwrap();

    let reports = progress.reports.lock().unwrap();
    // All three frames land inside one second and inside the gate.
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].frame, 1);
    assert_eq!(reports[0].total, Some(3));
    assert_eq!(*progress.finished.lock().unwrap(), 1);
}

#[test]
fn total_frames_override_wins() {
    let progress = Arc::new(RecordingProgress::default());
    let mut source = source(&[NEUTRAL_YUV]);

    let mut pipeline = FramePipeline::with_sink(
        config("unused")
            .with_total_frames(Some(1_000))
            .with_progress(progress.clone()),
        MemorySink::default(),
    );
    pipeline.run(&mut source).unwrap();

    assert_eq!(progress.reports.lock().unwrap()[0].total, Some(1_000));
}

#[test]
fn cancelled_before_start_reads_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let mut source = source(&[ARMED_YUV, DARK_YUV]);

    let mut pipeline = FramePipeline::with_sink(
        config("unused").with_cancellation(token),
        MemorySink::default(),
    );
    let summary = pipeline.run(&mut source).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 0);
    assert_eq!(source.frames_served, 0);
    assert_eq!(pipeline.phase(), RunPhase::Done);
}

#[test]
fn cancellation_mid_run_stops_before_next_frame() {
    let token = CancellationToken::new();
    let progress = Arc::new(RecordingProgress {
        cancel_on_first: Some(token.clone()),
        ..RecordingProgress::default()
    });
    let mut source = source(&[ARMED_YUV, DARK_YUV, NEUTRAL_YUV]);

    let mut pipeline = FramePipeline::with_sink(
        config("unused")
            .with_progress(progress.clone())
            .with_cancellation(token),
        MemorySink::default(),
    );
    let summary = pipeline.run(&mut source).unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 1);
    assert_eq!(source.frames_served, 1);
    assert_eq!(*progress.finished.lock().unwrap(), 1);
}

#[test]
fn rerun_starts_from_fresh_state() {
    let mut pipeline = FramePipeline::with_sink(config("unused"), MemorySink::default());

    let mut first = source(&[ARMED_YUV]);
    pipeline.run(&mut first).unwrap();

    // A new run must not pair the previous run's armed frame with this dark one.
    let mut second = source(&[DARK_YUV]);
    let summary = pipeline.run(&mut second).unwrap();

    assert_eq!(summary.frames_processed, 1);
    assert_eq!(summary.transitions_detected, 0);
}
