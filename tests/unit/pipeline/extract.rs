use super::*;
use crate::source::{SourceFrame, SourceInfo, memory::MemorySource};

fn grey(shade: u8, ms: f64) -> SourceFrame {
    SourceFrame::new(Frame::filled(6, 6, [shade, shade, shade, 255]).unwrap(), ms).unwrap()
}

fn plain_opts() -> ExtractOptions {
    ExtractOptions {
        remove_background: false,
        duplicate_threshold: 0.0,
        ..ExtractOptions::default()
    }
}

fn run(opts: ExtractOptions, frames: Vec<SourceFrame>) -> Extraction {
    let extractor = FrameExtractor::new(opts, &Capabilities::none()).unwrap();
    run_with(&extractor, frames)
}

fn run_with(extractor: &FrameExtractor, frames: Vec<SourceFrame>) -> Extraction {
    let mut source = MemorySource::new(frames).unwrap();
    extractor.extract(&mut source, &CancelToken::new()).unwrap()
}

struct ScriptedSource {
    info: SourceInfo,
    script: Vec<CastResult<Option<SourceFrame>>>,
}

impl ScriptedSource {
    fn new(mut script: Vec<CastResult<Option<SourceFrame>>>) -> Self {
        script.reverse();
        Self {
            info: SourceInfo {
                path: None,
                width: 6,
                height: 6,
                native_frame_rate: None,
                frame_count: None,
            },
            script,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    fn next_frame(&mut self) -> CastResult<Option<SourceFrame>> {
        self.script.pop().unwrap_or(Ok(None))
    }
}

#[test]
fn near_duplicate_is_dropped() {
    // 3/255 ~= 0.0118 < 0.02
    let opts = ExtractOptions {
        duplicate_threshold: 0.02,
        ..plain_opts()
    };
    let out = run(opts, vec![grey(100, 100.0), grey(103, 100.0)]);
    assert_eq!(out.frames.len(), 1);
    assert_eq!(out.stats.duplicates_skipped, 1);
    assert_eq!(out.stats.retained, 1);
}

#[test]
fn duplicate_baseline_only_moves_on_retained_frames() {
    let opts = ExtractOptions {
        duplicate_threshold: 0.02,
        ..plain_opts()
    };
    let out = run(
        opts,
        vec![grey(100, 50.0), grey(103, 50.0), grey(106, 50.0), grey(109, 50.0)],
    );
    let shades: Vec<u8> = out.frames.iter().map(|f| f.frame().as_rgba8()[0]).collect();
    assert_eq!(shades, [100, 106]);
    assert_eq!(out.stats.duplicates_skipped, 2);
    assert_eq!(out.stats.sampled, 4);
}

#[test]
fn zero_threshold_disables_elision() {
    let out = run(plain_opts(), vec![grey(100, 10.0), grey(100, 10.0), grey(100, 10.0)]);
    assert_eq!(out.frames.len(), 3);
    assert_eq!(out.stats.duplicates_skipped, 0);
}

#[test]
fn target_rate_sets_interval_and_duration() {
    // native 10 fps, target 5 fps -> every 2nd frame, 200 ms each
    let opts = ExtractOptions {
        target_frame_rate: Some(5.0),
        ..plain_opts()
    };
    let frames = (0..6u8).map(|i| grey(i * 40, 100.0)).collect();
    let out = run(opts, frames);
    let shades: Vec<u8> = out.frames.iter().map(|f| f.frame().as_rgba8()[0]).collect();
    assert_eq!(shades, [0, 80, 160]);
    assert!(out.frames.iter().all(|f| f.duration_ms() == 200.0));
    assert_eq!(out.stats.source_frames, 6);
    assert_eq!(out.stats.sampled, 3);
}

#[test]
fn stride_without_target_keeps_native_duration() {
    let opts = ExtractOptions {
        frame_skip_stride: 3,
        ..plain_opts()
    };
    let frames = (0..7u8).map(|i| grey(i * 30, 40.0)).collect();
    let out = run(opts, frames);
    let shades: Vec<u8> = out.frames.iter().map(|f| f.frame().as_rgba8()[0]).collect();
    assert_eq!(shades, [0, 90, 180]);
    assert!(out.frames.iter().all(|f| f.duration_ms() == 40.0));
}

#[test]
fn removal_then_resize_is_applied() {
    let opts = ExtractOptions {
        remove_background: true,
        max_dimension: 8,
        duplicate_threshold: 0.0,
        ..ExtractOptions::default()
    };
    let frame = SourceFrame::new(Frame::filled(20, 10, [0, 0, 0, 255]).unwrap(), 100.0).unwrap();
    let out = run(opts, vec![frame]);
    let f = out.frames[0].frame();
    assert_eq!(f.dimensions(), (8, 4));
    assert!(f.as_rgba8().chunks_exact(4).all(|px| px[3] == 0));
}

#[test]
fn sampling_interval_rounds_rate_ratio() {
    assert_eq!(sampling_interval(Some(30.0), Some(15.0), 1), 2);
    assert_eq!(sampling_interval(Some(30.0), Some(12.0), 1), 3);
    assert_eq!(sampling_interval(Some(10.0), Some(30.0), 1), 1);
    assert_eq!(sampling_interval(Some(30.0), Some(15.0), 2), 4);
    assert_eq!(sampling_interval(None, Some(15.0), 2), 2);
    assert_eq!(sampling_interval(Some(30.0), None, 1), 1);
}

#[test]
fn cancelled_token_aborts_before_reading() {
    let extractor = FrameExtractor::new(plain_opts(), &Capabilities::none()).unwrap();
    let mut source = MemorySource::new(vec![grey(1, 10.0)]).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = extractor.extract(&mut source, &cancel).unwrap_err();
    assert!(matches!(err, CastError::Cancelled(_)));
}

#[test]
fn empty_source_yields_empty_extraction() {
    let extractor = FrameExtractor::new(plain_opts(), &Capabilities::none()).unwrap();
    let mut source = ScriptedSource::new(Vec::new());
    let out = extractor.extract(&mut source, &CancelToken::new()).unwrap();
    assert!(out.frames.is_empty());
    assert_eq!(out.stats, ExtractStats::default());
}

#[test]
fn decode_failure_fails_fast_with_frame_index() {
    let extractor = FrameExtractor::new(plain_opts(), &Capabilities::none()).unwrap();
    let mut source = ScriptedSource::new(vec![
        Ok(Some(grey(10, 10.0))),
        Err(CastError::source_unavailable("stream truncated")),
        Ok(Some(grey(20, 10.0))),
    ]);
    let err = extractor.extract(&mut source, &CancelToken::new()).unwrap_err();
    assert!(matches!(err.root(), CastError::SourceUnavailable(_)));
    assert!(err.to_string().starts_with("decode failed at frame 1"));
}

#[test]
fn model_request_without_model_falls_back_to_threshold() {
    let opts = ExtractOptions {
        removal_strategy: RemovalStrategy::Model,
        ..ExtractOptions::default()
    };
    let extractor = FrameExtractor::new(opts, &Capabilities::none()).unwrap();
    assert_eq!(extractor.remover_name(), Some("threshold"));

    let off = FrameExtractor::new(plain_opts(), &Capabilities::none()).unwrap();
    assert_eq!(off.remover_name(), None);
}

#[cfg(unix)]
#[test]
fn available_model_is_used_for_every_frame() {
    let opts = ExtractOptions {
        removal_strategy: RemovalStrategy::Model,
        model: ModelRemoverConfig {
            command: "cat".to_string(),
            args: vec![],
        },
        duplicate_threshold: 0.0,
        ..ExtractOptions::default()
    };
    let caps = Capabilities {
        model_remover: true,
        ..Capabilities::none()
    };
    let extractor = FrameExtractor::new(opts, &caps).unwrap();
    assert_eq!(extractor.remover_name(), Some("model"));

    // The echoing model leaves pixels alone where the threshold remover would clear them.
    let out = run_with(&extractor, vec![grey(0, 100.0), grey(10, 100.0)]);
    assert_eq!(out.frames.len(), 2);
    assert!(
        out.frames
            .iter()
            .all(|f| f.frame().as_rgba8().chunks_exact(4).all(|px| px[3] == 255))
    );
}

#[test]
fn invalid_options_are_rejected() {
    let cases = [
        ExtractOptions {
            max_dimension: 0,
            ..ExtractOptions::default()
        },
        ExtractOptions {
            frame_skip_stride: 0,
            ..ExtractOptions::default()
        },
        ExtractOptions {
            duplicate_threshold: 1.5,
            ..ExtractOptions::default()
        },
        ExtractOptions {
            target_frame_rate: Some(0.0),
            ..ExtractOptions::default()
        },
        ExtractOptions {
            target_frame_rate: Some(f64::NAN),
            ..ExtractOptions::default()
        },
    ];
    for opts in cases {
        assert!(matches!(
            FrameExtractor::new(opts, &Capabilities::none()),
            Err(CastError::Validation(_))
        ));
    }
}

#[test]
fn options_deserialize_with_defaults() {
    let opts: ExtractOptions =
        serde_json::from_str(r#"{ "max_dimension": 128, "removal_strategy": "none" }"#).unwrap();
    assert_eq!(opts.max_dimension, 128);
    assert_eq!(opts.removal_strategy, RemovalStrategy::None);
    assert_eq!(opts.duplicate_threshold, 0.02);
    assert!(opts.remove_background);
}
