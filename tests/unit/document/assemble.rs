use super::*;
use crate::foundation::frame::Frame;

fn timed(w: u32, h: u32, ms: f64, shade: u8) -> TimedFrame {
    TimedFrame::new(Frame::filled(w, h, [shade, 0, 0, 255]).unwrap(), ms).unwrap()
}

fn png_opts() -> AssembleOptions {
    AssembleOptions {
        format: StillFormat::Png,
        ..AssembleOptions::default()
    }
}

#[test]
fn three_frames_of_100ms_give_10fps_unit_spans() {
    let frames = vec![timed(4, 4, 100.0, 1), timed(4, 4, 100.0, 2), timed(4, 4, 100.0, 3)];
    let doc = assemble(&frames, &png_opts(), &CancelToken::new()).unwrap();

    assert_eq!(doc.frame_rate, 10);
    assert_eq!(doc.in_tick, 0.0);
    assert!((doc.out_tick - 3.0).abs() < 1e-9);
    assert_eq!(doc.assets.len(), 3);
    assert_eq!(doc.layers.len(), 3);
    for (i, layer) in doc.layers.iter().enumerate() {
        assert!((layer.start_tick - i as f64).abs() < 1e-9);
        assert!((layer.end_tick - (i + 1) as f64).abs() < 1e-9);
        assert_eq!(layer.asset_ref.as_deref(), Some(format!("image_{i}").as_str()));
        let keys = layer.transform.opacity.keyframes().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].start, vec![100.0]);
        assert_eq!(keys[1].start, vec![0.0]);
        assert_eq!(keys[0].tick, layer.start_tick);
        assert_eq!(keys[1].tick, layer.end_tick);
    }
}

#[test]
fn last_layer_ends_at_total_duration() {
    let frames: Vec<_> = [33.0, 70.0, 41.5, 100.0, 12.25]
        .iter()
        .map(|ms| timed(3, 2, *ms, 9))
        .collect();
    let doc = assemble(&frames, &png_opts(), &CancelToken::new()).unwrap();
    assert_eq!(doc.layers[0].start_tick, 0.0);
    let last = doc.layers.last().unwrap();
    assert!((last.end_tick - doc.out_tick).abs() < 1e-9);
    for pair in doc.layers.windows(2) {
        assert!(pair[0].start_tick <= pair[1].start_tick);
        assert!(pair[0].end_tick >= pair[0].start_tick);
    }
}

#[test]
fn empty_input_is_rejected() {
    let err = assemble(&[], &png_opts(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, CastError::EmptyInput(_)));
}

#[test]
fn mismatched_sizes_are_invalid_input_with_frame_context() {
    let frames = vec![timed(4, 4, 100.0, 1), timed(5, 4, 100.0, 2)];
    let err = assemble(&frames, &png_opts(), &CancelToken::new()).unwrap_err();
    assert!(matches!(err.root(), CastError::InvalidInput(_)));
    assert!(err.to_string().contains("frame 1"));
}

#[test]
fn derived_frame_rate_is_clamped() {
    assert_eq!(derive_frame_rate(3, 300.0), 10);
    assert_eq!(derive_frame_rate(2, 10_000.0), 10);
    assert_eq!(derive_frame_rate(100, 100.0), 60);
    assert_eq!(derive_frame_rate(30, 1000.0), 30);
    assert_eq!(derive_frame_rate(0, 0.0), 10);
}

#[test]
fn explicit_frame_rate_overrides_derivation() {
    let frames = vec![timed(2, 2, 100.0, 1), timed(2, 2, 100.0, 2)];
    let opts = AssembleOptions {
        frame_rate: Some(30),
        ..png_opts()
    };
    let doc = assemble(&frames, &opts, &CancelToken::new()).unwrap();
    assert_eq!(doc.frame_rate, 30);
    assert!((doc.layers[1].start_tick - 3.0).abs() < 1e-9);
    assert!((doc.out_tick - 6.0).abs() < 1e-9);
}

#[test]
fn out_of_range_override_is_rejected() {
    let frames = vec![timed(2, 2, 100.0, 1)];
    for fr in [0, 241] {
        let opts = AssembleOptions {
            frame_rate: Some(fr),
            ..png_opts()
        };
        assert!(matches!(
            assemble(&frames, &opts, &CancelToken::new()),
            Err(CastError::Validation(_))
        ));
    }
}

#[test]
fn parallel_encoding_keeps_frame_order() {
    let frames: Vec<_> = (0..8u8).map(|i| timed(3, 3, 50.0, i * 20)).collect();
    let sequential = assemble(&frames, &png_opts(), &CancelToken::new()).unwrap();
    let opts = AssembleOptions {
        threading: EncodeThreading {
            parallel: true,
            threads: Some(3),
        },
        ..png_opts()
    };
    let parallel = assemble(&frames, &opts, &CancelToken::new()).unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn cancelled_token_stops_assembly() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = assemble(&[timed(2, 2, 100.0, 1)], &png_opts(), &cancel).unwrap_err();
    assert!(matches!(err, CastError::Cancelled(_)));
}

#[test]
fn assets_embed_decodable_payloads() {
    let doc = assemble(&[timed(4, 2, 100.0, 200)], &png_opts(), &CancelToken::new()).unwrap();
    let (mime, bytes) = crate::encode::still::parse_data_uri(&doc.assets[0].payload).unwrap();
    assert_eq!(mime, "image/png");
    let img = image::load_from_memory(&bytes).unwrap().into_rgba8();
    assert_eq!(img.dimensions(), (4, 2));
    assert_eq!(img.get_pixel(0, 0).0, [200, 0, 0, 255]);
}
