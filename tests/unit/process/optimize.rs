use super::*;

#[test]
fn frames_within_bound_are_untouched() {
    let f = Frame::filled(100, 40, [1, 2, 3, 4]).unwrap();
    let out = optimize_frame(f.clone(), 100).unwrap();
    assert_eq!(out, f);
}

#[test]
fn landscape_is_bounded_by_width() {
    let f = Frame::filled(1000, 500, [10, 20, 30, 255]).unwrap();
    let out = optimize_frame(f, 512).unwrap();
    assert_eq!(out.dimensions(), (512, 256));
}

#[test]
fn portrait_is_bounded_by_height() {
    let f = Frame::filled(300, 901, [10, 20, 30, 255]).unwrap();
    let out = optimize_frame(f, 256).unwrap();
    assert_eq!(out.height(), 256);
    assert_eq!(out.width(), 85);
}

#[test]
fn extreme_aspect_keeps_one_pixel() {
    assert_eq!(scaled_dimensions(4000, 1, 64), (64, 1));
}

#[test]
fn bound_holds_across_sizes() {
    for (w, h) in [(513, 512), (7, 2000), (2000, 7), (640, 480), (33, 33)] {
        for max in [1, 16, 32, 500] {
            let (nw, nh) = scaled_dimensions(w, h, max);
            assert!(nw.max(nh) <= max, "{w}x{h} -> {nw}x{nh} @ {max}");
            assert!(nw >= 1 && nh >= 1);
        }
    }
}

#[test]
fn zero_bound_is_rejected() {
    let f = Frame::filled(2, 2, [0, 0, 0, 0]).unwrap();
    assert!(matches!(
        optimize_frame(f, 0),
        Err(CastError::Validation(_))
    ));
}
