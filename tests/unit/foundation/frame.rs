use super::*;

#[test]
fn new_rejects_zero_size_and_bad_len() {
    assert!(matches!(
        Frame::new(0, 4, vec![]),
        Err(CastError::InvalidInput(_))
    ));
    assert!(matches!(
        Frame::new(2, 2, vec![0; 15]),
        Err(CastError::InvalidInput(_))
    ));
    assert!(Frame::new(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn filled_sets_every_pixel() {
    let f = Frame::filled(3, 2, [1, 2, 3, 4]).unwrap();
    assert_eq!(f.dimensions(), (3, 2));
    assert_eq!(f.pixel(2, 1), Some([1, 2, 3, 4]));
    assert_eq!(f.pixel(3, 0), None);
}

#[test]
fn image_roundtrip_keeps_pixels() {
    let mut img = image::RgbaImage::new(2, 1);
    img.put_pixel(1, 0, image::Rgba([9, 8, 7, 6]));
    let f = Frame::from_rgba_image(img.clone()).unwrap();
    assert_eq!(f.pixel(1, 0), Some([9, 8, 7, 6]));
    assert_eq!(f.to_rgba_image().unwrap(), img);
}

#[test]
fn timed_frame_rejects_non_positive_duration() {
    let f = Frame::filled(1, 1, [0, 0, 0, 255]).unwrap();
    assert!(TimedFrame::new(f.clone(), 0.0).is_err());
    assert!(TimedFrame::new(f.clone(), f64::NAN).is_err());
    let timed = TimedFrame::new(f.clone(), 100.0).unwrap();
    assert_eq!(timed.duration_ms(), 100.0);
    assert_eq!(timed.frame(), &f);
}
