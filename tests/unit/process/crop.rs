use super::*;

#[test]
fn landscape_is_cropped_to_centred_square() {
    let mut img = image::RgbaImage::from_pixel(30, 10, image::Rgba([0, 0, 255, 255]));
    for y in 0..10 {
        for x in 10..20 {
            img.put_pixel(x, y, image::Rgba([255, 0, 0, 255]));
        }
    }
    let out = circular_crop(Frame::from_rgba_image(img).unwrap(), None).unwrap();
    assert_eq!(out.dimensions(), (10, 10));
    assert_eq!(out.pixel(5, 5), Some([255, 0, 0, 255]));
    assert_eq!(out.pixel(5, 0), Some([255, 0, 0, 255]));
}

#[test]
fn corners_are_cleared_and_centre_kept() {
    let out = circular_crop(Frame::filled(20, 20, [9, 9, 9, 255]).unwrap(), None).unwrap();
    for (x, y) in [(0, 0), (19, 0), (0, 19), (19, 19), (1, 2)] {
        assert_eq!(out.pixel(x, y).unwrap()[3], 0, "({x}, {y})");
    }
    assert_eq!(out.pixel(10, 10), Some([9, 9, 9, 255]));
    assert_eq!(out.pixel(0, 10), Some([9, 9, 9, 255]));
}

#[test]
fn ring_paints_the_outer_band_only() {
    let ring = Ring {
        width: 3,
        rgba: [255, 215, 0, 255],
    };
    let out = circular_crop(Frame::filled(40, 40, [0, 128, 0, 255]).unwrap(), Some(ring)).unwrap();
    assert_eq!(out.pixel(0, 20), Some(ring.rgba));
    assert_eq!(out.pixel(2, 20), Some(ring.rgba));
    assert_eq!(out.pixel(3, 20), Some([0, 128, 0, 255]));
    assert_eq!(out.pixel(20, 20), Some([0, 128, 0, 255]));
    assert_eq!(out.pixel(0, 0).unwrap()[3], 0);
}
