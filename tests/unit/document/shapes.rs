use super::*;
use crate::document::model::{LayerType, PropertyValue};

#[test]
fn every_pattern_builds_a_valid_document() {
    for pattern in ShapePattern::ALL {
        let doc = build_pattern_document(pattern, &PatternOptions::default()).unwrap();
        assert_eq!(doc.frame_rate, 30);
        assert_eq!(doc.out_tick, 90.0);
        assert!(doc.assets.is_empty());
        assert!(doc.layers.iter().all(|l| l.layer_type == LayerType::Shape));
        let expected: u32 = pattern_elements(pattern).iter().map(|e| e.copies).sum();
        assert_eq!(doc.layers.len() as u32, expected, "{pattern}");
    }
}

#[test]
fn layers_are_top_most_first() {
    let doc = build_pattern_document(ShapePattern::Pinwheel, &PatternOptions::default()).unwrap();
    assert_eq!(doc.layers.first().unwrap().name, "Outer Ring");
    assert_eq!(doc.layers.last().unwrap().name, "Eye White");
    let blades: Vec<_> = doc
        .layers
        .iter()
        .filter(|l| l.name.starts_with("Blade"))
        .map(|l| l.name.as_str())
        .collect();
    assert_eq!(blades, ["Blade 1", "Blade 2", "Blade 3"]);
}

#[test]
fn spinning_copies_carry_eased_full_turn() {
    let doc = build_pattern_document(ShapePattern::Tomoe, &PatternOptions::default()).unwrap();
    let second = doc.layers.iter().find(|l| l.name == "Tomoe 2").unwrap();
    let keys = second.transform.rotation.keyframes().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0].tick, 0.0);
    assert_eq!(keys[0].start, vec![120.0]);
    assert_eq!(keys[1].tick, 90.0);
    assert_eq!(keys[1].start, vec![480.0]);
    assert_eq!(keys[0].in_tangent, Some(EaseHandle::new(0.667, 1.0)));
    assert_eq!(keys[0].out_tangent, Some(EaseHandle::new(0.333, 0.0)));

    let pupil = doc.layers.iter().find(|l| l.name == "Pupil").unwrap();
    assert_eq!(pupil.transform.rotation.value, PropertyValue::Scalar(0.0));
}

#[test]
fn vortex_turns_counter_clockwise() {
    let doc = build_pattern_document(ShapePattern::Vortex, &PatternOptions::default()).unwrap();
    let blade = doc.layers.iter().find(|l| l.name == "Vortex Blade 1").unwrap();
    let keys = blade.transform.rotation.keyframes().unwrap();
    assert_eq!(keys[0].start, vec![-45.0]);
    assert_eq!(keys[1].start, vec![-405.0]);
}

#[test]
fn geometry_scales_with_canvas() {
    let opts = PatternOptions {
        size: 256,
        ..PatternOptions::default()
    };
    let doc = build_pattern_document(ShapePattern::Tomoe, &opts).unwrap();
    assert_eq!((doc.width, doc.height), (256, 256));
    let pupil = doc.layers.iter().find(|l| l.name == "Pupil").unwrap();
    let Some(ShapeItem::Group { items, .. }) = pupil.shapes.as_ref().and_then(|s| s.first())
    else {
        panic!("pupil layer has no group");
    };
    let ShapeItem::Ellipse { size, .. } = &items[0] else {
        panic!("pupil group does not start with an ellipse");
    };
    assert_eq!(size.value, PropertyValue::Vector(vec![40.0, 40.0]));
    assert_eq!(
        pupil.transform.position.value,
        PropertyValue::Vector(vec![128.0, 128.0, 0.0])
    );
}

#[test]
fn tables_fit_the_design_canvas() {
    let half = DESIGN_CANVAS / 2.0;
    for pattern in ShapePattern::ALL {
        for element in pattern_elements(pattern) {
            let b = element_bounds(element);
            assert!(
                b.x0 >= -half && b.y0 >= -half && b.x1 <= half && b.y1 <= half,
                "{pattern}/{} escapes the canvas: {b:?}",
                element.name
            );
        }
    }
}

#[test]
fn pattern_names_parse() {
    assert_eq!("Star".parse::<ShapePattern>(), Ok(ShapePattern::Star));
    assert!("hexagon".parse::<ShapePattern>().is_err());
}

#[test]
fn invalid_pattern_options_are_rejected() {
    let bad = [
        PatternOptions {
            size: 0,
            ..PatternOptions::default()
        },
        PatternOptions {
            frame_rate: 0,
            ..PatternOptions::default()
        },
        PatternOptions {
            duration_s: 0.0,
            ..PatternOptions::default()
        },
    ];
    for opts in bad {
        assert!(matches!(
            build_pattern_document(ShapePattern::Tomoe, &opts),
            Err(CastError::Validation(_))
        ));
    }
}

#[test]
fn letterbox_centres_on_transparent_square() {
    let frame = Frame::filled(40, 20, [255, 0, 0, 255]).unwrap();
    let boxed = letterbox(frame, 16).unwrap();
    assert_eq!(boxed.dimensions(), (16, 16));
    assert_eq!(boxed.pixel(8, 0).unwrap()[3], 0);
    assert_eq!(boxed.pixel(8, 15).unwrap()[3], 0);
    assert_eq!(boxed.pixel(8, 8).unwrap(), [255, 0, 0, 255]);
}

#[test]
fn spin_document_embeds_one_rotating_image() {
    let frame = Frame::filled(30, 10, [10, 200, 10, 255]).unwrap();
    let opts = SpinOptions {
        canvas: 32,
        ..SpinOptions::default()
    };
    let doc = spin_document(frame, None, &opts).unwrap();
    assert_eq!(doc.assets.len(), 1);
    assert_eq!(doc.layers.len(), 1);
    assert_eq!((doc.width, doc.height), (32, 32));
    assert!(doc.assets[0].payload.starts_with("data:image/png;base64,"));
    let keys = doc.layers[0].transform.rotation.keyframes().unwrap();
    assert_eq!(keys[1].start, vec![360.0]);
    assert_eq!(keys[1].tick, doc.out_tick);
}

#[test]
fn spin_document_applies_remover() {
    use crate::process::remove::{RemovalPolicy, ThresholdRemover};

    let frame = Frame::filled(8, 8, [250, 250, 250, 255]).unwrap();
    let remover = ThresholdRemover::new(RemovalPolicy::light(200)).unwrap();
    let opts = SpinOptions {
        canvas: 8,
        ..SpinOptions::default()
    };
    let doc = spin_document(frame, Some(&remover), &opts).unwrap();
    let (_, bytes) = crate::encode::still::parse_data_uri(&doc.assets[0].payload).unwrap();
    let img = image::load_from_memory(&bytes).unwrap().into_rgba8();
    assert!(img.pixels().all(|p| p.0[3] == 0));
}
