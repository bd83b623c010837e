use super::*;

fn image_doc() -> AnimationDocument {
    let mut doc = AnimationDocument::new("test", 10, 4, 4);
    doc.assets.push(Asset::embedded(
        "image_0",
        4,
        4,
        "data:image/png;base64,AAAA".to_string(),
    ));
    doc.layers.push(
        Layer::image(
            0,
            "Frame 0".to_string(),
            "image_0".to_string(),
            Transform::centered(4, 4).with_opacity(Property::keyframed(vec![
                Keyframe::at(0.0, 100.0).ending_at(0.0),
                Keyframe::at(1.0, 0.0),
            ])),
        )
        .spanning(0.0, 1.0),
    );
    doc.out_tick = 1.0;
    doc
}

#[test]
fn serializes_with_lottie_keys() {
    let v: serde_json::Value = serde_json::from_str(&image_doc().to_json().unwrap()).unwrap();
    assert_eq!(v["v"], "5.7.4");
    assert_eq!(v["fr"], 10);
    assert_eq!(v["w"], 4);
    assert_eq!(v["assets"][0]["id"], "image_0");
    assert_eq!(v["assets"][0]["e"], 1);
    let layer = &v["layers"][0];
    assert_eq!(layer["ty"], 2);
    assert_eq!(layer["refId"], "image_0");
    assert_eq!(layer["ks"]["o"]["a"], 1);
    assert_eq!(layer["ks"]["o"]["k"][0]["s"][0], 100.0);
    assert_eq!(layer["ks"]["o"]["k"][0]["e"][0], 0.0);
    assert!(layer["ks"]["o"]["k"][1].get("e").is_none());
    assert_eq!(layer["ks"]["p"]["k"], serde_json::json!([2.0, 2.0, 0.0]));
    assert!(layer.get("shapes").is_none());
}

#[test]
fn json_roundtrip_preserves_document() {
    let doc = image_doc();
    let back = AnimationDocument::from_json(&doc.to_json().unwrap()).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn shape_items_are_tagged_by_ty() {
    let item = ShapeItem::Group {
        name: "g".to_string(),
        items: vec![
            ShapeItem::Ellipse {
                position: Property::fixed_vec(vec![0.0, 0.0]),
                size: Property::fixed_vec(vec![10.0, 10.0]),
            },
            ShapeItem::Path {
                path: PathProperty {
                    animated: 0,
                    bezier: Bezier::polygon(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
                },
            },
        ],
        blend_mode: 0,
    };
    let v = serde_json::to_value(&item).unwrap();
    assert_eq!(v["ty"], "gr");
    assert_eq!(v["it"][0]["ty"], "el");
    assert_eq!(v["it"][1]["ty"], "sh");
    assert_eq!(v["it"][1]["ks"]["k"]["c"], true);
    let back: ShapeItem = serde_json::from_value(v).unwrap();
    assert_eq!(back, item);
}

#[test]
fn validate_rejects_dangling_ref() {
    let mut doc = image_doc();
    doc.layers[0].asset_ref = Some("image_9".to_string());
    assert!(doc.validate().unwrap_err().to_string().contains("missing asset"));
}

#[test]
fn validate_rejects_duplicate_asset_ids() {
    let mut doc = image_doc();
    let dup = doc.assets[0].clone();
    doc.assets.push(dup);
    assert!(doc.validate().unwrap_err().to_string().contains("duplicate asset id"));
}

#[test]
fn validate_rejects_unordered_and_negative_spans() {
    let mut doc = image_doc();
    doc.layers[0].end_tick = -1.0;
    assert!(matches!(doc.validate(), Err(CastError::Validation(_))));

    let mut doc = image_doc();
    let mut second = doc.layers[0].clone();
    doc.layers[0] = doc.layers[0].clone().spanning(2.0, 3.0);
    second.index = 1;
    doc.layers.push(second);
    assert!(doc.validate().unwrap_err().to_string().contains("starts before"));
}

#[test]
fn validate_rejects_mismatched_animated_flag() {
    let mut doc = image_doc();
    doc.layers[0].transform.opacity.animated = 0;
    assert!(doc.validate().unwrap_err().to_string().contains("animated flag"));
}

#[test]
fn unknown_layer_type_fails_to_parse() {
    let mut v = serde_json::to_value(image_doc()).unwrap();
    v["layers"][0]["ty"] = serde_json::json!(7);
    assert!(AnimationDocument::from_json(&v.to_string()).is_err());
}

#[test]
fn duration_secs_uses_frame_rate() {
    let mut doc = image_doc();
    doc.out_tick = 25.0;
    assert!((doc.duration_secs() - 2.5).abs() < 1e-12);
}
