use super::*;
use crate::document::model::{Asset, Layer, Transform};

fn doc() -> AnimationDocument {
    let mut doc = AnimationDocument::new("store", 10, 2, 2);
    doc.assets.push(Asset::embedded(
        "image_0",
        2,
        2,
        "data:image/png;base64,AAAA".to_string(),
    ));
    doc.layers.push(
        Layer::image(0, "Frame 0".to_string(), "image_0".to_string(), Transform::centered(2, 2))
            .spanning(0.0, 1.0),
    );
    doc.out_tick = 1.0;
    doc
}

#[test]
fn default_output_is_sibling_with_suffix() {
    assert_eq!(
        default_output_path(Path::new("/tmp/anims/spin.gif")),
        PathBuf::from("/tmp/anims/spin_lottie.json")
    );
    assert_eq!(
        default_output_path(Path::new("clip.mp4")),
        PathBuf::from("clip_lottie.json")
    );
}

#[test]
fn writes_compact_json_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("out.json");
    let bytes = write_document(&path, &doc(), false).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.len() as u64, bytes);
    assert!(!raw.contains('\n'));
    assert_eq!(read_document(&path).unwrap(), doc());
}

#[test]
fn refuses_to_overwrite_without_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    std::fs::write(&path, "keep me").unwrap();

    assert!(matches!(
        write_document(&path, &doc(), false),
        Err(CastError::InvalidInput(_))
    ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");

    write_document(&path, &doc(), true).unwrap();
    assert_ne!(std::fs::read_to_string(&path).unwrap(), "keep me");
}

#[test]
fn invalid_document_leaves_target_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.json");
    let mut bad = doc();
    bad.layers[0].asset_ref = Some("nope".to_string());

    assert!(write_document(&path, &bad, true).is_err());
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
