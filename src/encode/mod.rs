//! Still-image encoding for embedded animation assets.

/// PNG / WebP encoders and data-URI helpers.
pub mod still;
