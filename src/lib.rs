//! lottiecast turns raster animations into self-contained Lottie documents.
//!
//! A run pulls frames from a [`FrameSource`] (GIF, animated WebP, video or memory),
//! samples them, drops near-duplicates, removes the background, bounds their size and
//! embeds each survivor as an image asset on its own fading layer:
//!
//! - Open a source with [`open_source`]
//! - Drive it through a [`FrameExtractor`]
//! - Build the document with [`assemble`] and persist it with [`write_document`]
//!
//! [`convert_file`] does all of the above in one call.
#![forbid(unsafe_code)]

/// The animation document model, its assembly and persistence.
pub mod document;
/// Still-image encoding.
pub mod encode;
/// Frames, errors, cancellation and capability probing.
pub mod foundation;
/// Extraction and end-to-end conversion.
pub mod pipeline;
/// Per-frame raster operations.
pub mod process;
/// Frame sources.
pub mod source;

pub use crate::foundation::cancel::CancelToken;
pub use crate::foundation::caps::Capabilities;
pub use crate::foundation::error::{CastError, CastResult, Stage};
pub use crate::foundation::frame::{Frame, TimedFrame};

pub use crate::process::crop::{Ring, circular_crop};
pub use crate::process::diff::frame_difference;
pub use crate::process::optimize::optimize_frame;
pub use crate::process::remove::{
    BackgroundRemover, ModelRemover, ModelRemoverConfig, RemovalMask, RemovalPolicy,
    RemovalStrategy, SoftEdge, ThresholdRemover, removal_mask, select_remover,
};

pub use crate::encode::still::{EncodedStill, StillFormat, encode_frame};

pub use crate::source::animated::AnimatedImageSource;
pub use crate::source::memory::MemorySource;
pub use crate::source::video::VideoSource;
pub use crate::source::{FrameSource, SourceFrame, SourceInfo, SourceKind, open_source};

pub use crate::document::assemble::{AssembleOptions, EncodeThreading, assemble, derive_frame_rate};
pub use crate::document::model::{AnimationDocument, Asset, Keyframe, Layer, LayerType, Property};
pub use crate::document::shapes::{
    PatternOptions, ShapePattern, SpinOptions, build_pattern_document, spin_document,
};
pub use crate::document::store::{default_output_path, read_document, write_document};

pub use crate::pipeline::convert::{ConvertOptions, ConvertReport, Preset, convert_file};
pub use crate::pipeline::extract::{ExtractOptions, ExtractStats, Extraction, FrameExtractor};
