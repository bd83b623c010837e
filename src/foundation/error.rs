use std::fmt;

/// Convenience result type used across lottiecast.
pub type CastResult<T> = Result<T, CastError>;

/// Pipeline stage an error is attributed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pulling a frame out of the source decoder.
    Decode,
    /// Comparing a candidate frame against the last retained frame.
    Difference,
    /// Background removal.
    Removal,
    /// Downscaling to the dimension bound.
    Optimize,
    /// Still-image encoding of a frame.
    Encode,
    /// Timeline assembly.
    Assemble,
    /// Writing the document to storage.
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Decode => "decode",
            Self::Difference => "difference",
            Self::Removal => "background removal",
            Self::Optimize => "optimize",
            Self::Encode => "encode",
            Self::Assemble => "assemble",
            Self::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// Top-level error taxonomy used by the conversion pipeline.
#[derive(thiserror::Error, Debug)]
pub enum CastError {
    /// Malformed frame data or frames of mismatched size.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The decoder could not open or read the source.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    /// No frames reached a stage that needs at least one.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A still-image codec failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The external background-removal model failed.
    #[error("background removal error: {0}")]
    Removal(String),

    /// Invalid options or document structure.
    #[error("validation error: {0}")]
    Validation(String),

    /// The run was cancelled between frames.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// An error attributed to one frame of one stage.
    #[error("{stage} failed at frame {index}: {source}")]
    AtFrame {
        /// Stage that failed.
        stage: Stage,
        /// Zero-based frame index within that stage's input.
        index: usize,
        /// Underlying error.
        #[source]
        source: Box<CastError>,
    },

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CastError {
    /// Build a [`CastError::InvalidInput`] value.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Build a [`CastError::SourceUnavailable`] value.
    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    /// Build a [`CastError::EmptyInput`] value.
    pub fn empty_input(msg: impl Into<String>) -> Self {
        Self::EmptyInput(msg.into())
    }

    /// Build a [`CastError::Encoding`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Build a [`CastError::Removal`] value.
    pub fn removal(msg: impl Into<String>) -> Self {
        Self::Removal(msg.into())
    }

    /// Build a [`CastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`CastError::Cancelled`] value.
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Attribute this error to `stage` at frame `index`.
    pub fn at_frame(self, stage: Stage, index: usize) -> Self {
        Self::AtFrame {
            stage,
            index,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any [`CastError::AtFrame`] context.
    pub fn root(&self) -> &CastError {
        let mut cur = self;
        while let Self::AtFrame { source, .. } = cur {
            cur = source;
        }
        cur
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
