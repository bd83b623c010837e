//! Shared building blocks: frame buffers, the error taxonomy, cancellation and capability probing.

pub mod cancel;
pub mod caps;
pub mod error;
pub mod frame;
