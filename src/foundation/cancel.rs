use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::foundation::error::{CastError, CastResult};

/// Cooperative cancellation flag shared between a caller and a running pipeline.
///
/// The pipeline polls it between frames; nothing is persisted once it trips.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn check(&self, what: &str) -> CastResult<()> {
        if self.is_cancelled() {
            return Err(CastError::cancelled(what.to_string()));
        }
        Ok(())
    }
}
