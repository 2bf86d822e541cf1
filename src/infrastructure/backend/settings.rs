//! Settings collaborator backed by process memory

use crate::domain::backend::CallSettings;
use std::sync::atomic::{AtomicBool, Ordering};

/// Recording/logging preference that can be flipped at runtime
///
/// The orchestrator snapshots it at call start, so changes only affect the
/// next call.
#[derive(Debug)]
pub struct InMemorySettings {
    logging_enabled: AtomicBool,
}

impl InMemorySettings {
    pub fn new(logging_enabled: bool) -> Self {
        Self {
            logging_enabled: AtomicBool::new(logging_enabled),
        }
    }

    pub fn set_logging_enabled(&self, enabled: bool) {
        self.logging_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl CallSettings for InMemorySettings {
    fn logging_enabled(&self) -> bool {
        self.logging_enabled.load(Ordering::SeqCst)
    }
}
