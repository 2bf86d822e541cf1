//! In-process audio session with failure injection

use crate::domain::audio_path::{
    AudioCategory, AudioError, AudioMode, AudioSession, OutputPort, RouteOptions,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
pub struct LoopbackAudioSession {
    active: AtomicBool,
    activations: AtomicUsize,
    deactivations: AtomicUsize,
    category: Mutex<Option<(AudioCategory, AudioMode)>>,
    output: Mutex<Option<OutputPort>>,
    fail_category: Mutex<Option<String>>,
    fail_route: Mutex<Option<String>>,
    fail_deactivation: Mutex<Option<String>>,
}

impl LoopbackAudioSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_category(&self, reason: impl Into<String>) {
        *self.fail_category.lock().unwrap() = Some(reason.into());
    }

    pub fn fail_route(&self, reason: impl Into<String>) {
        *self.fail_route.lock().unwrap() = Some(reason.into());
    }

    pub fn fail_deactivation(&self, reason: impl Into<String>) {
        *self.fail_deactivation.lock().unwrap() = Some(reason.into());
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    pub fn deactivations(&self) -> usize {
        self.deactivations.load(Ordering::SeqCst)
    }

    pub fn output(&self) -> Option<OutputPort> {
        *self.output.lock().unwrap()
    }

    pub fn category(&self) -> Option<(AudioCategory, AudioMode)> {
        *self.category.lock().unwrap()
    }
}

impl AudioSession for LoopbackAudioSession {
    fn set_category(
        &self,
        category: AudioCategory,
        mode: AudioMode,
        options: RouteOptions,
    ) -> Result<(), AudioError> {
        if let Some(reason) = self.fail_category.lock().unwrap().clone() {
            return Err(AudioError::Category(reason));
        }
        debug!("Audio category {:?}/{:?} with {:?}", category, mode, options);
        *self.category.lock().unwrap() = Some((category, mode));
        Ok(())
    }

    fn set_active(&self, active: bool, notify_others: bool) -> Result<(), AudioError> {
        if active {
            self.activations.fetch_add(1, Ordering::SeqCst);
            self.active.store(true, Ordering::SeqCst);
            return Ok(());
        }

        self.deactivations.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = self.fail_deactivation.lock().unwrap().clone() {
            return Err(AudioError::Activation(reason));
        }
        debug!("Audio session released (notify others: {})", notify_others);
        self.active.store(false, Ordering::SeqCst);
        *self.output.lock().unwrap() = None;
        Ok(())
    }

    fn override_output(&self, port: OutputPort) -> Result<(), AudioError> {
        if let Some(reason) = self.fail_route.lock().unwrap().clone() {
            return Err(AudioError::Route(reason));
        }
        *self.output.lock().unwrap() = Some(port);
        Ok(())
    }
}
