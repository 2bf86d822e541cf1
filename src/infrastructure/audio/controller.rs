//! Audio-path controller
//!
//! Configures the device audio session for bidirectional voice. Only the
//! category/mode and activation steps are fatal; the output-route preference
//! is best-effort.

use crate::domain::audio_path::{
    AudioCategory, AudioError, AudioMode, AudioSession, OutputPort, RouteOptions,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct AudioPathController {
    session: Arc<dyn AudioSession>,
    prefer_speaker: bool,
    active: AtomicBool,
}

impl AudioPathController {
    pub fn new(session: Arc<dyn AudioSession>, prefer_speaker: bool) -> Self {
        Self {
            session,
            prefer_speaker,
            active: AtomicBool::new(false),
        }
    }

    /// Configure and activate the session for a voice call
    pub fn activate(&self) -> Result<(), AudioError> {
        self.session.set_category(
            AudioCategory::PlayAndRecord,
            AudioMode::VoiceChat,
            RouteOptions::voice_call(),
        )?;
        self.session.set_active(true, false)?;
        self.active.store(true, Ordering::SeqCst);

        // The call still works through the receiver or a headset
        if self.prefer_speaker {
            if let Err(e) = self.session.override_output(OutputPort::Speaker) {
                warn!("Could not route audio to speaker (non-fatal): {}", e);
            }
        }

        info!("Audio path activated");
        Ok(())
    }

    /// Release the session and let other audio consumers resume
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        match self.session.set_active(false, true) {
            Ok(()) => info!("Audio path deactivated"),
            Err(e) => error!("Error deactivating audio session: {}", e),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio_path::MockAudioSession;
    use mockall::predicate::eq;
    use mockall::Sequence;

    #[test]
    fn test_activation_order() {
        let mut session = MockAudioSession::new();
        let mut seq = Sequence::new();
        session
            .expect_set_category()
            .with(
                eq(AudioCategory::PlayAndRecord),
                eq(AudioMode::VoiceChat),
                eq(RouteOptions::voice_call()),
            )
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Ok(()));
        session
            .expect_set_active()
            .with(eq(true), eq(false))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        session
            .expect_override_output()
            .with(eq(OutputPort::Speaker))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let controller = AudioPathController::new(Arc::new(session), true);
        controller.activate().unwrap();
        assert!(controller.is_active());
    }

    #[test]
    fn test_route_failure_is_not_fatal() {
        let mut session = MockAudioSession::new();
        session.expect_set_category().returning(|_, _, _| Ok(()));
        session.expect_set_active().returning(|_, _| Ok(()));
        session
            .expect_override_output()
            .returning(|_| Err(AudioError::Route("no speaker".into())));

        let controller = AudioPathController::new(Arc::new(session), true);
        assert!(controller.activate().is_ok());
        assert!(controller.is_active());
    }

    #[test]
    fn test_category_failure_is_fatal() {
        let mut session = MockAudioSession::new();
        session
            .expect_set_category()
            .returning(|_, _, _| Err(AudioError::Category("busy".into())));
        session.expect_set_active().never();

        let controller = AudioPathController::new(Arc::new(session), true);
        assert_eq!(
            controller.activate(),
            Err(AudioError::Category("busy".into()))
        );
        assert!(!controller.is_active());
    }

    #[test]
    fn test_speaker_preference_can_be_disabled() {
        let mut session = MockAudioSession::new();
        session.expect_set_category().returning(|_, _, _| Ok(()));
        session.expect_set_active().returning(|_, _| Ok(()));
        session.expect_override_output().never();

        let controller = AudioPathController::new(Arc::new(session), false);
        assert!(controller.activate().is_ok());
    }

    #[test]
    fn test_deactivation_notifies_others_and_swallows_errors() {
        let mut session = MockAudioSession::new();
        session
            .expect_set_active()
            .with(eq(false), eq(true))
            .times(1)
            .returning(|_, _| Err(AudioError::Activation("in use".into())));

        let controller = AudioPathController::new(Arc::new(session), true);
        controller.deactivate();
        assert!(!controller.is_active());
    }
}
