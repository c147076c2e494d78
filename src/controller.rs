//! Conversation controller: one send/receive cycle per user submission.
//!
//! DESIGN
//! ======
//! The controller owns the message log, the pending image slot, the voice
//! toggle and the panel engine. `send` appends the user turn and a pending
//! "thinking" turn, makes exactly one chat request, removes the pending
//! turn, then dispatches the decoded reply: rendered markup goes to the
//! log, a panel signal goes to the engine.
//!
//! ERROR HANDLING
//! ==============
//! A failed chat request (transport, status, or parse) becomes a generic
//! assistant notice. The raw error is logged, never shown. History and
//! clear failures are returned to the caller unchanged.

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::types::{ApiError, ChatResponse};
use crate::api::{ClientConfig, NutriBackend};
use crate::engine::PanelEngine;
use crate::media::{AttachmentSlot, AudioRecorder, CaptureError, ImageAttachment, VoiceCapture, VoiceEvent};
use crate::response::{PanelInstruction, PanelSignal, decode};
use crate::state::messages::{AttachmentRef, MessageLog};
use crate::state::panel::PanelKind;

/// Shown in place of a reply when the chat request fails.
pub const FAILURE_NOTICE: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("nothing to send: message is empty and no image is attached")]
    EmptyMessage,
}

/// What one send cycle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Answered {
        /// An assistant reply was appended.
        replied: bool,
        /// The side panel was (re)opened with this kind.
        panel: Option<PanelKind>,
    },
    /// The request failed; a failure notice was appended.
    Failed,
}

/// What one voice toggle produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    Recording,
    Sent(SendOutcome),
    NoSpeech,
    TranscriptionFailed,
}

pub struct ConversationController {
    backend: Arc<dyn NutriBackend>,
    log: MessageLog,
    engine: PanelEngine,
    attachments: AttachmentSlot,
    voice: VoiceCapture,
    primary_agent: String,
}

impl ConversationController {
    #[must_use]
    pub fn new(backend: Arc<dyn NutriBackend>, config: &ClientConfig) -> Self {
        Self {
            engine: PanelEngine::new(backend.clone(), config.recompute_debounce),
            backend,
            log: MessageLog::default(),
            attachments: AttachmentSlot::default(),
            voice: VoiceCapture::default(),
            primary_agent: config.primary_agent.clone(),
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Box<dyn AudioRecorder>) -> Self {
        self.voice = VoiceCapture::new(recorder);
        self
    }

    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub fn engine(&self) -> &PanelEngine {
        &self.engine
    }

    #[must_use]
    pub fn attachments(&self) -> &AttachmentSlot {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentSlot {
        &mut self.attachments
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.voice.is_recording()
    }

    // -------------------------------------------------------------------------
    // send
    // -------------------------------------------------------------------------

    /// Send `text` with whatever image is pending in the slot. The slot is
    /// emptied by the attempt.
    ///
    /// # Errors
    ///
    /// [`SendError::EmptyMessage`] when there is neither text nor an image.
    pub async fn submit(&mut self, text: &str) -> Result<SendOutcome, SendError> {
        let attachment = self.attachments.take();
        self.send(text, attachment).await
    }

    /// Run one chat cycle.
    ///
    /// # Errors
    ///
    /// [`SendError::EmptyMessage`] when `text` is blank and there is no
    /// attachment. Nothing is appended in that case.
    pub async fn send(&mut self, text: &str, attachment: Option<ImageAttachment>) -> Result<SendOutcome, SendError> {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return Err(SendError::EmptyMessage);
        }

        let attachment_ref = attachment
            .as_ref()
            .map(|a| AttachmentRef { file_name: a.blob().file_name.clone(), mime: a.blob().mime.clone() });
        self.log.push_user(text, attachment_ref);
        let pending = self.log.push_pending();

        info!(chars = text.len(), image = attachment.is_some(), "chat: sending");
        let result = self.backend.chat(text, attachment.as_ref().map(ImageAttachment::blob)).await;
        self.log.remove_pending(&pending);

        match result {
            Ok(response) => Ok(self.dispatch(response)),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "chat: request failed");
                self.log.push_assistant_text(FAILURE_NOTICE);
                Ok(SendOutcome::Failed)
            }
        }
    }

    fn dispatch(&mut self, response: ChatResponse) -> SendOutcome {
        let decoded = decode(response);

        let replied = match decoded.reply {
            Some(markup) => {
                self.log.push_assistant_markup(&markup);
                true
            }
            None => false,
        };

        let panel = match decoded.panel {
            PanelSignal::Instruction(PanelInstruction::Meal(items)) | PanelSignal::LegacyAnalysis(items) => {
                self.engine.open_meal(&items);
                Some(PanelKind::Meal)
            }
            PanelSignal::Instruction(PanelInstruction::Recipe(recipe)) | PanelSignal::LegacyRecipe(recipe) => {
                self.engine.open_recipe(Arc::new(recipe));
                Some(PanelKind::Recipe)
            }
            PanelSignal::LegacyWebSearch(lookup) => {
                self.engine.open_web_search(&lookup);
                Some(PanelKind::Meal)
            }
            PanelSignal::None => None,
        };

        info!(replied, panel = ?panel, "chat: reply dispatched");
        SendOutcome::Answered { replied, panel }
    }

    // -------------------------------------------------------------------------
    // history
    // -------------------------------------------------------------------------

    /// Replace the transcript (after the welcome turn) with server history.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the history request; the log is
    /// unchanged in that case.
    pub async fn load_history(&mut self) -> Result<usize, ApiError> {
        let history = self.backend.history().await?;
        let shown = self.log.hydrate(&history, &self.primary_agent);
        info!(fetched = history.len(), shown, "chat: history loaded");
        Ok(shown)
    }

    /// Delete server history and keep only the welcome turn.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the delete request; the log is
    /// unchanged in that case.
    pub async fn clear_history(&mut self) -> Result<(), ApiError> {
        self.backend.clear_history().await?;
        self.log.retain_welcome();
        info!("chat: history cleared");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // voice
    // -------------------------------------------------------------------------

    /// Start recording, or stop, transcribe, and send the transcript.
    ///
    /// # Errors
    ///
    /// A [`CaptureError`] from the recorder. Conversation state is untouched.
    pub async fn voice_toggle(&mut self) -> Result<VoiceOutcome, CaptureError> {
        let clip = match self.voice.toggle().await? {
            VoiceEvent::Started => return Ok(VoiceOutcome::Recording),
            VoiceEvent::Captured(clip) => clip,
        };

        match self.backend.transcribe(&clip).await {
            Ok(Some(text)) => match self.submit(&text).await {
                Ok(outcome) => Ok(VoiceOutcome::Sent(outcome)),
                Err(SendError::EmptyMessage) => Ok(VoiceOutcome::NoSpeech),
            },
            Ok(None) => {
                info!("voice: no speech detected");
                Ok(VoiceOutcome::NoSpeech)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "voice: transcription failed");
                Ok(VoiceOutcome::TranscriptionFailed)
            }
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
