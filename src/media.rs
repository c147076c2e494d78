//! Media capture adapters: image attachments and voice clips.
//!
//! DESIGN
//! ======
//! Each adapter yields exactly one artifact for the conversation
//! controller: an [`ImageAttachment`] held in an [`AttachmentSlot`] until
//! the next send, or a recorded clip from [`VoiceCapture`]. Platform audio
//! capture sits behind the [`AudioRecorder`] trait; the crate ships a
//! [`FileRecorder`] (reads a prepared clip from disk) and a [`NoRecorder`].
//!
//! ERROR HANDLING
//! ==============
//! Capture failures never touch conversation or panel state. They surface
//! as a [`CaptureError`] whose [`CaptureError::alert_message`] is shown to
//! the user as-is.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::api::types::MediaBlob;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("audio recording is not available")]
    Unavailable,
    #[error("not an image: {0}")]
    InvalidMime(String),
    #[error("recorder failed: {0}")]
    Recorder(String),
    #[error("could not read media file: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// User-facing alert text.
    #[must_use]
    pub fn alert_message(&self) -> String {
        match self {
            Self::Unavailable => "Voice recording is not supported here.".into(),
            Self::InvalidMime(_) => "Please choose an image file.".into(),
            Self::Recorder(_) => "Could not access the microphone.".into(),
            Self::Io(e) => format!("Could not open that file: {e}"),
        }
    }
}

// =============================================================================
// IMAGES
// =============================================================================

/// A validated image ready to upload alongside a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment(MediaBlob);

impl ImageAttachment {
    /// # Errors
    ///
    /// [`CaptureError::InvalidMime`] unless `mime` is `image/*`.
    pub fn new(file_name: impl Into<String>, mime: &str, bytes: Vec<u8>) -> Result<Self, CaptureError> {
        let mime = mime.trim().to_ascii_lowercase();
        match mime.split_once('/') {
            Some(("image", sub)) if !sub.is_empty() => {
                Ok(Self(MediaBlob { file_name: file_name.into(), mime, bytes }))
            }
            _ => Err(CaptureError::InvalidMime(mime)),
        }
    }

    /// Load an image from disk, guessing the MIME type from the extension.
    ///
    /// # Errors
    ///
    /// [`CaptureError::InvalidMime`] for non-image extensions, or
    /// [`CaptureError::Io`] if the file cannot be read.
    pub async fn from_path(path: &Path) -> Result<Self, CaptureError> {
        let mime = mime_for_path(path).ok_or_else(|| CaptureError::InvalidMime(path.display().to_string()))?;
        let bytes = tokio::fs::read(path).await?;
        let file_name = path.file_name().map_or_else(|| "image".into(), |n| n.to_string_lossy().into_owned());
        Self::new(file_name, mime, bytes)
    }

    #[must_use]
    pub fn blob(&self) -> &MediaBlob {
        &self.0
    }

    #[must_use]
    pub fn into_blob(self) -> MediaBlob {
        self.0
    }
}

fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    Some(match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        _ => return None,
    })
}

/// The single pending image. Selecting replaces; a send attempt takes it.
#[derive(Debug, Default)]
pub struct AttachmentSlot {
    pending: Option<ImageAttachment>,
}

impl AttachmentSlot {
    pub fn select(&mut self, image: ImageAttachment) {
        debug!(file = %image.blob().file_name, bytes = image.blob().bytes.len(), "media: image selected");
        self.pending = Some(image);
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }

    pub fn take(&mut self) -> Option<ImageAttachment> {
        self.pending.take()
    }

    #[must_use]
    pub fn pending(&self) -> Option<&ImageAttachment> {
        self.pending.as_ref()
    }
}

// =============================================================================
// VOICE
// =============================================================================

/// Platform audio capture. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AudioRecorder: Send + Sync {
    fn is_available(&self) -> bool;

    /// # Errors
    ///
    /// [`CaptureError::Recorder`] if capture cannot start.
    async fn start(&self) -> Result<(), CaptureError>;

    /// Stop and return the recorded clip.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Recorder`] or [`CaptureError::Io`].
    async fn stop(&self) -> Result<MediaBlob, CaptureError>;
}

/// Recorder for environments without audio capture.
#[derive(Debug, Default)]
pub struct NoRecorder;

#[async_trait::async_trait]
impl AudioRecorder for NoRecorder {
    fn is_available(&self) -> bool {
        false
    }

    async fn start(&self) -> Result<(), CaptureError> {
        Err(CaptureError::Unavailable)
    }

    async fn stop(&self) -> Result<MediaBlob, CaptureError> {
        Err(CaptureError::Unavailable)
    }
}

/// "Records" by reading a prepared clip from disk on stop.
#[derive(Debug, Clone)]
pub struct FileRecorder {
    path: PathBuf,
}

impl FileRecorder {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl AudioRecorder for FileRecorder {
    fn is_available(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn stop(&self) -> Result<MediaBlob, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let file_name = self.path.file_name().map_or_else(|| "recording".into(), |n| n.to_string_lossy().into_owned());
        Ok(MediaBlob { file_name, mime: audio_mime(&self.path).into(), bytes })
    }
}

fn audio_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("m4a") => "audio/mp4",
        _ => "audio/webm",
    }
}

/// What a voice toggle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Started,
    Captured(MediaBlob),
}

/// Start/stop toggle around an [`AudioRecorder`].
pub struct VoiceCapture {
    recorder: Box<dyn AudioRecorder>,
    recording: bool,
}

impl VoiceCapture {
    #[must_use]
    pub fn new(recorder: Box<dyn AudioRecorder>) -> Self {
        Self { recorder, recording: false }
    }

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start recording, or stop and return the clip.
    ///
    /// # Errors
    ///
    /// [`CaptureError::Unavailable`] when there is no recorder; recording
    /// state is unchanged. A failed stop ends the recording.
    pub async fn toggle(&mut self) -> Result<VoiceEvent, CaptureError> {
        if !self.recorder.is_available() {
            return Err(CaptureError::Unavailable);
        }
        if self.recording {
            self.recording = false;
            let clip = self.recorder.stop().await?;
            info!(bytes = clip.bytes.len(), mime = %clip.mime, "voice: clip captured");
            Ok(VoiceEvent::Captured(clip))
        } else {
            self.recorder.start().await?;
            self.recording = true;
            info!("voice: recording started");
            Ok(VoiceEvent::Started)
        }
    }
}

impl Default for VoiceCapture {
    fn default() -> Self {
        Self::new(Box::new(NoRecorder))
    }
}

#[cfg(test)]
#[path = "media_test.rs"]
mod tests;
