use super::*;
use std::sync::{Arc, Mutex};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("nutrichat-{}-{name}", uuid::Uuid::new_v4()))
}

// =============================================================================
// ImageAttachment
// =============================================================================

#[test]
fn image_mime_is_accepted_and_normalized() {
    let image = ImageAttachment::new("plate.jpg", " Image/JPEG ", vec![1, 2, 3]).unwrap();
    assert_eq!(image.blob().mime, "image/jpeg");
    assert_eq!(image.into_blob().bytes, vec![1, 2, 3]);
}

#[test]
fn non_image_mime_is_rejected() {
    for mime in ["application/pdf", "image/", "image", "text/plain"] {
        let err = ImageAttachment::new("x", mime, vec![]).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidMime(_)), "{mime}");
    }
}

#[test]
fn mime_guessed_from_extension() {
    assert_eq!(mime_for_path(Path::new("a/b/lunch.PNG")), Some("image/png"));
    assert_eq!(mime_for_path(Path::new("dinner.jpeg")), Some("image/jpeg"));
    assert_eq!(mime_for_path(Path::new("notes.txt")), None);
    assert_eq!(mime_for_path(Path::new("noext")), None);
}

#[tokio::test]
async fn from_path_reads_file() {
    let path = temp_path("meal.webp");
    tokio::fs::write(&path, b"RIFF").await.unwrap();

    let image = ImageAttachment::from_path(&path).await.unwrap();
    assert_eq!(image.blob().mime, "image/webp");
    assert_eq!(image.blob().bytes, b"RIFF");
    assert!(image.blob().file_name.ends_with("meal.webp"));

    tokio::fs::remove_file(&path).await.unwrap();
}

#[tokio::test]
async fn from_path_rejects_non_image_before_reading() {
    let err = ImageAttachment::from_path(Path::new("/definitely/missing/report.pdf")).await.unwrap_err();
    assert!(matches!(err, CaptureError::InvalidMime(_)));
}

#[tokio::test]
async fn from_path_missing_file_is_io_error() {
    let err = ImageAttachment::from_path(Path::new("/definitely/missing/plate.png")).await.unwrap_err();
    assert!(matches!(err, CaptureError::Io(_)));
}

// =============================================================================
// AttachmentSlot
// =============================================================================

#[test]
fn slot_select_replace_take_clear() {
    let mut slot = AttachmentSlot::default();
    assert!(slot.pending().is_none());

    slot.select(ImageAttachment::new("a.png", "image/png", vec![1]).unwrap());
    slot.select(ImageAttachment::new("b.png", "image/png", vec![2]).unwrap());
    assert_eq!(slot.pending().unwrap().blob().file_name, "b.png");

    assert!(slot.take().is_some());
    assert!(slot.take().is_none());

    slot.select(ImageAttachment::new("c.png", "image/png", vec![3]).unwrap());
    slot.clear();
    assert!(slot.pending().is_none());
}

// =============================================================================
// VoiceCapture
// =============================================================================

#[derive(Default)]
struct ScriptedRecorder {
    calls: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait::async_trait]
impl AudioRecorder for ScriptedRecorder {
    fn is_available(&self) -> bool {
        true
    }

    async fn start(&self) -> Result<(), CaptureError> {
        self.calls.lock().unwrap().push("start");
        Ok(())
    }

    async fn stop(&self) -> Result<MediaBlob, CaptureError> {
        self.calls.lock().unwrap().push("stop");
        Ok(MediaBlob { file_name: "clip.webm".into(), mime: "audio/webm".into(), bytes: vec![9; 4] })
    }
}

#[tokio::test]
async fn toggle_starts_then_captures() {
    let recorder = ScriptedRecorder::default();
    let calls = recorder.calls.clone();
    let mut voice = VoiceCapture::new(Box::new(recorder));

    assert_eq!(voice.toggle().await.unwrap(), VoiceEvent::Started);
    assert!(voice.is_recording());

    let VoiceEvent::Captured(clip) = voice.toggle().await.unwrap() else {
        panic!("expected a captured clip");
    };
    assert_eq!(clip.bytes.len(), 4);
    assert!(!voice.is_recording());
    assert_eq!(*calls.lock().unwrap(), vec!["start", "stop"]);
}

#[tokio::test]
async fn unavailable_recorder_leaves_state_unchanged() {
    let mut voice = VoiceCapture::default();
    let err = voice.toggle().await.unwrap_err();
    assert!(matches!(err, CaptureError::Unavailable));
    assert!(!voice.is_recording());
    assert!(!err.alert_message().is_empty());
}

#[tokio::test]
async fn file_recorder_reads_clip() {
    let path = temp_path("note.wav");
    tokio::fs::write(&path, b"WAVE").await.unwrap();

    let mut voice = VoiceCapture::new(Box::new(FileRecorder::new(&path)));
    voice.toggle().await.unwrap();
    let VoiceEvent::Captured(clip) = voice.toggle().await.unwrap() else {
        panic!("expected a captured clip");
    };
    assert_eq!(clip.mime, "audio/wav");
    assert_eq!(clip.bytes, b"WAVE");

    tokio::fs::remove_file(&path).await.unwrap();
}
