//! API: typed client for the nutrition assistant backend.
//!
//! DESIGN
//! ======
//! Everything above this module talks to the backend through the
//! [`NutriBackend`] trait so the engine and controller can be driven by an
//! in-memory mock in tests. [`HttpBackend`] is the `reqwest` implementation
//! configured by [`ClientConfig`].

pub mod config;
pub mod http;
pub mod types;

pub use config::ClientConfig;
pub use http::HttpBackend;
use types::{ApiError, ChatResponse, HistoryTurn, LogAck, MealSubmission, MediaBlob, NutritionItem, NutritionTotals};

// =============================================================================
// BACKEND TRAIT
// =============================================================================

/// Backend endpoints consumed by the client. Enables mocking in tests.
#[async_trait::async_trait]
pub trait NutriBackend: Send + Sync {
    /// Send one chat turn (multipart: `message`, optional `image`).
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] on transport failure, non-2xx status, or an
    /// unparseable body.
    async fn chat(&self, message: &str, image: Option<&MediaBlob>) -> Result<ChatResponse, ApiError>;

    /// Fetch persisted conversation turns, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn history(&self) -> Result<Vec<HistoryTurn>, ApiError>;

    /// Delete persisted conversation history.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn clear_history(&self) -> Result<(), ApiError>;

    /// Ask the nutrition service for totals of the given rows.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn nutrition_totals(&self, items: &[NutritionItem]) -> Result<NutritionTotals, ApiError>;

    /// Commit a confirmed meal to the log.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn log_meal(&self, submission: &MealSubmission) -> Result<LogAck, ApiError>;

    /// Transcribe a recorded voice clip. `Ok(None)` means no speech found.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails.
    async fn transcribe(&self, audio: &MediaBlob) -> Result<Option<String>, ApiError>;
}
