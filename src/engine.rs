//! Side-panel reconciliation engine: live recompute and confirm.
//!
//! DESIGN
//! ======
//! `PanelEngine` owns the single [`SidePanelSession`] and is the only thing
//! that mutates it. Edits mutate rows in place and schedule a debounced
//! nutrition recompute; discrete actions (open, remove) recompute at once.
//! Confirm turns the session into a [`MealSubmission`], closes the panel,
//! then submits. Closing never waits on the submission.
//!
//! ORDERING
//! ========
//! Every recompute takes the next value of a monotonic sequence. A response
//! may write `last_computed` only if its sequence is still the latest
//! issued; anything older is dropped silently. Open and close also bump the
//! sequence, so responses addressed to a discarded session can never land
//! on its successor. Requests are never cancelled in flight.
//!
//! The debounce timer is one `JoinHandle` per engine, aborted on any
//! superseding edit, on removal, and on close. A token guards against a
//! timer that already woke up before it was aborted. The engine counts as
//! computing from the first edit of a burst until its request resolves;
//! [`PanelEngine::settled`] waits for that without polling.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use time::{Date, OffsetDateTime};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::NutriBackend;
use crate::api::types::{
    ApiError, MealSubmission, MealType, NutritionLookup, NutritionTotals, ParsedItem, RecipeSuggestion,
};
use crate::state::panel::{IngredientRow, PanelKind, RowEdit, SidePanelSession};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PanelError {
    #[error("no side panel is open")]
    NoSession,
    #[error("row {index} out of range ({len} rows)")]
    RowOutOfRange { index: usize, len: usize },
    #[error("expected a {expected} panel, found a {actual} panel")]
    WrongKind { expected: &'static str, actual: &'static str },
}

/// Outcome of a confirm. The panel is already closed when this is returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitReceipt {
    pub submission: MealSubmission,
    /// `false` when the log request failed or the backend refused it.
    pub accepted: bool,
}

#[derive(Default)]
struct EngineState {
    session: Option<SidePanelSession>,
    latest_issued: u64,
    latest_settled: u64,
    timer: Option<JoinHandle<()>>,
    timer_token: u64,
}

impl EngineState {
    fn session_mut(&mut self) -> Result<&mut SidePanelSession, PanelError> {
        self.session.as_mut().ok_or(PanelError::NoSession)
    }

    fn expect_kind(&self, expected: PanelKind) -> Result<(), PanelError> {
        let actual = self.session.as_ref().ok_or(PanelError::NoSession)?.kind;
        if actual == expected {
            Ok(())
        } else {
            Err(PanelError::WrongKind { expected: expected.as_str(), actual: actual.as_str() })
        }
    }

    fn cancel_timer(&mut self) {
        self.timer_token += 1;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Make every in-flight recompute stale without issuing a new one.
    fn supersede(&mut self) {
        self.latest_issued += 1;
        self.latest_settled = self.latest_issued;
    }

    fn teardown(&mut self) -> Option<SidePanelSession> {
        self.cancel_timer();
        self.supersede();
        self.session.take()
    }
}

// =============================================================================
// ENGINE
// =============================================================================

/// Owner of the active side-panel session. Cheap to clone; clones share
/// the same session.
///
/// Methods that schedule work spawn tokio tasks and must be called from
/// within a tokio runtime.
#[derive(Clone)]
pub struct PanelEngine {
    state: Arc<Mutex<EngineState>>,
    settled: Arc<Notify>,
    backend: Arc<dyn NutriBackend>,
    debounce: Duration,
}

impl PanelEngine {
    #[must_use]
    pub fn new(backend: Arc<dyn NutriBackend>, debounce: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            settled: Arc::new(Notify::new()),
            backend,
            debounce,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -------------------------------------------------------------------------
    // open / close
    // -------------------------------------------------------------------------

    /// Open a meal panel from analyzer items and recompute immediately.
    pub fn open_meal(&self, items: &[ParsedItem]) {
        self.open_meal_at(items, local_now());
    }

    pub fn open_meal_at(&self, items: &[ParsedItem], now: OffsetDateTime) {
        self.install(SidePanelSession::meal(items, now));
        self.issue_recompute();
    }

    /// Open a single-row meal panel for a web-search nutrition hit.
    pub fn open_web_search(&self, lookup: &NutritionLookup) {
        self.open_web_search_at(lookup, local_now());
    }

    pub fn open_web_search_at(&self, lookup: &NutritionLookup, now: OffsetDateTime) {
        self.install(SidePanelSession::web_search(lookup, now));
        self.issue_recompute();
    }

    /// Open a recipe panel. No recompute: the recipe carries its own
    /// per-serving nutrition.
    pub fn open_recipe(&self, recipe: Arc<RecipeSuggestion>) {
        self.open_recipe_at(recipe, local_now());
    }

    pub fn open_recipe_at(&self, recipe: Arc<RecipeSuggestion>, now: OffsetDateTime) {
        self.install(SidePanelSession::recipe(recipe, now));
    }

    fn install(&self, session: SidePanelSession) {
        let mut st = self.lock();
        if let Some(prior) = st.teardown() {
            debug!(kind = prior.kind.as_str(), rows = prior.rows.len(), "panel: discarding prior session");
        }
        info!(kind = session.kind.as_str(), rows = session.rows.len(), "panel: opened");
        st.session = Some(session);
        drop(st);
        self.settled.notify_waiters();
    }

    /// Clear the session. Safe to call when nothing is open.
    pub fn close(&self) {
        let closed = self.lock().teardown();
        if let Some(session) = closed {
            info!(kind = session.kind.as_str(), "panel: closed");
        }
        self.settled.notify_waiters();
    }

    // -------------------------------------------------------------------------
    // edits
    // -------------------------------------------------------------------------

    /// Apply an edit to one row and schedule a debounced recompute.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`] or [`PanelError::RowOutOfRange`].
    pub fn edit_row(&self, index: usize, edit: RowEdit) -> Result<(), PanelError> {
        let mut st = self.lock();
        let session = st.session_mut()?;
        let len = session.rows.len();
        let row = session.rows.get_mut(index).ok_or(PanelError::RowOutOfRange { index, len })?;
        row.apply(edit);
        self.schedule_recompute(&mut st);
        Ok(())
    }

    /// Append a user-entered row with no server identity.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`], or [`PanelError::WrongKind`] on a recipe
    /// panel.
    pub fn add_row(&self, name: &str, grams: f64) -> Result<usize, PanelError> {
        let mut st = self.lock();
        st.expect_kind(PanelKind::Meal)?;
        let session = st.session_mut()?;
        session.rows.push(IngredientRow::new(name.trim(), grams, None));
        let index = session.rows.len() - 1;
        self.schedule_recompute(&mut st);
        Ok(index)
    }

    /// Delete a row and recompute immediately. A pending debounced
    /// recompute is folded into this one.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`] or [`PanelError::RowOutOfRange`].
    pub fn remove_row(&self, index: usize) -> Result<IngredientRow, PanelError> {
        let removed = {
            let mut st = self.lock();
            let session = st.session_mut()?;
            let len = session.rows.len();
            if index >= len {
                return Err(PanelError::RowOutOfRange { index, len });
            }
            let removed = session.rows.remove(index);
            st.cancel_timer();
            removed
        };
        self.issue_recompute();
        Ok(removed)
    }

    /// Explicit meal-type chip selection; overrides the time-of-day default.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`].
    pub fn set_meal_type(&self, meal_type: MealType) -> Result<(), PanelError> {
        self.lock().session_mut()?.meal_type = meal_type;
        Ok(())
    }

    /// # Errors
    ///
    /// [`PanelError::NoSession`].
    pub fn set_meal_date(&self, date: Date) -> Result<(), PanelError> {
        self.lock().session_mut()?.meal_date = date;
        Ok(())
    }

    /// # Errors
    ///
    /// [`PanelError::NoSession`].
    pub fn set_notes(&self, notes: &str) -> Result<(), PanelError> {
        notes.clone_into(&mut self.lock().session_mut()?.notes);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // recompute
    // -------------------------------------------------------------------------

    /// Recompute totals now. Returns the request task, or `None` when no
    /// request was needed (no session, or no valid rows, in which case the
    /// totals are set to zero).
    pub fn recompute(&self) -> Option<JoinHandle<()>> {
        self.issue_recompute()
    }

    fn issue_recompute(&self) -> Option<JoinHandle<()>> {
        let (seq, items) = {
            let mut guard = self.lock();
            let st = &mut *guard;
            let session = st.session.as_mut()?;
            let items = session.nutrition_items();
            st.latest_issued += 1;
            let seq = st.latest_issued;
            if items.is_empty() {
                session.last_computed = Some(NutritionTotals::zero());
                st.latest_settled = seq;
                debug!(seq, "recompute: no valid rows; totals zeroed");
                drop(guard);
                self.settled.notify_waiters();
                return None;
            }
            (seq, items)
        };

        debug!(seq, rows = items.len(), "recompute: issued");
        let engine = self.clone();
        Some(tokio::spawn(async move {
            let result = engine.backend.nutrition_totals(&items).await;
            engine.settle(seq, result);
        }))
    }

    fn settle(&self, seq: u64, result: Result<NutritionTotals, ApiError>) {
        {
            let mut st = self.lock();
            if seq != st.latest_issued {
                debug!(seq, latest = st.latest_issued, "recompute: stale response dropped");
                return;
            }
            st.latest_settled = seq;
            match result {
                Ok(totals) => {
                    if let Some(session) = st.session.as_mut() {
                        session.last_computed = Some(totals.rounded());
                        debug!(seq, calories = totals.calories, "recompute: totals updated");
                    }
                }
                Err(e) => {
                    warn!(seq, error = %e, code = e.error_code(), "recompute: request failed; keeping last totals");
                }
            }
        }
        self.settled.notify_waiters();
    }

    fn schedule_recompute(&self, st: &mut EngineState) {
        st.cancel_timer();
        let token = st.timer_token;
        let delay = self.debounce;
        let engine = self.clone();
        st.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            engine.fire_timer(token);
        }));
    }

    fn fire_timer(&self, token: u64) {
        {
            let mut st = self.lock();
            if st.timer_token != token {
                return;
            }
            st.timer = None;
        }
        self.issue_recompute();
    }

    // -------------------------------------------------------------------------
    // confirm
    // -------------------------------------------------------------------------

    /// Close the meal panel and submit its valid rows to the meal log.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`], or [`PanelError::WrongKind`] on a recipe
    /// panel (which stays open). Submission failures are not errors; see
    /// [`SubmitReceipt::accepted`].
    pub async fn confirm(&self) -> Result<SubmitReceipt, PanelError> {
        self.confirm_at(local_now()).await
    }

    /// [`Self::confirm`] with an explicit client timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`Self::confirm`].
    pub async fn confirm_at(&self, now: OffsetDateTime) -> Result<SubmitReceipt, PanelError> {
        let submission = {
            let mut st = self.lock();
            st.expect_kind(PanelKind::Meal)?;
            let Some(session) = st.teardown() else {
                return Err(PanelError::NoSession);
            };
            session.submission(now)
        };
        self.settled.notify_waiters();
        Ok(self.submit(submission).await)
    }

    /// Log the open recipe's ingredients as a meal, then close.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`], or [`PanelError::WrongKind`] on a meal
    /// panel (which stays open).
    pub async fn discard_recipe_as_meal(&self) -> Result<SubmitReceipt, PanelError> {
        self.discard_recipe_as_meal_at(local_now()).await
    }

    /// [`Self::discard_recipe_as_meal`] with an explicit client timestamp.
    ///
    /// # Errors
    ///
    /// Same as [`Self::discard_recipe_as_meal`].
    pub async fn discard_recipe_as_meal_at(&self, now: OffsetDateTime) -> Result<SubmitReceipt, PanelError> {
        let submission = {
            let mut st = self.lock();
            st.expect_kind(PanelKind::Recipe)?;
            let Some(submission) = st.session.as_ref().and_then(|s| s.recipe_submission(now)) else {
                return Err(PanelError::NoSession);
            };
            st.teardown();
            submission
        };
        self.settled.notify_waiters();
        Ok(self.submit(submission).await)
    }

    async fn submit(&self, submission: MealSubmission) -> SubmitReceipt {
        info!(
            items = submission.items.len(),
            meal_type = submission.meal_type.as_str(),
            meal_date = %submission.meal_date,
            "panel: submitting meal log"
        );
        let accepted = match self.backend.log_meal(&submission).await {
            Ok(ack) if ack.success == Some(false) => {
                warn!(message = ?ack.message, "panel: meal log refused; panel already closed");
                false
            }
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "panel: meal log failed; panel already closed");
                false
            }
        };
        SubmitReceipt { submission, accepted }
    }

    // -------------------------------------------------------------------------
    // read access
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().session.is_some()
    }

    #[must_use]
    pub fn kind(&self) -> Option<PanelKind> {
        self.lock().session.as_ref().map(|s| s.kind)
    }

    #[must_use]
    pub fn totals(&self) -> Option<NutritionTotals> {
        self.lock().session.as_ref().and_then(|s| s.last_computed)
    }

    /// `true` while a debounced recompute is pending or the latest issued
    /// recompute has not resolved yet.
    #[must_use]
    pub fn is_computing(&self) -> bool {
        let st = self.lock();
        st.session.is_some() && (st.timer.is_some() || st.latest_settled < st.latest_issued)
    }

    /// Wait until [`Self::is_computing`] is `false`: the pending debounce
    /// has fired and its request resolved, or the panel was closed.
    pub async fn settled(&self) {
        loop {
            let notified = self.settled.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_computing() {
                return;
            }
            notified.await;
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<SidePanelSession> {
        self.lock().session.clone()
    }

    /// Run `f` against the live session without cloning it.
    pub fn with_session<R>(&self, f: impl FnOnce(&SidePanelSession) -> R) -> Option<R> {
        self.lock().session.as_ref().map(f)
    }
}

/// Local wall-clock time, falling back to UTC when the offset is unknown.
#[must_use]
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
