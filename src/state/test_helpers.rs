//! Shared fixtures for engine and controller tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use time::OffsetDateTime;
use time::macros::datetime;

use crate::api::NutriBackend;
use crate::api::types::{
    ApiError, ChatResponse, HistoryTurn, IngredientId, LogAck, MealSubmission, MediaBlob, NutritionItem,
    NutritionTotals, ParsedItem, RecipeIngredient, RecipeSuggestion,
};

/// Scripted nutrition reply: wait `delay`, then return `result`.
pub type ScriptedTotals = (Duration, Result<NutritionTotals, ApiError>);

/// In-memory `NutriBackend` that records every call.
///
/// Nutrition requests without a script entry answer immediately with
/// `calories = sum of grams`.
#[derive(Default)]
pub struct MockBackend {
    pub chat_replies: Mutex<VecDeque<Result<ChatResponse, ApiError>>>,
    pub chat_calls: Mutex<Vec<(String, Option<MediaBlob>)>>,
    pub history_turns: Mutex<Vec<HistoryTurn>>,
    pub history_fails: Mutex<bool>,
    pub clear_fails: Mutex<bool>,
    pub clear_calls: Mutex<usize>,
    pub nutrition_script: Mutex<VecDeque<ScriptedTotals>>,
    pub nutrition_calls: Mutex<Vec<Vec<NutritionItem>>>,
    pub log_fails: Mutex<bool>,
    pub log_calls: Mutex<Vec<MealSubmission>>,
    pub transcripts: Mutex<VecDeque<Result<Option<String>, ApiError>>>,
    pub transcribe_calls: Mutex<Vec<MediaBlob>>,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_chat(&self, reply: Result<ChatResponse, ApiError>) {
        self.chat_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_totals(&self, delay: Duration, result: Result<NutritionTotals, ApiError>) {
        self.nutrition_script.lock().unwrap().push_back((delay, result));
    }

    pub fn nutrition_call_count(&self) -> usize {
        self.nutrition_calls.lock().unwrap().len()
    }

    pub fn last_nutrition_call(&self) -> Option<Vec<NutritionItem>> {
        self.nutrition_calls.lock().unwrap().last().cloned()
    }

    pub fn logged(&self) -> Vec<MealSubmission> {
        self.log_calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl NutriBackend for MockBackend {
    async fn chat(&self, message: &str, image: Option<&MediaBlob>) -> Result<ChatResponse, ApiError> {
        self.chat_calls.lock().unwrap().push((message.to_string(), image.cloned()));
        let next = self.chat_replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(ChatResponse::default()))
    }

    async fn history(&self) -> Result<Vec<HistoryTurn>, ApiError> {
        if *self.history_fails.lock().unwrap() {
            return Err(ApiError::ApiResponse { status: 500, body: "boom".into() });
        }
        Ok(self.history_turns.lock().unwrap().clone())
    }

    async fn clear_history(&self) -> Result<(), ApiError> {
        *self.clear_calls.lock().unwrap() += 1;
        if *self.clear_fails.lock().unwrap() {
            return Err(ApiError::ApiRequest("connection refused".into()));
        }
        Ok(())
    }

    async fn nutrition_totals(&self, items: &[NutritionItem]) -> Result<NutritionTotals, ApiError> {
        self.nutrition_calls.lock().unwrap().push(items.to_vec());
        let scripted = self.nutrition_script.lock().unwrap().pop_front();
        match scripted {
            Some((delay, result)) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(NutritionTotals { calories: items.iter().map(|i| i.grams).sum(), ..NutritionTotals::zero() }),
        }
    }

    async fn log_meal(&self, submission: &MealSubmission) -> Result<LogAck, ApiError> {
        self.log_calls.lock().unwrap().push(submission.clone());
        if *self.log_fails.lock().unwrap() {
            return Err(ApiError::ApiResponse { status: 503, body: "unavailable".into() });
        }
        Ok(LogAck { success: Some(true), message: None })
    }

    async fn transcribe(&self, audio: &MediaBlob) -> Result<Option<String>, ApiError> {
        self.transcribe_calls.lock().unwrap().push(audio.clone());
        let next = self.transcripts.lock().unwrap().pop_front();
        next.unwrap_or(Ok(None))
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

/// Fixed local time: a Saturday lunch.
pub fn lunchtime() -> OffsetDateTime {
    datetime!(2026-10-18 12:30 UTC)
}

pub fn parsed(name: &str, grams: f64, id: Option<i64>) -> ParsedItem {
    ParsedItem { ingredient_name: name.into(), grams: Some(grams), ingredient_id: id.map(IngredientId::Int) }
}

pub fn rice_and_beans() -> Vec<ParsedItem> {
    vec![parsed("Rice", 150.0, Some(7)), parsed("Black Beans", 80.0, Some(12))]
}

pub fn oat_bowl() -> RecipeSuggestion {
    RecipeSuggestion {
        name: "Oat Bowl".into(),
        description: "Warm oats with fruit.".into(),
        prep_time: Some("5 min".into()),
        cook_time: Some("10 min".into()),
        servings: Some("2".into()),
        ingredients: vec![
            RecipeIngredient { name: "Rolled oats".into(), amount: Some("1 cup".into()), grams: Some(90.0) },
            RecipeIngredient { name: "Banana".into(), amount: Some("1".into()), grams: None },
        ],
        instructions: vec!["Simmer the oats.".into(), "Top with banana.".into()],
        nutrition_per_serving: NutritionTotals { calories: 320.0, protein: 9.5, carbs: 58.0, fat: 5.2 },
        tags: vec!["breakfast".into()],
        tips: Some("Use milk for creaminess.".into()),
        error: None,
    }
}

/// Let every spawned task and timer run to completion.
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(10)).await;
}
