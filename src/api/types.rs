//! API types: wire models for the nutrition assistant backend and errors.
//!
//! Shapes follow the backend JSON exactly (`snake_case`, `reply_html`,
//! `side_panel_data`, ...). Fields the backend fills loosely (numbers sent as
//! strings, times sent as numbers, `null` where a list or text belongs) go
//! through the `loose_*` and `null_default` helpers so a single odd field
//! never fails the whole response.

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The HTTP request could not be sent or the body could not be read.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The backend returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    ApiResponse { status: u16, body: String },

    /// The response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ApiError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::ApiRequest(_) | Self::ApiResponse { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// MEDIA
// =============================================================================

/// Binary payload uploaded as a multipart part (photo or voice clip).
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBlob")
            .field("file_name", &self.file_name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// =============================================================================
// INGREDIENTS
// =============================================================================

/// Opaque server-side ingredient identifier. The backend currently sends
/// integers; strings are accepted so the client never interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IngredientId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for IngredientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => f.write_str(id),
        }
    }
}

/// An ingredient detected by the meal analyzer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParsedItem {
    #[serde(alias = "name", deserialize_with = "loose_string")]
    pub ingredient_name: String,
    #[serde(default, deserialize_with = "loose_number")]
    pub grams: Option<f64>,
    #[serde(default, alias = "ingredientId")]
    pub ingredient_id: Option<IngredientId>,
}

// =============================================================================
// NUTRITION
// =============================================================================

/// Aggregate macro totals. Display-only on the client; never authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionTotals {
    #[serde(default, deserialize_with = "loose_f64")]
    pub calories: f64,
    #[serde(default, deserialize_with = "loose_f64")]
    pub protein: f64,
    #[serde(default, deserialize_with = "loose_f64")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "loose_f64")]
    pub fat: f64,
}

impl NutritionTotals {
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Round every field to one decimal place.
    #[must_use]
    pub fn rounded(self) -> Self {
        Self {
            calories: round1(self.calories),
            protein: round1(self.protein),
            carbs: round1(self.carbs),
            fat: round1(self.fat),
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One line of a nutrition-totals request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionItem {
    pub name: String,
    pub grams: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct NutritionRequest<'a> {
    pub items: &'a [NutritionItem],
}

/// Web-search nutrition record (legacy `nutrition_data`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NutritionLookup {
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub per_100g: Option<NutritionTotals>,
    #[serde(default, deserialize_with = "loose_text")]
    pub serving_size: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub confidence: Option<String>,
}

// =============================================================================
// RECIPES
// =============================================================================

/// A recipe proposed by the recipe agent. Read-only once received.
///
/// A failed generation still arrives in this shape, with `error` set and a
/// placeholder name; see [`RecipeSuggestion::is_failed`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeSuggestion {
    #[serde(rename = "recipe_name", alias = "name", default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_string")]
    pub description: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub prep_time: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub cook_time: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub servings: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub ingredients: Vec<RecipeIngredient>,
    #[serde(default, deserialize_with = "loose_text_list")]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub nutrition_per_serving: NutritionTotals,
    #[serde(default, deserialize_with = "loose_text_list")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub tips: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub error: Option<String>,
}

impl RecipeSuggestion {
    /// The recipe agent reported a generation failure instead of a recipe.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecipeIngredient {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: String,
    #[serde(default, deserialize_with = "loose_text")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "loose_number")]
    pub grams: Option<f64>,
}

// =============================================================================
// CHAT
// =============================================================================

/// Typed side-panel instruction (current schema).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SidePanelData {
    Meal {
        #[serde(default, deserialize_with = "null_default")]
        items: Vec<ParsedItem>,
    },
    Recipe {
        recipe: RecipeSuggestion,
    },
    /// Any other panel type; treated as absent.
    #[serde(other)]
    Unknown,
}

/// Raw chat response. Decode it once with [`crate::response::decode`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply_html: Option<String>,
    #[serde(default)]
    pub side_panel_data: Option<SidePanelData>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ParsedItem>>,
    #[serde(default)]
    pub recipe: Option<RecipeSuggestion>,
    #[serde(default)]
    pub nutrition_data: Option<NutritionLookup>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<String>,
}

/// One persisted conversation turn returned by the history endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryTurn {
    pub role: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "agent_name", alias = "agentName")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default, alias = "turns")]
    pub messages: Vec<HistoryTurn>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptResponse {
    #[serde(default)]
    pub text: Option<String>,
}

// =============================================================================
// MEAL LOG
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snack];

    /// Time-of-day default: before 11:00 breakfast, before 15:00 lunch,
    /// before 21:00 dinner, otherwise snack.
    #[must_use]
    pub fn for_hour(hour: u8) -> Self {
        match hour {
            0..=10 => Self::Breakfast,
            11..=14 => Self::Lunch,
            15..=20 => Self::Dinner,
            _ => Self::Snack,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
        }
    }
}

impl std::str::FromStr for MealType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            other => Err(format!("unknown meal type: {other}")),
        }
    }
}

/// One row of a meal-log submission. `ingredient_id` is present only while
/// the row still carries a valid identity binding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionItem {
    pub name: String,
    pub grams: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredient_id: Option<IngredientId>,
}

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Canonical confirm payload for the meal-log endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealSubmission {
    pub items: Vec<SubmissionItem>,
    pub notes: String,
    pub meal_type: MealType,
    #[serde(with = "iso_date")]
    pub meal_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub client_timestamp: OffsetDateTime,
}

/// Acknowledgement from the meal-log endpoint. Not used to gate UI state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LogAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// LOOSE FIELD HELPERS
// =============================================================================

fn loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn loose_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_text(deserializer)?.unwrap_or_default())
}

fn loose_text_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn loose_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?.unwrap_or(0.0))
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
