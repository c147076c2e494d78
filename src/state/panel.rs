//! Side-panel session model: editable ingredient rows and submission shaping.
//!
//! DESIGN
//! ======
//! Pure data. The session knows how to turn itself into a recompute request
//! or a confirm payload but never performs I/O; `engine::PanelEngine` owns
//! the single live session and drives the network side.
//!
//! Identity binding: a row carries the server's ingredient id only while its
//! display name still matches (case-insensitively) the name it was created
//! with. Renaming a row turns it into an unresolved ingredient on submit.

use std::sync::Arc;

use time::{Date, OffsetDateTime};

use crate::api::types::{
    IngredientId, MealSubmission, MealType, NutritionItem, NutritionLookup, NutritionTotals, ParsedItem,
    RecipeSuggestion, SubmissionItem,
};

/// Grams assumed for recipe ingredients and web-search hits without a weight.
pub const DEFAULT_GRAMS: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Meal,
    Recipe,
}

impl PanelKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Recipe => "recipe",
        }
    }
}

/// A user edit applied to one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEdit {
    Name(String),
    Grams(f64),
}

// =============================================================================
// INGREDIENT ROW
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct IngredientRow {
    pub display_name: String,
    pub grams: f64,
    original_name: String,
    server_ingredient_id: Option<IngredientId>,
}

impl IngredientRow {
    #[must_use]
    pub fn new(name: impl Into<String>, grams: f64, server_ingredient_id: Option<IngredientId>) -> Self {
        let name = name.into();
        Self { original_name: name.clone(), display_name: name, grams: clamp_grams(grams), server_ingredient_id }
    }

    #[must_use]
    pub fn from_parsed(item: &ParsedItem) -> Self {
        Self::new(item.ingredient_name.trim(), item.grams.unwrap_or(0.0), item.ingredient_id.clone())
    }

    #[must_use]
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    #[must_use]
    pub fn server_ingredient_id(&self) -> Option<&IngredientId> {
        self.server_ingredient_id.as_ref()
    }

    /// The server id, but only while the identity binding still holds.
    #[must_use]
    pub fn bound_ingredient_id(&self) -> Option<&IngredientId> {
        if names_match(&self.display_name, &self.original_name) {
            self.server_ingredient_id.as_ref()
        } else {
            None
        }
    }

    /// Rows with no name or no positive weight are left out of recompute
    /// requests and submissions.
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        self.grams > 0.0 && !self.display_name.trim().is_empty()
    }

    pub fn apply(&mut self, edit: RowEdit) {
        match edit {
            RowEdit::Name(name) => self.display_name = name,
            RowEdit::Grams(grams) => self.grams = clamp_grams(grams),
        }
    }

    fn nutrition_item(&self) -> NutritionItem {
        NutritionItem { name: self.display_name.trim().to_string(), grams: self.grams }
    }

    fn submission_item(&self) -> SubmissionItem {
        SubmissionItem {
            name: self.display_name.trim().to_string(),
            grams: self.grams,
            ingredient_id: self.bound_ingredient_id().cloned(),
        }
    }
}

fn clamp_grams(grams: f64) -> f64 {
    if grams.is_finite() && grams > 0.0 { grams } else { 0.0 }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

// =============================================================================
// SESSION
// =============================================================================

/// Where a single-row meal synthesized from a web search came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub source: Option<String>,
    pub confidence: Option<String>,
    pub serving_size: Option<String>,
}

/// The single active side-panel editing session.
#[derive(Debug, Clone, PartialEq)]
pub struct SidePanelSession {
    pub kind: PanelKind,
    pub rows: Vec<IngredientRow>,
    pub meal_type: MealType,
    pub meal_date: Date,
    pub notes: String,
    pub last_computed: Option<NutritionTotals>,
    pub recipe: Option<Arc<RecipeSuggestion>>,
    pub provenance: Option<Provenance>,
}

impl SidePanelSession {
    /// Meal session from analyzer items, defaulted for the given local time.
    #[must_use]
    pub fn meal(items: &[ParsedItem], now: OffsetDateTime) -> Self {
        Self {
            kind: PanelKind::Meal,
            rows: items.iter().map(IngredientRow::from_parsed).collect(),
            meal_type: MealType::for_hour(now.hour()),
            meal_date: now.date(),
            notes: String::new(),
            last_computed: None,
            recipe: None,
            provenance: None,
        }
    }

    /// Single-row meal session for a web-search nutrition hit.
    #[must_use]
    pub fn web_search(lookup: &NutritionLookup, now: OffsetDateTime) -> Self {
        let name = lookup.food_name.clone().unwrap_or_default();
        let mut session = Self::meal(&[], now);
        session.rows.push(IngredientRow::new(name.trim(), DEFAULT_GRAMS, None));
        session.provenance = Some(Provenance {
            source: lookup.source.clone(),
            confidence: lookup.confidence.clone(),
            serving_size: lookup.serving_size.clone(),
        });
        session
    }

    /// Recipe session. Rows stay empty; the recipe's ingredient list is
    /// converted only when the user logs it as a meal.
    #[must_use]
    pub fn recipe(recipe: Arc<RecipeSuggestion>, now: OffsetDateTime) -> Self {
        Self {
            kind: PanelKind::Recipe,
            rows: Vec::new(),
            meal_type: MealType::for_hour(now.hour()),
            meal_date: now.date(),
            notes: String::new(),
            last_computed: None,
            recipe: Some(recipe),
            provenance: None,
        }
    }

    pub fn valid_rows(&self) -> impl Iterator<Item = &IngredientRow> {
        self.rows.iter().filter(|row| row.is_submittable())
    }

    #[must_use]
    pub fn nutrition_items(&self) -> Vec<NutritionItem> {
        self.valid_rows().map(IngredientRow::nutrition_item).collect()
    }

    /// Confirm payload built from the current valid rows.
    #[must_use]
    pub fn submission(&self, now: OffsetDateTime) -> MealSubmission {
        MealSubmission {
            items: self.valid_rows().map(IngredientRow::submission_item).collect(),
            notes: self.notes.trim().to_string(),
            meal_type: self.meal_type,
            meal_date: self.meal_date,
            client_timestamp: now,
        }
    }

    /// Log-as-meal payload built from the recipe's ingredient list, with the
    /// recipe name tagged into the notes. `None` for meal sessions.
    #[must_use]
    pub fn recipe_submission(&self, now: OffsetDateTime) -> Option<MealSubmission> {
        let recipe = self.recipe.as_ref()?;
        let items = recipe
            .ingredients
            .iter()
            .map(|ing| IngredientRow::new(ing.name.trim(), ing.grams.unwrap_or(DEFAULT_GRAMS), None))
            .filter(IngredientRow::is_submittable)
            .map(|row| row.submission_item())
            .collect();
        let tag = format!("Recipe: {}", recipe.name.trim());
        let notes = match self.notes.trim() {
            "" => tag,
            user => format!("{tag}. {user}"),
        };
        Some(MealSubmission {
            items,
            notes,
            meal_type: self.meal_type,
            meal_date: self.meal_date,
            client_timestamp: now,
        })
    }
}

#[cfg(test)]
#[path = "panel_test.rs"]
mod tests;
