//! Panel presentation shell: open/close flag and the rendered view model.
//!
//! The shell never mutates the session itself. It reads a snapshot from
//! [`PanelEngine`] into a [`PanelView`], and forwards chip selections back
//! through the engine.

use std::fmt;
use std::sync::Arc;

use time::Date;

use crate::api::types::{MealType, NutritionTotals, RecipeSuggestion};
use crate::engine::{PanelEngine, PanelError};
use crate::state::panel::{PanelKind, Provenance, SidePanelSession};

#[derive(Debug, Default)]
pub struct PanelShell {
    visible: bool,
}

impl PanelShell {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Refresh visibility from the engine and build the current view.
    pub fn sync(&mut self, engine: &PanelEngine) -> Option<PanelView> {
        let computing = engine.is_computing();
        let view = engine.with_session(|session| PanelView::from_session(session, computing));
        self.visible = view.is_some();
        view
    }

    /// Meal-type chip click. Overrides the time-of-day default.
    ///
    /// # Errors
    ///
    /// [`PanelError::NoSession`] when the panel is closed.
    pub fn select_meal_type(&self, engine: &PanelEngine, meal_type: MealType) -> Result<(), PanelError> {
        engine.set_meal_type(meal_type)
    }
}

// =============================================================================
// VIEW MODEL
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub index: usize,
    pub name: String,
    pub grams: f64,
    /// Row still carries its server ingredient identity.
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub kind: PanelKind,
    pub title: String,
    pub rows: Vec<RowView>,
    pub totals: Option<NutritionTotals>,
    pub meal_type: MealType,
    pub meal_date: Date,
    pub notes: String,
    pub computing: bool,
    pub provenance: Option<Provenance>,
    pub recipe: Option<Arc<RecipeSuggestion>>,
}

impl PanelView {
    #[must_use]
    pub fn from_session(session: &SidePanelSession, computing: bool) -> Self {
        let title = match (&session.recipe, &session.provenance) {
            (Some(recipe), _) => recipe.name.clone(),
            (None, Some(_)) => "Nutrition lookup".to_string(),
            (None, None) => "Review your meal".to_string(),
        };
        Self {
            kind: session.kind,
            title,
            rows: session
                .rows
                .iter()
                .enumerate()
                .map(|(index, row)| RowView {
                    index,
                    name: row.display_name.clone(),
                    grams: row.grams,
                    resolved: row.bound_ingredient_id().is_some(),
                })
                .collect(),
            totals: session.last_computed,
            meal_type: session.meal_type,
            meal_date: session.meal_date,
            notes: session.notes.clone(),
            computing,
            provenance: session.provenance.clone(),
            recipe: session.recipe.clone(),
        }
    }
}

#[must_use]
pub fn totals_line(totals: &NutritionTotals) -> String {
    format!(
        "{:.1} kcal | protein {:.1} g | carbs {:.1} g | fat {:.1} g",
        totals.calories, totals.protein, totals.carbs, totals.fat
    )
}

fn chips(selected: MealType) -> String {
    MealType::ALL
        .iter()
        .map(|&t| if t == selected { format!("[{}]", t.as_str()) } else { t.as_str().to_string() })
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.title)?;

        if let Some(recipe) = &self.recipe {
            write_recipe(f, recipe)?;
        } else {
            if self.rows.is_empty() {
                writeln!(f, "  (no ingredients)")?;
            }
            for row in &self.rows {
                let mark = if row.resolved { "  *" } else { "" };
                writeln!(f, "  [{}] {}  {} g{mark}", row.index, row.name, row.grams)?;
            }
            let pending = if self.computing { "  (updating...)" } else { "" };
            match &self.totals {
                Some(totals) => writeln!(f, "Totals: {}{pending}", totals_line(totals))?,
                None => writeln!(f, "Totals: -{pending}")?,
            }
            if let Some(p) = &self.provenance {
                let source = p.source.as_deref().unwrap_or("web search");
                match &p.confidence {
                    Some(confidence) => writeln!(f, "Source: {source} (confidence: {confidence})")?,
                    None => writeln!(f, "Source: {source}")?,
                }
                if let Some(serving) = &p.serving_size {
                    writeln!(f, "Serving size: {serving}")?;
                }
            }
        }

        writeln!(f, "Meal: {}   Date: {}", chips(self.meal_type), self.meal_date)?;
        if !self.notes.is_empty() {
            writeln!(f, "Notes: {}", self.notes)?;
        }
        Ok(())
    }
}

fn write_recipe(f: &mut fmt::Formatter<'_>, recipe: &RecipeSuggestion) -> fmt::Result {
    if !recipe.description.is_empty() {
        writeln!(f, "{}", recipe.description)?;
    }

    let mut facts = Vec::new();
    if let Some(prep) = &recipe.prep_time {
        facts.push(format!("Prep: {prep}"));
    }
    if let Some(cook) = &recipe.cook_time {
        facts.push(format!("Cook: {cook}"));
    }
    if let Some(servings) = &recipe.servings {
        facts.push(format!("Servings: {servings}"));
    }
    if !facts.is_empty() {
        writeln!(f, "{}", facts.join("  "))?;
    }

    writeln!(f, "Ingredients:")?;
    for ing in &recipe.ingredients {
        let amount = ing.amount.as_deref().map(|a| format!("{a} ")).unwrap_or_default();
        match ing.grams {
            Some(grams) => writeln!(f, "  - {amount}{} ({grams} g)", ing.name)?,
            None => writeln!(f, "  - {amount}{}", ing.name)?,
        }
    }

    if !recipe.instructions.is_empty() {
        writeln!(f, "Instructions:")?;
        for (i, step) in recipe.instructions.iter().enumerate() {
            writeln!(f, "  {}. {step}", i + 1)?;
        }
    }

    writeln!(f, "Per serving: {}", totals_line(&recipe.nutrition_per_serving))?;
    if !recipe.tags.is_empty() {
        writeln!(f, "Tags: {}", recipe.tags.join(", "))?;
    }
    if let Some(tips) = &recipe.tips {
        writeln!(f, "Tips: {tips}")?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
