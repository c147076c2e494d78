//! Chat response decoding: one pass from wire shape to a closed variant set.
//!
//! DESIGN
//! ======
//! The backend has two schemas for "open a side panel": the typed
//! `side_panel_data` instruction and an older category-plus-payload shape.
//! [`decode`] resolves both into a [`PanelSignal`] exactly once so nothing
//! downstream sniffs raw fields. The typed instruction always wins; the
//! legacy branch is consulted only when it is absent. A recipe carrying an
//! `error` is a failed generation and never opens a panel.

use crate::api::types::{ChatResponse, NutritionLookup, ParsedItem, RecipeSuggestion, SidePanelData};

const CATEGORY_ANALYZE_MEAL: &str = "analyze_meal";
const CATEGORY_RECIPE: &str = "recipe_generation";
const CATEGORY_WEB_SEARCH: &str = "web_search";

/// Typed side-panel instruction (current schema).
#[derive(Debug, Clone, PartialEq)]
pub enum PanelInstruction {
    Meal(Vec<ParsedItem>),
    Recipe(RecipeSuggestion),
}

/// What, if anything, the response asks the side panel to do.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelSignal {
    Instruction(PanelInstruction),
    LegacyAnalysis(Vec<ParsedItem>),
    LegacyRecipe(RecipeSuggestion),
    LegacyWebSearch(NutritionLookup),
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReply {
    /// Non-empty rendered reply markup.
    pub reply: Option<String>,
    pub panel: PanelSignal,
}

#[must_use]
pub fn decode(response: ChatResponse) -> DecodedReply {
    let reply = response
        .reply_html
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned);

    let panel = match response.side_panel_data {
        Some(SidePanelData::Meal { items }) => PanelSignal::Instruction(PanelInstruction::Meal(items)),
        Some(SidePanelData::Recipe { recipe }) if recipe.is_failed() => PanelSignal::None,
        Some(SidePanelData::Recipe { recipe }) => PanelSignal::Instruction(PanelInstruction::Recipe(recipe)),
        Some(SidePanelData::Unknown) | None => {
            legacy_signal(response.category.as_deref(), response.items, response.recipe, response.nutrition_data)
        }
    };

    DecodedReply { reply, panel }
}

fn legacy_signal(
    category: Option<&str>,
    items: Option<Vec<ParsedItem>>,
    recipe: Option<RecipeSuggestion>,
    nutrition: Option<NutritionLookup>,
) -> PanelSignal {
    match category {
        Some(CATEGORY_ANALYZE_MEAL) => match items {
            Some(items) if !items.is_empty() => PanelSignal::LegacyAnalysis(items),
            _ => PanelSignal::None,
        },
        Some(CATEGORY_RECIPE) => match recipe {
            Some(recipe) if !recipe.is_failed() => PanelSignal::LegacyRecipe(recipe),
            _ => PanelSignal::None,
        },
        Some(CATEGORY_WEB_SEARCH) => match nutrition {
            Some(lookup) if lookup.found && lookup.per_100g.is_some() => PanelSignal::LegacyWebSearch(lookup),
            _ => PanelSignal::None,
        },
        _ => PanelSignal::None,
    }
}

#[cfg(test)]
#[path = "response_test.rs"]
mod tests;
