use super::*;
use crate::api::types::RecipeIngredient;
use time::macros::{date, datetime};

fn rice() -> ParsedItem {
    ParsedItem { ingredient_name: "Rice".into(), grams: Some(150.0), ingredient_id: Some(IngredientId::Int(7)) }
}

fn lunchtime() -> OffsetDateTime {
    datetime!(2026-10-18 12:30:00 UTC)
}

// =============================================================================
// IngredientRow identity binding
// =============================================================================

#[test]
fn unedited_row_keeps_identity() {
    let row = IngredientRow::from_parsed(&rice());
    assert_eq!(row.bound_ingredient_id(), Some(&IngredientId::Int(7)));
    assert_eq!(row.original_name(), "Rice");
}

#[test]
fn case_only_rename_keeps_identity() {
    let mut row = IngredientRow::from_parsed(&rice());
    row.apply(RowEdit::Name(" rICE ".into()));
    assert_eq!(row.bound_ingredient_id(), Some(&IngredientId::Int(7)));
}

#[test]
fn rename_drops_identity() {
    let mut row = IngredientRow::from_parsed(&rice());
    row.apply(RowEdit::Name("Brown Rice".into()));
    assert!(row.bound_ingredient_id().is_none());
    assert_eq!(row.server_ingredient_id(), Some(&IngredientId::Int(7)));
}

#[test]
fn renaming_back_restores_identity() {
    let mut row = IngredientRow::from_parsed(&rice());
    row.apply(RowEdit::Name("Brown Rice".into()));
    row.apply(RowEdit::Name("rice".into()));
    assert_eq!(row.bound_ingredient_id(), Some(&IngredientId::Int(7)));
}

#[test]
fn negative_and_nan_grams_clamp_to_zero() {
    let mut row = IngredientRow::new("Egg", -5.0, None);
    assert_eq!(row.grams, 0.0);
    row.apply(RowEdit::Grams(f64::NAN));
    assert_eq!(row.grams, 0.0);
    row.apply(RowEdit::Grams(55.0));
    assert_eq!(row.grams, 55.0);
}

#[test]
fn submittable_requires_name_and_weight() {
    assert!(IngredientRow::new("Egg", 50.0, None).is_submittable());
    assert!(!IngredientRow::new("Egg", 0.0, None).is_submittable());
    assert!(!IngredientRow::new("   ", 50.0, None).is_submittable());
}

// =============================================================================
// SidePanelSession
// =============================================================================

#[test]
fn meal_session_defaults_from_clock() {
    let session = SidePanelSession::meal(&[rice()], lunchtime());
    assert_eq!(session.kind, PanelKind::Meal);
    assert_eq!(session.meal_type, MealType::Lunch);
    assert_eq!(session.meal_date, date!(2026 - 10 - 18));
    assert_eq!(session.rows.len(), 1);
    assert!(session.last_computed.is_none());
}

#[test]
fn meal_session_late_evening_is_snack() {
    let session = SidePanelSession::meal(&[], datetime!(2026-10-18 22:15:00 UTC));
    assert_eq!(session.meal_type, MealType::Snack);
}

#[test]
fn nutrition_items_skip_invalid_rows() {
    let items = vec![
        rice(),
        ParsedItem { ingredient_name: "Mystery".into(), grams: None, ingredient_id: None },
        ParsedItem { ingredient_name: String::new(), grams: Some(20.0), ingredient_id: None },
    ];
    let session = SidePanelSession::meal(&items, lunchtime());
    assert_eq!(session.rows.len(), 3);
    assert_eq!(session.nutrition_items(), vec![NutritionItem { name: "Rice".into(), grams: 150.0 }]);
}

#[test]
fn submission_unedited_echoes_identity() {
    let session = SidePanelSession::meal(&[rice()], lunchtime());
    let submission = session.submission(lunchtime());
    assert_eq!(
        submission.items,
        vec![SubmissionItem { name: "Rice".into(), grams: 150.0, ingredient_id: Some(IngredientId::Int(7)) }]
    );
    assert_eq!(submission.meal_type, MealType::Lunch);
    assert_eq!(submission.client_timestamp, lunchtime());
}

#[test]
fn submission_after_rename_omits_identity() {
    let mut session = SidePanelSession::meal(&[rice()], lunchtime());
    session.rows[0].apply(RowEdit::Name("Brown Rice".into()));
    let submission = session.submission(lunchtime());
    assert_eq!(submission.items, vec![SubmissionItem { name: "Brown Rice".into(), grams: 150.0, ingredient_id: None }]);
}

#[test]
fn web_search_session_has_single_default_row() {
    let lookup = NutritionLookup {
        found: true,
        food_name: Some("Greek Yogurt".into()),
        per_100g: Some(NutritionTotals { calories: 97.0, protein: 9.0, carbs: 3.6, fat: 5.0 }),
        serving_size: Some("170g".into()),
        source: Some("USDA".into()),
        confidence: Some("high".into()),
    };
    let session = SidePanelSession::web_search(&lookup, lunchtime());
    assert_eq!(session.kind, PanelKind::Meal);
    assert_eq!(session.rows.len(), 1);
    assert_eq!(session.rows[0].display_name, "Greek Yogurt");
    assert_eq!(session.rows[0].grams, DEFAULT_GRAMS);
    assert!(session.rows[0].server_ingredient_id().is_none());
    assert_eq!(session.provenance.as_ref().and_then(|p| p.confidence.as_deref()), Some("high"));
}

// =============================================================================
// recipe_submission
// =============================================================================

fn soup() -> Arc<RecipeSuggestion> {
    Arc::new(RecipeSuggestion {
        name: "Lentil Soup".into(),
        ingredients: vec![
            RecipeIngredient { name: "Lentils".into(), amount: Some("1 cup".into()), grams: Some(200.0) },
            RecipeIngredient { name: "Cumin".into(), amount: Some("1 tsp".into()), grams: None },
        ],
        ..RecipeSuggestion::default()
    })
}

#[test]
fn recipe_submission_defaults_missing_grams() {
    let session = SidePanelSession::recipe(soup(), lunchtime());
    let submission = session.recipe_submission(lunchtime()).unwrap();
    assert_eq!(
        submission.items,
        vec![
            SubmissionItem { name: "Lentils".into(), grams: 200.0, ingredient_id: None },
            SubmissionItem { name: "Cumin".into(), grams: DEFAULT_GRAMS, ingredient_id: None },
        ]
    );
    assert_eq!(submission.notes, "Recipe: Lentil Soup");
}

#[test]
fn recipe_submission_keeps_user_notes() {
    let mut session = SidePanelSession::recipe(soup(), lunchtime());
    session.notes = "half portion".into();
    let submission = session.recipe_submission(lunchtime()).unwrap();
    assert_eq!(submission.notes, "Recipe: Lentil Soup. half portion");
}

#[test]
fn recipe_submission_absent_for_meal_sessions() {
    let session = SidePanelSession::meal(&[rice()], lunchtime());
    assert!(session.recipe_submission(lunchtime()).is_none());
}
