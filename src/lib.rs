//! nutrichat: client for a conversational nutrition-logging assistant.
//!
//! DESIGN
//! ======
//! Chat turns go out through [`controller::ConversationController`]; replies
//! are decoded once by [`response::decode`] and either appended to the
//! message log or handed to [`engine::PanelEngine`], which owns the editable
//! side panel. The engine keeps nutrition totals fresh with debounced,
//! last-write-wins recompute requests and turns the panel into a meal-log
//! submission on confirm. [`shell`] renders the panel; [`repl`] is the
//! terminal front end used by the `nutrichat` binary.
//!
//! All backend access goes through [`api::NutriBackend`].

pub mod api;
pub mod controller;
pub mod engine;
pub mod media;
pub mod repl;
pub mod response;
pub mod shell;
pub mod state;
