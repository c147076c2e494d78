//! Terminal front end: slash-command parsing and execution.
//!
//! Plain lines are chat messages. Lines starting with `/` drive the image
//! slot, the voice toggle, history, and the side panel. Output is written
//! to a `String` so the binary decides where it goes.

use std::fmt::Write as _;
use std::path::PathBuf;

use time::Date;
use time::macros::format_description;

use crate::api::types::MealType;
use crate::controller::{ConversationController, SendOutcome, VoiceOutcome};
use crate::engine::{PanelError, SubmitReceipt};
use crate::media::ImageAttachment;
use crate::shell::PanelShell;
use crate::state::messages::{ChatTurn, Role, TurnBody};
use crate::state::panel::RowEdit;

pub const HELP: &str = "\
Type a message to chat. Commands:
  /image <path>             attach a photo to the next message
  /clear-image              drop the pending photo
  /voice                    start or stop voice recording
  /history                  reload conversation history
  /clear-history            delete conversation history
  /panel                    show the side panel
  /edit <row> name <text>   rename an ingredient
  /edit <row> grams <n>     change an ingredient weight
  /add <grams> <name>       add an ingredient
  /remove <row>             remove an ingredient
  /meal <type>              breakfast, lunch, dinner or snack
  /date <YYYY-MM-DD>        set the meal date
  /notes <text>             set meal notes
  /confirm                  log the meal
  /log-recipe               log the open recipe as a meal
  /close                    close the side panel
  /help                     show this help
  /quit                     exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Say(String),
    AttachImage(PathBuf),
    ClearImage,
    Voice,
    History,
    ClearHistory,
    ShowPanel,
    Edit { row: usize, edit: RowEdit },
    Add { grams: f64, name: String },
    Remove(usize),
    Meal(MealType),
    Date(Date),
    Notes(String),
    Confirm,
    LogRecipe,
    Close,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command: /{0} (try /help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line. Empty lines parse to `Ok(None)`.
///
/// # Errors
///
/// [`ParseError`] for unknown commands or malformed arguments.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Say(line.to_string())));
    };

    let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let args = args.trim();
    let command = match name {
        "image" if !args.is_empty() => Command::AttachImage(PathBuf::from(args)),
        "image" => return Err(ParseError::Usage("/image <path>")),
        "clear-image" => Command::ClearImage,
        "voice" => Command::Voice,
        "history" => Command::History,
        "clear-history" => Command::ClearHistory,
        "panel" => Command::ShowPanel,
        "edit" => parse_edit(args)?,
        "add" => parse_add(args)?,
        "remove" => Command::Remove(args.parse().map_err(|_| ParseError::Usage("/remove <row>"))?),
        "meal" => Command::Meal(args.parse().map_err(|_| ParseError::Usage("/meal breakfast|lunch|dinner|snack"))?),
        "date" => {
            let format = format_description!("[year]-[month]-[day]");
            Command::Date(Date::parse(args, format).map_err(|_| ParseError::Usage("/date YYYY-MM-DD"))?)
        }
        "notes" => Command::Notes(args.to_string()),
        "confirm" => Command::Confirm,
        "log-recipe" => Command::LogRecipe,
        "close" => Command::Close,
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_edit(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/edit <row> name <text> | /edit <row> grams <n>";
    let mut parts = args.splitn(3, char::is_whitespace);
    let row = parts.next().and_then(|r| r.parse().ok()).ok_or(ParseError::Usage(USAGE))?;
    let field = parts.next().ok_or(ParseError::Usage(USAGE))?;
    let value = parts.next().map(str::trim).unwrap_or_default();
    let edit = match field {
        "name" => RowEdit::Name(value.to_string()),
        "grams" => RowEdit::Grams(value.parse().map_err(|_| ParseError::Usage(USAGE))?),
        _ => return Err(ParseError::Usage(USAGE)),
    };
    Ok(Command::Edit { row, edit })
}

fn parse_add(args: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "/add <grams> <name>";
    let (grams, name) = args.split_once(char::is_whitespace).ok_or(ParseError::Usage(USAGE))?;
    let grams = grams.parse().map_err(|_| ParseError::Usage(USAGE))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::Usage(USAGE));
    }
    Ok(Command::Add { grams, name: name.to_string() })
}

// =============================================================================
// EXECUTION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Run one command against the controller, appending user-facing output.
pub async fn execute(
    ctl: &mut ConversationController,
    shell: &mut PanelShell,
    command: Command,
    out: &mut String,
) -> Flow {
    match command {
        Command::Say(text) => {
            let before = ctl.log().len();
            match ctl.submit(&text).await {
                Ok(outcome) => report_send(ctl, shell, before, outcome, out),
                Err(e) => line(out, &e.to_string()),
            }
        }
        Command::AttachImage(path) => match ImageAttachment::from_path(&path).await {
            Ok(image) => {
                line(out, &format!("attached {}", image.blob().file_name));
                ctl.attachments_mut().select(image);
            }
            Err(e) => line(out, &e.alert_message()),
        },
        Command::ClearImage => {
            ctl.attachments_mut().clear();
            line(out, "attachment cleared");
        }
        Command::Voice => {
            let before = ctl.log().len();
            match ctl.voice_toggle().await {
                Ok(VoiceOutcome::Recording) => line(out, "recording... /voice again to stop"),
                Ok(VoiceOutcome::Sent(outcome)) => report_send(ctl, shell, before, outcome, out),
                Ok(VoiceOutcome::NoSpeech) => line(out, "no speech detected"),
                Ok(VoiceOutcome::TranscriptionFailed) => line(out, "could not transcribe that recording"),
                Err(e) => line(out, &e.alert_message()),
            }
        }
        Command::History => match ctl.load_history().await {
            Ok(_) => {
                for turn in &ctl.log().turns()[1..] {
                    write_turn(out, turn);
                }
            }
            Err(e) => line(out, &format!("could not load history: {e}")),
        },
        Command::ClearHistory => match ctl.clear_history().await {
            Ok(()) => line(out, "history cleared"),
            Err(e) => line(out, &format!("could not clear history: {e}")),
        },
        Command::ShowPanel => show_panel(ctl, shell, out),
        Command::Edit { row, edit } => {
            let result = ctl.engine().edit_row(row, edit);
            panel_result(ctl, shell, result, out);
        }
        Command::Add { grams, name } => {
            let result = ctl.engine().add_row(&name, grams).map(|_| ());
            panel_result(ctl, shell, result, out);
        }
        Command::Remove(row) => {
            let result = ctl.engine().remove_row(row).map(|_| ());
            panel_result(ctl, shell, result, out);
        }
        Command::Meal(meal_type) => {
            let result = shell.select_meal_type(ctl.engine(), meal_type);
            panel_result(ctl, shell, result, out);
        }
        Command::Date(date) => {
            let result = ctl.engine().set_meal_date(date);
            panel_result(ctl, shell, result, out);
        }
        Command::Notes(notes) => {
            let result = ctl.engine().set_notes(&notes);
            panel_result(ctl, shell, result, out);
        }
        Command::Confirm => {
            let result = ctl.engine().confirm().await;
            report_receipt(shell, ctl, result, out);
        }
        Command::LogRecipe => {
            let result = ctl.engine().discard_recipe_as_meal().await;
            report_receipt(shell, ctl, result, out);
        }
        Command::Close => {
            ctl.engine().close();
            shell.sync(ctl.engine());
            line(out, "panel closed");
        }
        Command::Help => line(out, HELP),
        Command::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn line(out: &mut String, text: &str) {
    let _ = writeln!(out, "{text}");
}

/// Append one turn as `who> text`.
pub fn write_turn(out: &mut String, turn: &ChatTurn) {
    let who = match turn.role {
        Role::User => "you",
        Role::Assistant => "assistant",
    };
    let text = match &turn.body {
        TurnBody::Text(text) => text.clone(),
        TurnBody::Markup(markup) => plain_text(markup),
    };
    line(out, &format!("{who}> {text}"));
}

fn report_send(
    ctl: &ConversationController,
    shell: &mut PanelShell,
    before: usize,
    outcome: SendOutcome,
    out: &mut String,
) {
    for turn in ctl.log().turns().iter().skip(before).filter(|t| t.role == Role::Assistant) {
        write_turn(out, turn);
    }
    if let SendOutcome::Answered { panel: Some(_), .. } = outcome {
        show_panel(ctl, shell, out);
    }
}

fn show_panel(ctl: &ConversationController, shell: &mut PanelShell, out: &mut String) {
    match shell.sync(ctl.engine()) {
        Some(view) => out.push_str(&view.to_string()),
        None => line(out, "no panel open"),
    }
}

fn panel_result(
    ctl: &ConversationController,
    shell: &mut PanelShell,
    result: Result<(), PanelError>,
    out: &mut String,
) {
    match result {
        Ok(()) => show_panel(ctl, shell, out),
        Err(e) => line(out, &e.to_string()),
    }
}

fn report_receipt(
    shell: &mut PanelShell,
    ctl: &ConversationController,
    result: Result<SubmitReceipt, PanelError>,
    out: &mut String,
) {
    shell.sync(ctl.engine());
    match result {
        Ok(receipt) if receipt.accepted => {
            let submission = &receipt.submission;
            line(out, &format!("logged {} item(s) as {}", submission.items.len(), submission.meal_type.as_str()));
        }
        Ok(_) => line(out, "the meal log could not be saved"),
        Err(e) => line(out, &e.to_string()),
    }
}

/// Strip tags and decode the common entities from reply markup.
#[must_use]
pub fn plain_text(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                if !text.ends_with(' ') && !text.is_empty() {
                    text.push(' ');
                }
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
#[path = "repl_test.rs"]
mod tests;
