pub mod admin;
pub mod participant;

use crate::models::{ItemId, Mode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantCommand {
    Toggle(ItemId),
    Name(String),
    Board,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Label { id: ItemId, label: String },
    Reset,
    SetMode(Mode),
    Finalize,
    History,
    Delete(i64),
    Board,
    Help,
    Quit,
}

pub const PARTICIPANT_HELP: &str = "Commands: <item id> toggle a vote | name <your name> | board | help | quit";

pub const ADMIN_HELP: &str = "Commands: label <id> <text> | reset | mode single|multiple | finalize | history | delete <history id> | board | help | quit";

pub fn parse_participant(line: &str) -> Result<ParticipantCommand, String> {
    let line = line.trim();
    let (word, rest) = split_word(line);

    if let Ok(id) = word.parse::<ItemId>() {
        return Ok(ParticipantCommand::Toggle(id));
    }

    match word.to_ascii_lowercase().as_str() {
        "name" if !rest.is_empty() => Ok(ParticipantCommand::Name(rest.to_string())),
        "name" => Err("Usage: name <your name>".to_string()),
        "board" | "" => Ok(ParticipantCommand::Board),
        "help" | "?" => Ok(ParticipantCommand::Help),
        "quit" | "exit" => Ok(ParticipantCommand::Quit),
        other => Err(format!("Unknown command '{}'. {}", other, PARTICIPANT_HELP)),
    }
}

pub fn parse_admin(line: &str) -> Result<AdminCommand, String> {
    let line = line.trim();
    let (word, rest) = split_word(line);

    match word.to_ascii_lowercase().as_str() {
        "label" => {
            let (id, label) = split_word(rest);
            let id = id.parse::<ItemId>().map_err(|_| "Usage: label <id> <text>".to_string())?;
            if label.is_empty() {
                return Err("Usage: label <id> <text>".to_string());
            }
            Ok(AdminCommand::Label {
                id,
                label: label.to_string(),
            })
        }
        "reset" | "clear" => Ok(AdminCommand::Reset),
        "mode" => rest.parse::<Mode>().map(AdminCommand::SetMode),
        "finalize" | "end" => Ok(AdminCommand::Finalize),
        "history" => Ok(AdminCommand::History),
        "delete" => rest
            .parse::<i64>()
            .map(AdminCommand::Delete)
            .map_err(|_| "Usage: delete <history id>".to_string()),
        "board" | "" => Ok(AdminCommand::Board),
        "help" | "?" => Ok(AdminCommand::Help),
        "quit" | "exit" => Ok(AdminCommand::Quit),
        other => Err(format!("Unknown command '{}'. {}", other, ADMIN_HELP)),
    }
}

pub fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn split_word(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    }
}
