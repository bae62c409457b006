//! Command parser - Turns console lines into room commands

use crate::application::errors::CommandError;
use crate::domain::entities::{MessageKind, UnknownKind};

/// A request against the room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomCommand {
    Register { name: String },
    Heartbeat { name: String },
    Participants,
    Post { from: String, to: String, kind: MessageKind, text: String },
    Messages { viewer: String, limit: Option<usize> },
    Sweep,
    Help,
    Quit,
}

/// Parses prefixed command lines, e.g. `/post Ana Bruno private_message oi`
pub struct CommandParser {
    command_prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    pub fn parse(&self, line: &str) -> Result<RoomCommand, CommandError> {
        let line = line.trim();
        let Some(cmd_text) = line.strip_prefix(self.command_prefix.as_str()) else {
            return Err(CommandError::InvalidArgs(format!(
                "commands start with '{}', try {}help",
                self.command_prefix, self.command_prefix
            )));
        };

        let mut parts = cmd_text.split_whitespace();
        let name = parts.next().unwrap_or("").to_lowercase();
        let args: Vec<&str> = parts.collect();

        match name.as_str() {
            "register" | "join" => Ok(RoomCommand::Register { name: single_arg(&name, &args)? }),
            "heartbeat" | "status" => Ok(RoomCommand::Heartbeat { name: single_arg(&name, &args)? }),
            "participants" | "who" => Ok(RoomCommand::Participants),
            "post" | "say" => self.parse_post(cmd_text, &args),
            "messages" | "read" => match args.as_slice() {
                [viewer] => Ok(RoomCommand::Messages { viewer: viewer.to_string(), limit: None }),
                [viewer, limit] => Ok(RoomCommand::Messages {
                    viewer: viewer.to_string(),
                    limit: parse_limit(limit),
                }),
                _ => Err(CommandError::InvalidArgs("usage: messages <viewer> [limit]".to_string())),
            },
            "sweep" => Ok(RoomCommand::Sweep),
            "help" => Ok(RoomCommand::Help),
            "quit" | "exit" => Ok(RoomCommand::Quit),
            "" => Err(CommandError::InvalidArgs("empty command".to_string())),
            other => Err(CommandError::NotFound(other.to_string())),
        }
    }

    fn parse_post(&self, cmd_text: &str, args: &[&str]) -> Result<RoomCommand, CommandError> {
        if args.len() < 4 {
            return Err(CommandError::InvalidArgs(
                "usage: post <from> <to> <message|private_message> <text>".to_string(),
            ));
        }

        let kind: MessageKind = args[2]
            .parse()
            .map_err(|e: UnknownKind| CommandError::InvalidArgs(e.to_string()))?;

        Ok(RoomCommand::Post {
            from: args[0].to_string(),
            to: args[1].to_string(),
            kind,
            // command word plus three arguments, the rest keeps its spacing
            text: skip_words(cmd_text, 4).to_string(),
        })
    }

    pub fn help(&self) -> String {
        let p = &self.command_prefix;
        format!(
            "Available commands:\n  {p}register <name>\n  {p}heartbeat <name>\n  {p}participants\n  {p}post <from> <to> <message|private_message> <text>\n  {p}messages <viewer> [limit]\n  {p}sweep\n  {p}quit"
        )
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Non-numeric or negative input means "no limit".
pub fn parse_limit(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}

fn skip_words(s: &str, n: usize) -> &str {
    let mut rest = s.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn single_arg(cmd: &str, args: &[&str]) -> Result<String, CommandError> {
    match args {
        [one] => Ok(one.to_string()),
        _ => Err(CommandError::InvalidArgs(format!("usage: {} <name>", cmd))),
    }
}
