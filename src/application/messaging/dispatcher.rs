//! Command dispatcher - Runs parsed commands against the room

use serde::Serialize;

use super::parser::{CommandParser, RoomCommand};
use crate::application::errors::ChatError;
use crate::application::services::ChatRoom;
use crate::domain::entities::{Message, Participant};

/// Outcome of one console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

/// Wire shape of a message: the kind travels as `type` and the time as
/// `HH:MM:SS`.
#[derive(Debug, Serialize)]
pub struct MessageView<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub text: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub time: String,
}

impl<'a> From<&'a Message> for MessageView<'a> {
    fn from(m: &'a Message) -> Self {
        Self {
            from: &m.from,
            to: &m.to,
            text: &m.text,
            kind: m.kind.as_str(),
            time: m.sent_at.format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ParticipantView<'a> {
    name: &'a str,
}

impl<'a> From<&'a Participant> for ParticipantView<'a> {
    fn from(p: &'a Participant) -> Self {
        Self { name: &p.name }
    }
}

pub struct CommandDispatcher {
    parser: CommandParser,
    room: ChatRoom,
}

impl CommandDispatcher {
    pub fn new(room: ChatRoom) -> Self {
        Self {
            parser: CommandParser::default(),
            room,
        }
    }

    pub fn with_parser(mut self, parser: CommandParser) -> Self {
        self.parser = parser;
        self
    }

    /// Parses and runs one line. Business outcomes are rendered as text.
    pub async fn process_line(&self, line: &str) -> Reply {
        let command = match self.parser.parse(line) {
            Ok(cmd) => cmd,
            Err(e) => return Reply::Text(format!("Error: {}", e)),
        };

        match self.dispatch(command).await {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_transient() {
                    tracing::warn!("Request failed: {}", e);
                }
                Reply::Text(format!("Error: {}", e))
            }
        }
    }

    pub async fn dispatch(&self, command: RoomCommand) -> Result<Reply, ChatError> {
        let text = match command {
            RoomCommand::Register { name } => {
                self.room.register(&name).await?;
                "Accepted".to_string()
            }
            RoomCommand::Heartbeat { name } => {
                self.room.heartbeat(&name).await?;
                "Accepted".to_string()
            }
            RoomCommand::Participants => {
                let participants = self.room.list_participants().await?;
                let views: Vec<ParticipantView> = participants.iter().map(ParticipantView::from).collect();
                to_json(&views)
            }
            RoomCommand::Post { from, to, kind, text } => {
                self.room.post_message(&from, &to, &text, kind).await?;
                "Accepted".to_string()
            }
            RoomCommand::Messages { viewer, limit } => {
                let messages = self.room.get_messages(&viewer, limit).await?;
                let views: Vec<MessageView> = messages.iter().map(MessageView::from).collect();
                to_json(&views)
            }
            RoomCommand::Sweep => match self.room.sweeper().sweep().await {
                Some(report) => format!(
                    "Evicted: [{}], spared: [{}], failed: [{}], pending: {}",
                    report.evicted.join(", "),
                    report.spared.join(", "),
                    report.failed.join(", "),
                    report.pending_announcements
                ),
                None => "Sweep already running".to_string(),
            },
            RoomCommand::Help => self.parser.help(),
            RoomCommand::Quit => return Ok(Reply::Quit),
        };
        Ok(Reply::Text(text))
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("Error: {}", e))
}
