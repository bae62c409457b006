//! Command handling - Console request surface plumbing

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{CommandDispatcher, MessageView, Reply};
pub use parser::{parse_limit, CommandParser, RoomCommand};
