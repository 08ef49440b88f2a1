//! Console stand-in for a game server
//!
//! Input lines:
//! - `name: message` sends a chat message as `name`
//! - `/join name` and `/quit name` drive the sender lifecycle
//! - `/stats` prints the moderation counters
//!
//! Senders that chat without joining are joined implicitly.

use breeze_handler::{HandlerInput, HandlerOutput, Moderator, Participant};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat { name: String, message: String },
    Join(String),
    Quit(String),
    Stats,
}

/// Parse an input line; blank or unrecognized lines yield an error message
pub fn parse_line(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }

    if let Some(rest) = line.strip_prefix('/') {
        let mut parts = rest.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let name = parts.next().map(str::to_string);
        return match (command, name) {
            ("join", Some(name)) => Ok(Some(Command::Join(name))),
            ("quit", Some(name)) => Ok(Some(Command::Quit(name))),
            ("stats", _) => Ok(Some(Command::Stats)),
            _ => Err(format!("unknown command: /{}", rest.trim())),
        };
    }

    match line.split_once(':') {
        Some((name, message)) if !name.trim().is_empty() => Ok(Some(Command::Chat {
            name: name.trim().to_string(),
            message: message.strip_prefix(' ').unwrap_or(message).to_string(),
        })),
        _ => Err("expected `name: message`".to_string()),
    }
}

/// A console participant; private notices go to a shared outbox
pub struct ConsolePlayer {
    name: String,
    outbox: Arc<Mutex<Vec<String>>>,
}

impl Participant for ConsolePlayer {
    fn id(&self) -> &str {
        &self.name
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn send_message(&self, text: &str) {
        self.outbox.lock().push(format!("[to {}] {}", self.name, text));
    }
}

/// A line the console prints
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Printed {
    /// Broadcast to everyone
    Broadcast { text: String },
    /// Withheld; only shown on the console
    Withheld { sender: String, reason: String },
    /// Private notice to one sender
    Notice { text: String },
    /// Host information
    Info { text: String },
}

impl Printed {
    pub fn render(&self, json: bool) -> String {
        if json {
            return serde_json::to_string(self).unwrap_or_default();
        }
        match self {
            Self::Broadcast { text } => text.clone(),
            Self::Withheld { sender, reason } => format!("(withheld message from {}: {})", sender, reason),
            Self::Notice { text } => text.clone(),
            Self::Info { text } => format!("* {}", text),
        }
    }
}

/// Console session around a started moderator
pub struct Session {
    moderator: Arc<Moderator>,
    players: HashMap<String, Arc<ConsolePlayer>>,
    outbox: Arc<Mutex<Vec<String>>>,
}

impl Session {
    pub fn new(moderator: Arc<Moderator>) -> Self {
        Self {
            moderator,
            players: HashMap::new(),
            outbox: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn join(&mut self, name: &str) -> Arc<ConsolePlayer> {
        if let Some(player) = self.players.get(name) {
            return player.clone();
        }
        let player = Arc::new(ConsolePlayer {
            name: name.to_string(),
            outbox: self.outbox.clone(),
        });
        self.players.insert(name.to_string(), player.clone());
        self.moderator.on_join(name);
        player
    }

    /// Run one input line and return what the console should print
    pub async fn handle_line(&mut self, line: &str) -> Vec<Printed> {
        let command = match parse_line(line) {
            Ok(Some(command)) => command,
            Ok(None) => return Vec::new(),
            Err(e) => return vec![Printed::Info { text: e }],
        };

        let mut printed = match command {
            Command::Join(name) => {
                self.players.remove(&name);
                self.join(&name);
                vec![Printed::Info {
                    text: format!("{} joined", name),
                }]
            }
            Command::Quit(name) => {
                self.players.remove(&name);
                self.moderator.on_quit(&name);
                vec![Printed::Info {
                    text: format!("{} left", name),
                }]
            }
            Command::Stats => {
                let stats = self.moderator.stats();
                vec![Printed::Info {
                    text: format!(
                        "messages={} flagged={} rate_limited={} cancelled={} fallbacks={}",
                        stats.messages, stats.flagged, stats.rate_limited, stats.cancelled, stats.fallbacks
                    ),
                }]
            }
            Command::Chat { name, message } => {
                let player = self.join(&name);
                let input = HandlerInput::new(player, message);
                let output = self.moderator.on_chat(input.clone()).await;
                vec![broadcast(&input, &output)]
            }
        };

        let notices = std::mem::take(&mut *self.outbox.lock());
        printed.extend(notices.into_iter().map(|text| Printed::Notice { text }));
        printed
    }
}

fn broadcast(input: &HandlerInput, output: &HandlerOutput) -> Printed {
    if output.fully_cancel_message {
        let reason = output
            .cancel_reason
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "cancelled".to_string());
        Printed::Withheld {
            sender: input.sender.name().to_string(),
            reason,
        }
    } else {
        Printed::Broadcast {
            text: input.render(&output.finished_message),
        }
    }
}
