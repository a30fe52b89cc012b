//! Command verbs and parsing
//!
//! Both dispatchers key their handler tables by [`Verb`] and consult
//! [`Verb::phase`] for what follows the command message, so the two ends
//! cannot disagree on phase sequencing.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Command verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Change the session working directory
    Cd,
    /// Create a subdirectory
    Mkdir,
    /// Remove a file or directory tree
    Rm,
    /// Upload a file from client to server
    Ul,
    /// Download a file from server to client
    Dl,
    /// End the session
    Exit,
}

/// What follows a command message on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferPhase {
    /// Nothing; the server answers with the listing
    None,
    /// Client sends one framed message of file bytes
    Upload,
    /// Server sends one framed message of file bytes, client answers with a raw ack
    Download,
    /// Nothing; both ends close
    Terminate,
}

/// Raw acknowledgement for a received, non-empty download
pub const DOWNLOAD_ACK: &str = "File downloaded successfully";

/// Acknowledgement for an empty download payload, sent framed
pub const BLANK_FILE_ACK: &str = "Received blank file";

impl Verb {
    /// All verbs in table order
    pub const ALL: [Verb; 6] = [Verb::Cd, Verb::Mkdir, Verb::Rm, Verb::Ul, Verb::Dl, Verb::Exit];

    /// Wire spelling
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Cd => "cd",
            Verb::Mkdir => "mkdir",
            Verb::Rm => "rm",
            Verb::Ul => "ul",
            Verb::Dl => "dl",
            Verb::Exit => "exit",
        }
    }

    /// Payload phase following the command
    pub fn phase(self) -> TransferPhase {
        match self {
            Verb::Cd | Verb::Mkdir | Verb::Rm => TransferPhase::None,
            Verb::Ul => TransferPhase::Upload,
            Verb::Dl => TransferPhase::Download,
            Verb::Exit => TransferPhase::Terminate,
        }
    }

    /// Whether the verb needs an argument
    pub fn takes_argument(self) -> bool {
        self != Verb::Exit
    }

    /// Case-insensitive lookup, as typed by a user
    pub fn parse_lenient(s: &str) -> Option<Verb> {
        Verb::ALL.into_iter().find(|v| v.as_str().eq_ignore_ascii_case(s))
    }
}

impl FromStr for Verb {
    type Err = CommandError;

    /// Case-sensitive lookup, as received on the wire
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| CommandError::UnknownVerb(s.to_string()))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Malformed command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Nothing but whitespace
    #[error("Empty command")]
    Empty,

    /// First word is not a known verb
    #[error("Unknown command: {0}")]
    UnknownVerb(String),

    /// Verb needs an argument and got none
    #[error("Missing argument for {0}")]
    MissingArgument(Verb),
}

/// A verb plus its single argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The verb
    pub verb: Verb,
    /// Path or file name; empty only for `exit`
    pub arg: String,
}

impl Command {
    /// Create a command
    pub fn new(verb: Verb, arg: impl Into<String>) -> Self {
        Self { verb, arg: arg.into() }
    }

    /// Parse a received command message (case-sensitive verb)
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        Self::parse_with(line, |word| word.parse())
    }

    /// Parse user input (case-insensitive verb)
    pub fn parse_lenient(line: &str) -> Result<Self, CommandError> {
        Self::parse_with(line, |word| {
            Verb::parse_lenient(word).ok_or_else(|| CommandError::UnknownVerb(word.to_string()))
        })
    }

    fn parse_with<F>(line: &str, lookup: F) -> Result<Self, CommandError>
    where
        F: FnOnce(&str) -> Result<Verb, CommandError>,
    {
        let line = line.trim();
        if line.is_empty() {
            return Err(CommandError::Empty);
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let verb = lookup(word)?;
        if verb.takes_argument() && rest.is_empty() {
            return Err(CommandError::MissingArgument(verb));
        }

        Ok(Self::new(verb, rest))
    }

    /// Render as sent on the wire, verb in lower case
    pub fn to_line(&self) -> String {
        if self.arg.is_empty() {
            self.verb.as_str().to_string()
        } else {
            format!("{} {}", self.verb, self.arg)
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}
