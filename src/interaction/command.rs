//! Keyword commands recognized in channel text.

/// A command the bot understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `add: <name>`
    Add(String),
    /// `remove: <name>`
    Remove(String),
    Help,
    ViewAll,
    Recommend,
}

pub const ADD: &str = "add:";
pub const REMOVE: &str = "remove:";
pub const HELP: &str = "help";
pub const VIEW_ALL: &str = "view-all";
pub const RECOMMEND: &str = "recommendation";

impl Command {
    /// Classifies message text, first match wins in the order
    /// `add:`, `remove:`, `help`, `view-all`, `recommendation`.
    ///
    /// Keywords match case-insensitively anywhere in the text. The argument of
    /// `add:` / `remove:` is the trimmed rest of the text after the keyword, and may be empty.
    pub fn parse(text: &str) -> Option<Self> {
        // ASCII lowering keeps byte offsets aligned with `text`.
        let lowered = text.to_ascii_lowercase();

        if let Some(arg) = argument_after(text, &lowered, ADD) {
            Some(Command::Add(arg))
        } else if let Some(arg) = argument_after(text, &lowered, REMOVE) {
            Some(Command::Remove(arg))
        } else if lowered.contains(HELP) {
            Some(Command::Help)
        } else if lowered.contains(VIEW_ALL) {
            Some(Command::ViewAll)
        } else if lowered.contains(RECOMMEND) {
            Some(Command::Recommend)
        } else {
            None
        }
    }

    /// The keyword that triggers this command.
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::Add(_) => ADD,
            Command::Remove(_) => REMOVE,
            Command::Help => HELP,
            Command::ViewAll => VIEW_ALL,
            Command::Recommend => RECOMMEND,
        }
    }
}

fn argument_after(text: &str, lowered: &str, keyword: &str) -> Option<String> {
    let start = lowered.find(keyword)? + keyword.len();
    Some(text[start..].trim().to_string())
}
