//! Text command adapter
//!
//! Chat front ends send commands such as `USE PING example.com`. This module
//! turns that text into the target string handed to the engine; the engine
//! itself only ever sees typed input.

/// Command keywords, matched case-insensitively
const USE_KEYWORD: &str = "use";
const PING_KEYWORD: &str = "ping";

/// A recognized text command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    /// `USE PING <target>`; the target may be empty, which the engine reports
    /// as an invalid target
    Ping { target: String },
}

impl TextCommand {
    /// Parse a text command; `None` when the text is not a command at all
    pub fn parse(input: &str) -> Option<Self> {
        let mut words = input.split_whitespace();

        let first = words.next()?;
        let second = words.next()?;
        if !first.eq_ignore_ascii_case(USE_KEYWORD) || !second.eq_ignore_ascii_case(PING_KEYWORD) {
            return None;
        }

        let target = words.collect::<Vec<_>>().join(" ");
        Some(Self::Ping { target })
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Ping { target } => target,
        }
    }
}

/// Target named by free-form input: the argument of `USE PING`, or the
/// whole input when it is not a command
pub fn target_from_input(input: &str) -> String {
    match TextCommand::parse(input) {
        Some(command) => command.target().to_string(),
        None => input.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_use_ping_is_case_insensitive() {
        for input in ["USE PING example.com", "use ping example.com", "Use Ping   example.com  "] {
            assert_eq!(
                TextCommand::parse(input),
                Some(TextCommand::Ping { target: "example.com".to_string() }),
                "input: {}",
                input
            );
        }
    }

    #[test]
    fn test_host_port_target() {
        let command = TextCommand::parse("USE PING 192.0.2.1:8080").unwrap();
        assert_eq!(command.target(), "192.0.2.1:8080");
    }

    #[test]
    fn test_missing_target_is_empty() {
        assert_eq!(TextCommand::parse("use ping").unwrap().target(), "");
    }

    #[test]
    fn test_non_commands() {
        assert!(TextCommand::parse("example.com").is_none());
        assert!(TextCommand::parse("use traceroute example.com").is_none());
        assert!(TextCommand::parse("").is_none());
    }

    #[test]
    fn test_target_from_input() {
        assert_eq!(target_from_input("USE PING example.com"), "example.com");
        assert_eq!(target_from_input("  example.com "), "example.com");
        // Extra words stay in the target and fail sanitisation downstream
        assert_eq!(target_from_input("use ping a b"), "a b");
    }
}
