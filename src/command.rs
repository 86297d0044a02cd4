//! Command-line parsing for the session protocol.
//!
//! One command per input line: the first whitespace-separated token
//! (case-insensitive) selects the command, the second is the positional
//! argument for the commands that take one, anything after that is
//! ignored.
//!
//! Id arguments stay raw here; the session validates them so that a
//! missing or non-numeric id is reported before the store is touched.

/// Parsed session command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Empty input line; the session just re-prompts
    Empty,

    /// Show the command summary (`h`, `help`)
    Help,

    /// List all quizzes
    List,

    /// Show one quiz's question and answer
    Show { id: Option<String> },

    /// Add a new quiz interactively
    Add,

    /// Delete a quiz
    Delete { id: Option<String> },

    /// Edit a quiz interactively
    Edit { id: Option<String> },

    /// Answer a single quiz, without scoring
    Test { id: Option<String> },

    /// Play all quizzes in random order (`p`, `play`)
    Play,

    /// Show author credits
    Credits,

    /// End the session (`q`, `quit`)
    Quit,
}

/// Command parsing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// First token is not a recognized command
    UnknownCommand(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnknownCommand(cmd) => write!(f, "Unknown command: {}", cmd),
        }
    }
}

impl std::error::Error for ParseError {}

impl Command {
    /// Parse one input line into a command
    pub fn parse(line: &str) -> Result<Command, ParseError> {
        let mut parts = line.split_whitespace();

        let token = match parts.next() {
            Some(t) => t.to_lowercase(),
            None => return Ok(Command::Empty),
        };
        let arg = parts.next().map(|s| s.to_string());

        match token.as_str() {
            "h" | "help" => Ok(Command::Help),
            "list" => Ok(Command::List),
            "show" => Ok(Command::Show { id: arg }),
            "add" => Ok(Command::Add),
            "delete" => Ok(Command::Delete { id: arg }),
            "edit" => Ok(Command::Edit { id: arg }),
            "test" => Ok(Command::Test { id: arg }),
            "p" | "play" => Ok(Command::Play),
            "credits" => Ok(Command::Credits),
            "q" | "quit" => Ok(Command::Quit),
            _ => Err(ParseError::UnknownCommand(token)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(Command::parse("list").unwrap(), Command::List);
        assert_eq!(Command::parse("add").unwrap(), Command::Add);
        assert_eq!(Command::parse("credits").unwrap(), Command::Credits);
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(Command::parse("h").unwrap(), Command::Help);
        assert_eq!(Command::parse("help").unwrap(), Command::Help);
        assert_eq!(Command::parse("p").unwrap(), Command::Play);
        assert_eq!(Command::parse("play").unwrap(), Command::Play);
        assert_eq!(Command::parse("q").unwrap(), Command::Quit);
        assert_eq!(Command::parse("quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(Command::parse("LIST").unwrap(), Command::List);
        assert_eq!(Command::parse("Quit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_with_argument() {
        assert_eq!(
            Command::parse("show 3").unwrap(),
            Command::Show {
                id: Some("3".to_string())
            }
        );
        assert_eq!(Command::parse("delete").unwrap(), Command::Delete { id: None });
        // Non-numeric arguments are passed through; validation happens later
        assert_eq!(
            Command::parse("test abc").unwrap(),
            Command::Test {
                id: Some("abc".to_string())
            }
        );
    }

    #[test]
    fn test_parse_extra_arguments_ignored() {
        assert_eq!(
            Command::parse("edit 7 trailing junk").unwrap(),
            Command::Edit {
                id: Some("7".to_string())
            }
        );
    }

    #[test]
    fn test_parse_empty_line() {
        assert_eq!(Command::parse("").unwrap(), Command::Empty);
        assert_eq!(Command::parse("   \t ").unwrap(), Command::Empty);
    }

    #[test]
    fn test_parse_unknown_command() {
        let err = Command::parse("frobnicate now").unwrap_err();
        assert_eq!(err, ParseError::UnknownCommand("frobnicate".to_string()));
    }
}
