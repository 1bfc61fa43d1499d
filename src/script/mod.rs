//! Script text handling: request body -> lines -> commands.

mod tokenizer;

pub use tokenizer::tokenize;

/// One parsed script line: a verb followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub verb: String,
    pub args: Vec<String>,
}

impl Command {
    /// Parse a single line. Returns `None` when the line has no tokens.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = tokenize(line).into_iter();
        let verb = tokens.next()?;
        Some(Self {
            verb,
            args: tokens.collect(),
        })
    }
}

/// Split a raw request body into the ordered, non-empty lines of a script.
///
/// A body that is a JSON string literal (`"INFO HOSTNAME\nTCP db 5432"`) is
/// unwrapped first; if it does not decode, the raw text is used as-is.
pub fn split_script(body: &str) -> Vec<String> {
    let text = unwrap_json_string(body);
    text.replace('\r', "")
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn unwrap_json_string(body: &str) -> std::borrow::Cow<'_, str> {
    let trimmed = body.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
            return inner.into();
        }
    }
    body.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_yields_no_lines() {
        assert!(split_script("").is_empty());
        assert!(split_script("\n\r\n\n").is_empty());
    }

    #[test]
    fn crlf_is_normalised_and_blank_lines_dropped() {
        let lines = split_script("INFO HOSTNAME\r\n\r\nTCP db 5432\r\n");
        assert_eq!(lines, vec!["INFO HOSTNAME", "TCP db 5432"]);
    }

    #[test]
    fn json_string_body_is_unwrapped() {
        let lines = split_script(r#""INFO HOSTNAME\nHTTP GET \"http://x\"""#);
        assert_eq!(lines, vec!["INFO HOSTNAME", r#"HTTP GET "http://x""#]);
    }

    #[test]
    fn broken_json_string_falls_back_to_raw_text() {
        let lines = split_script(r#""INFO \q HOSTNAME""#);
        assert_eq!(lines, vec![r#""INFO \q HOSTNAME""#]);
    }

    #[test]
    fn quoted_line_inside_plain_body_is_not_unwrapped() {
        let lines = split_script("\"a b\"\nINFO");
        assert_eq!(lines, vec!["\"a b\"", "INFO"]);
    }

    #[test]
    fn whitespace_inside_lines_is_preserved() {
        let lines = split_script("  INFO   HOSTNAME ");
        assert_eq!(lines, vec!["  INFO   HOSTNAME "]);
    }

    #[test]
    fn command_parse_splits_verb_from_args() {
        let cmd = Command::parse("TCP localhost 80").unwrap();
        assert_eq!(cmd.verb, "TCP");
        assert_eq!(cmd.args, vec!["localhost", "80"]);
    }

    #[test]
    fn command_parse_of_blank_line_is_none() {
        assert!(Command::parse("").is_none());
        assert!(Command::parse("   ").is_none());
        assert!(Command::parse("\"\" \"\"").is_none());
    }
}
