//! POSIX-shell-like splitting of a script into program arguments.
//!
//! Supported: whitespace separated words, double quotes with `\` escapes inside, single quotes
//! with no escape processing, and `\` escapes outside quotes. Adjacent quoted and unquoted parts
//! join into one word. No expansion of any kind is done.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseCommandError {
    #[error("Unterminated {quote} quote")]
    UnterminatedQuote { quote: char },
    #[error("Trailing escape character")]
    TrailingEscape,
}

/// Join `\` line continuations and trim the script.
pub fn normalize_script(script: &str) -> String {
    script
        .trim()
        .replace("\\\r\n", " ")
        .replace("\\\n", " ")
}

pub fn split_command_line(input: &str) -> Result<Vec<String>, ParseCommandError> {
    let mut args = Vec::new();
    // `Some` while inside a word, so `""` still yields an empty argument.
    let mut current: Option<String> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(escaped) => word.push(escaped),
                            None => return Err(ParseCommandError::UnterminatedQuote { quote: '"' }),
                        },
                        Some(other) => word.push(other),
                        None => return Err(ParseCommandError::UnterminatedQuote { quote: '"' }),
                    }
                }
            }
            '\'' => {
                let word = current.get_or_insert_with(String::new);
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(other) => word.push(other),
                        None => return Err(ParseCommandError::UnterminatedQuote { quote: '\'' }),
                    }
                }
            }
            '\\' => match chars.next() {
                Some(escaped) => current.get_or_insert_with(String::new).push(escaped),
                None => return Err(ParseCommandError::TrailingEscape),
            },
            c if c.is_whitespace() => {
                if let Some(word) = current.take() {
                    args.push(word);
                }
            }
            c => current.get_or_insert_with(String::new).push(c),
        }
    }

    if let Some(word) = current {
        args.push(word);
    }

    Ok(args)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn split(input: &str) -> Vec<String> {
        split_command_line(input).unwrap()
    }

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split("  echo   hello\tworld "), vec!["echo", "hello", "world"]);
    }

    #[test]
    fn empty_input_has_no_arguments() {
        assert!(split("").is_empty());
        assert!(split("   ").is_empty());
    }

    #[test]
    fn double_quotes_process_escapes() {
        assert_eq!(
            split(r#"echo "hello \"there\" \\ world""#),
            vec!["echo", r#"hello "there" \ world"#]
        );
    }

    #[test]
    fn single_quotes_are_literal() {
        assert_eq!(split(r"echo 'a \n b'"), vec!["echo", r"a \n b"]);
    }

    #[test]
    fn escapes_outside_quotes() {
        assert_eq!(split(r"touch my\ file \$HOME"), vec!["touch", "my file", "$HOME"]);
    }

    #[test]
    fn adjacent_parts_join_into_one_word() {
        assert_eq!(split(r#"a"b c"'d e'f"#), vec!["ab cd ef"]);
    }

    #[test]
    fn empty_quotes_are_an_argument() {
        assert_eq!(split(r#"printf "" ''"#), vec!["printf", "", ""]);
    }

    #[test]
    fn rejects_malformed_quoting() {
        assert_eq!(
            split_command_line(r#"echo "unterminated"#),
            Err(ParseCommandError::UnterminatedQuote { quote: '"' })
        );
        assert_eq!(
            split_command_line("echo 'unterminated"),
            Err(ParseCommandError::UnterminatedQuote { quote: '\'' })
        );
        assert_eq!(
            split_command_line(r#"echo "ends with escape\"#),
            Err(ParseCommandError::UnterminatedQuote { quote: '"' })
        );
        assert_eq!(
            split_command_line(r"echo \"),
            Err(ParseCommandError::TrailingEscape)
        );
    }

    #[test]
    fn line_continuations_are_joined() {
        let script = "\n  curl \\\n  -X POST \\\r\n  http://localhost  \n";
        assert_eq!(
            normalize_script(script),
            "curl    -X POST    http://localhost"
        );
    }
}
