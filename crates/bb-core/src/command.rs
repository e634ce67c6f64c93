use crate::domain::Credentials;

/// A classified inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Login(Credentials),
    Balance,
    Unknown,
}

/// `/login` without exactly two arguments. Answered with the usage text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsageError;

/// Split `/cmd@botname rest` into (`cmd`, `rest`).
///
/// Returns `None` when the text is not a command.
fn parse_command(text: &str) -> Option<(String, &str)> {
    let text = text.trim();
    let body = text.strip_prefix('/')?;
    let (first, rest) = match body.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest),
        None => (body, ""),
    };

    let cmd = first.split('@').next().unwrap_or("").to_lowercase();
    if cmd.is_empty() {
        return None;
    }
    Some((cmd, rest.trim()))
}

/// Classify raw message text. Pure.
pub fn classify(text: &str) -> std::result::Result<Command, UsageError> {
    let Some((cmd, args)) = parse_command(text) else {
        return Ok(Command::Unknown);
    };

    match cmd.as_str() {
        "login" => {
            // Single-space split: `/login a  b` has an empty middle part and is rejected.
            let parts: Vec<&str> = args.split(' ').collect();
            match parts.as_slice() {
                [identifier, secret] if !identifier.is_empty() && !secret.is_empty() => {
                    Ok(Command::Login(Credentials::new(*identifier, *secret)))
                }
                _ => Err(UsageError),
            }
        }
        "balance" => Ok(Command::Balance),
        _ => Ok(Command::Unknown),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_with_two_arguments() {
        assert_eq!(
            classify("/login 12345678900 mypassword"),
            Ok(Command::Login(Credentials::new("12345678900", "mypassword")))
        );
        assert_eq!(
            classify("  /login   12345678900 mypassword  "),
            Ok(Command::Login(Credentials::new("12345678900", "mypassword")))
        );
    }

    #[test]
    fn login_with_wrong_argument_count_is_a_usage_error() {
        for text in [
            "/login",
            "/login ",
            "/login 123",
            "/login 123 pwd extra",
            "/login a b c d",
            "/login 123  pwd",
        ] {
            assert_eq!(classify(text), Err(UsageError), "{text:?}");
        }
    }

    #[test]
    fn bot_suffix_and_case_are_ignored() {
        assert_eq!(classify("/balance@card_bot"), Ok(Command::Balance));
        assert_eq!(classify("/BALANCE"), Ok(Command::Balance));
        assert_eq!(
            classify("/Login@card_bot a b"),
            Ok(Command::Login(Credentials::new("a", "b")))
        );
    }

    #[test]
    fn balance_ignores_arguments() {
        assert_eq!(classify("/balance now please"), Ok(Command::Balance));
    }

    #[test]
    fn everything_else_is_unknown() {
        for text in ["/help", "/start", "hello", "", "/", "balance", "login a b"] {
            assert_eq!(classify(text), Ok(Command::Unknown), "{text:?}");
        }
    }
}
