//! CLI argument parsing.
//!
//! Only `--claude` belongs to the wrapper. Everything else, including
//! `--help` and `--version`, is handed to the child untouched.

const CLAUDE_FLAG: &str = "--claude";
const CLAUDE_FLAG_EQ: &str = "--claude=";

/// Configuration from CLI arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Child executable given with `--claude`
    pub claude: Option<String>,
    /// Arguments passed through to the child, in order
    pub args: Vec<String>,
}

/// Parse the process arguments (skipping argv[0]).
pub fn parse_args() -> CliConfig {
    parse_args_from(std::env::args().skip(1))
}

/// Parse an argument list that does not include the program name.
pub fn parse_args_from<I>(raw: I) -> CliConfig
where
    I: IntoIterator<Item = String>,
{
    let mut config = CliConfig::default();
    let mut raw = raw.into_iter();

    while let Some(arg) = raw.next() {
        if arg == "--" {
            // Everything after the separator belongs to the child.
            config.args.push(arg);
            config.args.extend(raw.by_ref());
            break;
        } else if arg == CLAUDE_FLAG {
            match raw.next() {
                Some(value) => config.claude = Some(value),
                // Dangling flag with no value: let the child see it.
                None => config.args.push(arg),
            }
        } else if let Some(value) = arg.strip_prefix(CLAUDE_FLAG_EQ) {
            config.claude = Some(value.to_string());
        } else {
            config.args.push(arg);
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        parse_args_from(args.iter().map(|s| s.to_string()))
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args() {
        assert_eq!(parse(&[]), CliConfig::default());
    }

    #[test]
    fn test_claude_flag_with_separate_value() {
        let config = parse(&["--claude", "/opt/claude", "--resume"]);
        assert_eq!(config.claude.as_deref(), Some("/opt/claude"));
        assert_eq!(config.args, strings(&["--resume"]));
    }

    #[test]
    fn test_claude_flag_with_equals() {
        let config = parse(&["-p", "--claude=/opt/claude", "hello"]);
        assert_eq!(config.claude.as_deref(), Some("/opt/claude"));
        assert_eq!(config.args, strings(&["-p", "hello"]));
    }

    #[test]
    fn test_last_claude_flag_wins() {
        let config = parse(&["--claude", "a", "--claude=b"]);
        assert_eq!(config.claude.as_deref(), Some("b"));
        assert!(config.args.is_empty());
    }

    #[test]
    fn test_unknown_flags_pass_through_in_order() {
        let config = parse(&["--help", "-c", "--model", "opus", "--version"]);
        assert_eq!(config.claude, None);
        assert_eq!(
            config.args,
            strings(&["--help", "-c", "--model", "opus", "--version"])
        );
    }

    #[test]
    fn test_dangling_claude_flag_is_passed_through() {
        let config = parse(&["--resume", "--claude"]);
        assert_eq!(config.claude, None);
        assert_eq!(config.args, strings(&["--resume", "--claude"]));
    }

    #[test]
    fn test_args_after_separator_are_not_interpreted() {
        let config = parse(&["--claude", "x", "--", "--claude", "y"]);
        assert_eq!(config.claude.as_deref(), Some("x"));
        assert_eq!(config.args, strings(&["--", "--claude", "y"]));
    }
}
