//! Shell-command allow-listing (§4.3 "Validation"). Splits a command
//! string on shell control operators, tokenizes each segment with
//! POSIX shell-word rules, and checks the base command of every
//! segment against [`ALLOWED_COMMANDS`]. `cd` segments are ignored —
//! changing directory carries no execution risk by itself.

use std::collections::HashSet;

use feature_core::error::{FeatureError, Result};
use once_cell::sync::Lazy;

/// The base commands a verification or task string may invoke.
/// Mirrors the curated set in §4.3; keep in lockstep with
/// [`crate::predefined::PREDEFINED_TASKS`] so every predefined task's
/// command also passes this allow-list.
pub static ALLOWED_COMMANDS: &[&str] = &[
    "git", "npm", "pnpm", "yarn", "cargo", "python3", "pytest", "pip", "cat", "ls", "grep", "wc",
    "head", "tail", "find", "pwd", "echo", "true", "false",
];

static ALLOWED_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ALLOWED_COMMANDS.iter().copied().collect());

/// Split a command string on `&&`, `||`, `|`, `;` at the top level,
/// preserving the separators' segment boundaries only (the separators
/// themselves are discarded; this validator does not need to re-run
/// the command, only to inspect it).
fn split_segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '&' if chars.peek() == Some(&'&') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            '|' if chars.peek() == Some(&'|') => {
                chars.next();
                segments.push(std::mem::take(&mut current));
            }
            '|' => segments.push(std::mem::take(&mut current)),
            ';' => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}

fn base_command(token: &str) -> &str {
    token.rsplit('/').next().unwrap_or(token)
}

/// Validate a full command string against the allow-list. Returns the
/// original string unchanged on success, for call-site ergonomics.
pub fn validate_command(command: &str) -> Result<()> {
    if command.trim().is_empty() {
        return Err(FeatureError::Validation(
            "command must not be empty".to_string(),
        ));
    }

    for segment in split_segments(command) {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let tokens = shell_words::split(segment).map_err(|e| {
            FeatureError::Validation(format!("failed to tokenize command segment: {e}"))
        })?;

        let Some(first) = tokens.first() else {
            continue;
        };

        if first == "cd" {
            continue;
        }

        let base = base_command(first);
        if !ALLOWED_SET.contains(base) {
            return Err(FeatureError::Validation(format!(
                "command '{base}' is not in the allow-list"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_simple_allowlisted_command() {
        assert!(validate_command("git status").is_ok());
    }

    #[test]
    fn allows_chained_allowlisted_commands() {
        assert!(validate_command("cargo build && cargo test").is_ok());
    }

    #[test]
    fn rejects_non_allowlisted_command() {
        assert!(validate_command("rm -rf /").is_err());
    }

    #[test]
    fn rejects_when_any_segment_is_disallowed() {
        assert!(validate_command("git status && rm -rf /").is_err());
    }

    #[test]
    fn ignores_cd_segments() {
        assert!(validate_command("cd /tmp && ls").is_ok());
    }

    #[test]
    fn strips_directory_prefix_from_base_command() {
        assert!(validate_command("/usr/bin/git status").is_ok());
    }

    #[test]
    fn rejects_unterminated_quote() {
        assert!(validate_command("echo \"unterminated").is_err());
    }

    #[test]
    fn rejects_empty_command() {
        assert!(validate_command("   ").is_err());
    }

    #[test]
    fn allows_pipe_separated_segments() {
        assert!(validate_command("cat file.txt | grep foo").is_ok());
    }
}
