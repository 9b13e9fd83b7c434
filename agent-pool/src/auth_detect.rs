//! Auth-error heuristic and one-shot help banner for the output
//! streaming reader (§4.2 "Output streaming" step 2). The original
//! project's `is_auth_error`/`AUTH_ERROR_HELP_SERVER` live outside the
//! retrieved source tree, so the patterns here are a plausible
//! reconstruction from the visible caller: anything that reads like an
//! API-key/login rejection coming out of the agent's own CLI.

use std::collections::VecDeque;

const RING_BUFFER_SIZE: usize = 20;

const AUTH_ERROR_HELP: &str = "\
Authentication appears to have failed.
Make sure ANTHROPIC_API_KEY is set, or run the agent's login flow,
then restart this agent.";

fn looks_like_auth_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    const NEEDLES: &[&str] = &[
        "authentication_error",
        "invalid api key",
        "invalid x-api-key",
        "please run /login",
        "unauthorized",
        "401",
        "permission denied: api key",
    ];
    NEEDLES.iter().any(|n| lower.contains(n))
}

/// Tracks the last [`RING_BUFFER_SIZE`] unredacted lines from one
/// agent's subprocess and fires the auth-help banner at most once.
pub struct AuthErrorDetector {
    buffer: VecDeque<String>,
    fired: bool,
}

impl Default for AuthErrorDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthErrorDetector {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(RING_BUFFER_SIZE),
            fired: false,
        }
    }

    /// Feed one unredacted line. Returns the help banner lines to emit
    /// *before* the triggering line, if this line just tripped the
    /// detector for the first time.
    pub fn observe_line(&mut self, line: &str) -> Option<Vec<String>> {
        self.push(line);
        if !self.fired && looks_like_auth_error(line) {
            self.fired = true;
            return Some(Self::help_lines());
        }
        None
    }

    /// Called once at process exit with the joined ring buffer, for the
    /// case where the error only becomes apparent across multiple lines.
    pub fn observe_exit(&mut self) -> Option<Vec<String>> {
        if self.fired {
            return None;
        }
        let joined = self
            .buffer
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        if looks_like_auth_error(&joined) {
            self.fired = true;
            return Some(Self::help_lines());
        }
        None
    }

    fn push(&mut self, line: &str) {
        if self.buffer.len() == RING_BUFFER_SIZE {
            self.buffer.pop_front();
        }
        self.buffer.push_back(line.to_string());
    }

    fn help_lines() -> Vec<String> {
        AUTH_ERROR_HELP.trim().lines().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_on_matching_line() {
        let mut detector = AuthErrorDetector::new();
        let first = detector.observe_line("Error: invalid api key provided");
        assert!(first.is_some());
        let second = detector.observe_line("Error: invalid api key provided");
        assert!(second.is_none());
    }

    #[test]
    fn ignores_ordinary_output() {
        let mut detector = AuthErrorDetector::new();
        assert!(detector.observe_line("Running tests...").is_none());
    }

    #[test]
    fn ring_buffer_caps_at_twenty_lines() {
        let mut detector = AuthErrorDetector::new();
        for i in 0..50 {
            detector.observe_line(&format!("line {i}"));
        }
        assert_eq!(detector.buffer.len(), RING_BUFFER_SIZE);
        assert_eq!(detector.buffer.back().unwrap(), "line 49");
    }

    #[test]
    fn exit_check_is_a_no_op_once_already_fired() {
        let mut detector = AuthErrorDetector::new();
        detector.observe_line("unauthorized request");
        assert!(detector.observe_exit().is_none());
    }
}
