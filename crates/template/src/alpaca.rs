//! Alpaca instruction format.

use mcore::Role;

pub(crate) const STOP_WORDS: &[&str] = &["### Instruction:", "###"];

pub(crate) fn wrap(role: Role, content: &str) -> String {
    match role {
        // The system prompt is plain preamble text in the Alpaca format.
        Role::System => content.to_owned(),
        Role::User => format!("### Instruction:\n{content}"),
        Role::Assistant => format!("### Response:\n{content}"),
    }
}
