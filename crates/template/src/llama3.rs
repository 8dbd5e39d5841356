//! Llama 3 instruct delimiters.

use mcore::Role;

pub(crate) const STOP_WORDS: &[&str] =
    &["<|start_header_id|>", "<|end_header_id|>", "<|eot_id|>"];

pub(crate) fn wrap(role: Role, content: &str) -> String {
    format!("<|start_header_id|>{role}<|end_header_id|>{content}<|eot_id|>")
}
