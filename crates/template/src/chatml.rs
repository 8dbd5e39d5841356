//! ChatML delimiters (Qwen, Yi and friends).

use mcore::Role;

pub(crate) const STOP_WORDS: &[&str] = &["<|im_start|>", "<|im_end|>"];

pub(crate) fn wrap(role: Role, content: &str) -> String {
    format!("<|im_start|>{role}\n{content}<|im_end|>")
}
