//! CodeLlama fill-in-the-middle completion prompt.

use mcore::ContextData;

pub(crate) const STOP_WORDS: &[&str] = &["<END>", "<EOT>", "<MID>"];

pub(crate) fn prompt(context: &ContextData) -> String {
    format!("<PRE> {} <SUF>{} <MID>", context.prefix, context.suffix)
}
