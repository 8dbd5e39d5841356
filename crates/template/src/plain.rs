//! Raw prefix passthrough completion prompt.

use mcore::ContextData;

pub(crate) fn prompt(context: &ContextData) -> String {
    context.prefix.clone()
}
