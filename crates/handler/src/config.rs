//! Per-request configuration bundle.

use mcore::RequestType;
use provider::Provider;
use serde_json::Value;
use template::Template;

/// Everything the handler needs to run one request.
///
/// Built fresh per request by the caller and never mutated after
/// submission. `provider` or `template` may be `None` when name resolution
/// failed and the caller chose to submit in degraded form: the payload then
/// goes out with only the fields already set, and chunks fall back to raw
/// UTF-8 passthrough.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Which backend path this request targets.
    pub request_type: RequestType,

    /// The resolved provider, if any.
    pub provider: Option<Provider>,

    /// The resolved template, if any.
    pub template: Option<Template>,

    /// Full endpoint URL (base URL plus provider path suffix).
    pub url: String,

    /// The assembled JSON payload.
    pub payload: Value,

    /// Whether completion-type responses may span multiple lines.
    pub multi_line: bool,
}
