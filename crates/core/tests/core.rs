//! Tests for the shared core types.

use muse_core::{ContextData, Error, Message, RequestEnvelope, Role, SamplingParams};
use std::str::FromStr;

#[test]
fn sampling_defaults_gate_every_optional_field() {
    let fields = SamplingParams::default().enabled_fields();
    assert!(fields.contains_key("temperature"));
    assert!(fields.contains_key("max_tokens"));
    assert!(!fields.contains_key("top_p"));
    assert!(!fields.contains_key("top_k"));
    assert!(!fields.contains_key("presence_penalty"));
    assert!(!fields.contains_key("frequency_penalty"));
}

#[test]
fn enabled_flags_expose_their_fields() {
    let params = SamplingParams {
        use_top_p: true,
        top_p: 0.95,
        use_presence_penalty: true,
        presence_penalty: 0.5,
        ..Default::default()
    };
    let fields = params.enabled_fields();
    assert_eq!(fields["top_p"], 0.95);
    assert_eq!(fields["presence_penalty"], 0.5);
    assert!(!fields.contains_key("frequency_penalty"));
}

#[test]
fn fresh_envelopes_are_unique() {
    let a = RequestEnvelope::fresh();
    let b = RequestEnvelope::fresh();
    assert_ne!(a.id, b.id);
}

#[test]
fn context_drops_empty_history() {
    let context = ContextData::new("prefix").with_history(Vec::new());
    assert!(context.history.is_none());

    let context = ContextData::new("prefix").with_history(vec![Message::user("hi")]);
    assert_eq!(context.history.unwrap().len(), 1);
}

#[test]
fn roles_serialize_lowercase() {
    let json = serde_json::to_string(&Message::assistant("x")).unwrap();
    assert!(json.contains("\"assistant\""));
    assert_eq!(Role::from_str("system").unwrap(), Role::System);
    assert!(Role::from_str("robot").is_err());
}

#[test]
fn errors_render_human_readable_descriptions() {
    assert_eq!(
        Error::UnknownProvider("Bedrock".into()).to_string(),
        "unknown provider: Bedrock"
    );
    assert_eq!(
        Error::Parse("bad frame".into()).to_string(),
        "malformed chunk: bad frame"
    );
}
