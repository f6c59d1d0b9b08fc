//! Classification of server-reported error payloads.
//!
//! The router reports failures as MessagePack values of a few known shapes.
//! A fixed, ordered chain of matchers inspects the payload and produces a
//! typed [`ClientError`]: structured box errors first (most specific), then
//! `errors`-module envelopes, then a generic fallback wrapping the raw
//! payload. The chain is total: `classify` always returns something.

use rmpv::Value;

use super::ClientError;

/// Classify a decoded error payload into a typed error.
///
/// Matcher order is significant: the box-error matcher gets first refusal so
/// structured diagnostics are not masked by the generic fallback.
pub fn classify(payload: &Value) -> ClientError {
    const MATCHERS: &[fn(&Value) -> Option<ClientError>] = &[match_box_error, match_module_error];

    for matcher in MATCHERS {
        if let Some(err) = matcher(payload) {
            return err;
        }
    }

    tracing::warn!(payload = %payload, "unrecognized server error payload");
    ClientError::Unrecognized(payload.clone())
}

/// Classify a raw error payload that has not been decoded yet.
///
/// A payload whose bytes cannot be decoded at all is reported as
/// [`ClientError::ErrorPayloadCorrupt`], distinct from the `Unrecognized`
/// fallback for well-formed but unknown shapes.
pub fn classify_slice(mut bytes: &[u8]) -> ClientError {
    match rmpv::decode::read_value(&mut bytes) {
        Ok(value) => classify(&value),
        Err(e) => ClientError::ErrorPayloadCorrupt(e.to_string()),
    }
}

/// Box errors carry an integer `code` and a string `message`.
fn match_box_error(payload: &Value) -> Option<ClientError> {
    let entries = payload.as_map()?;
    let code = map_get(entries, "code")?.as_u64()?;
    let message = map_get(entries, "message")?.as_str()?;

    Some(ClientError::BoxError {
        code,
        message: message.to_string(),
    })
}

/// Envelopes produced by the server-side `errors` module carry a rendered
/// `str` field, optionally with the originating `class_name`, a bare `err`
/// message and a `stack` of nested errors.
fn match_module_error(payload: &Value) -> Option<ClientError> {
    let entries = payload.as_map()?;
    let rendered = map_get(entries, "str")?.as_str()?;

    let class_name = map_get(entries, "class_name")
        .and_then(Value::as_str)
        .map(str::to_string);
    let message = map_get(entries, "err")
        .and_then(Value::as_str)
        .unwrap_or(rendered);

    Some(ClientError::ModuleError {
        class_name,
        message: message.to_string(),
    })
}

fn map_get<'a>(entries: &'a [(Value, Value)], key: &str) -> Option<&'a Value> {
    entries
        .iter()
        .find(|(k, _)| k.as_str() == Some(key))
        .map(|(_, v)| v)
}
