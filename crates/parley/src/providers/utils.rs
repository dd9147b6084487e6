use serde_json::{json, Value};
use uuid::Uuid;

/// Parse a JSON string that came off the wire, falling back to an empty
/// object when it does not parse. A single malformed tool call must not
/// abort an entire response, so this is the only parse applied to
/// accumulated tool arguments.
pub fn safe_parse_json(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "unparseable tool arguments, substituting an empty object");
            json!({})
        }
    }
}

/// Source of correlation ids for calls and results that arrived without
/// one. Injectable so tests can pin the generated values.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Default generator, producing `call_<uuid>` ids.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }
}

/// Resolve an optional wire id, substituting a generated one when absent
/// or empty.
pub fn id_or_generated(id: Option<&str>, ids: &dyn IdGenerator) -> String {
    match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => ids.generate(),
    }
}

/// Fixed-output generator for deterministic tests.
#[cfg(test)]
pub(crate) struct FixedIds(pub &'static str);

#[cfg(test)]
impl IdGenerator for FixedIds {
    fn generate(&self) -> String {
        self.0.to_string()
    }
}
