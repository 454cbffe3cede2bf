mod attestation_synthetic;
mod envelopes;

/// Fetch a string field from a fixture object.
pub fn field<'a>(value: &'a serde_json::Value, key: &str) -> &'a str {
    value[key]
        .as_str()
        .unwrap_or_else(|| panic!("fixture field `{key}` should be a string"))
}
