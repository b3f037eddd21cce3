use rand::Rng;
use serde_json::Value;

/// Merges `overlay` into `base`.
///
/// Objects merge key by key, arrays are concatenated, nulls in `overlay` are
/// ignored and any other value replaces the base value.
pub fn merge_json(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        if !value.is_null() {
                            base.insert(key, value);
                        }
                    }
                }
            }
        }
        (Value::Array(base), Value::Array(overlay)) => base.extend(overlay),
        (base, overlay) => *base = overlay,
    }
}

/// `<prefix>_<8 random uppercase letters>`, or just the letters without a prefix.
pub fn random_name(prefix: Option<&str>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..8).map(|_| char::from(rng.gen_range(b'A'..=b'Z'))).collect();
    match prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}_{suffix}"),
        None => suffix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_objects_and_arrays() {
        let mut base = json!({ "name": "bot", "intents": [{"name": "A"}], "nested": { "a": 1 } });
        merge_json(
            &mut base,
            json!({ "intents": [{"name": "B"}], "nested": { "b": 2 }, "locale": "en-US", "name": null }),
        );

        assert_eq!(
            base,
            json!({
                "name": "bot",
                "intents": [{"name": "A"}, {"name": "B"}],
                "nested": { "a": 1, "b": 2 },
                "locale": "en-US"
            })
        );
    }

    #[test]
    fn test_scalar_replaced() {
        let mut base = json!({ "idleSessionTTLInSeconds": 300 });
        merge_json(&mut base, json!({ "idleSessionTTLInSeconds": 60 }));
        assert_eq!(base["idleSessionTTLInSeconds"], 60);
    }

    #[test]
    fn test_random_name_shape() {
        let name = random_name(Some("ci"));
        assert!(name.starts_with("ci_"));
        assert_eq!(name.len(), 11);
        assert!(name[3..].chars().all(|c| c.is_ascii_uppercase()));

        assert_eq!(random_name(None).len(), 8);
        assert_eq!(random_name(Some("")).len(), 8);
    }
}
