//! Binding-data enrichment from the trigger value.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use courier_core::BindingValue;
use serde_json::Value;

/// Merge the trigger value's flat fields into `binding_data`.
///
/// Keys already present are never overwritten. Returns the number of keys
/// added.
pub fn enrich_binding_data(
    binding_data: &mut HashMap<String, Value>,
    trigger: &BindingValue,
) -> usize {
    let Some(fields) = trigger.flat_fields() else {
        return 0;
    };

    let mut added = 0;
    for (key, value) in fields {
        if let Entry::Vacant(slot) = binding_data.entry(key) {
            slot.insert(value);
            added += 1;
        }
    }
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_existing_keys_win() {
        let mut data = HashMap::new();
        data.insert("id".to_string(), json!("explicit"));

        let trigger = BindingValue::Json(json!({ "id": 5, "name": "widget" }));
        assert_eq!(enrich_binding_data(&mut data, &trigger), 1);

        assert_eq!(data["id"], json!("explicit"));
        assert_eq!(data["name"], json!("widget"));
    }

    #[test]
    fn test_text_json_is_enriched() {
        let mut data = HashMap::new();
        let trigger = BindingValue::from(r#"{"queue":"orders"}"#);
        assert_eq!(enrich_binding_data(&mut data, &trigger), 1);
        assert_eq!(data["queue"], json!("orders"));
    }

    #[test]
    fn test_non_record_adds_nothing() {
        let mut data = HashMap::new();
        assert_eq!(enrich_binding_data(&mut data, &BindingValue::from("plain text")), 0);
        assert_eq!(enrich_binding_data(&mut data, &BindingValue::Bytes(vec![1, 2])), 0);
        assert_eq!(enrich_binding_data(&mut data, &BindingValue::Json(json!([1, 2]))), 0);
        assert!(data.is_empty());
    }
}
