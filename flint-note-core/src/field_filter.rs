//! Dotted-path field projection (`"metadata.tags"`, `"*"`, `"a.*"`).

use serde_json::{Map, Value};

/// Project `value` down to the fields named by `specs`.
///
/// Unknown specs are silently dropped. `*` at any level copies every
/// sibling at that level; `a.*` copies the whole sub-object at `a`.
/// Non-object inputs are returned unchanged (there is nothing to project).
/// Projecting a spec like `a.b` can leave `a` as an empty object once `b`
/// turns out not to exist; such empty sub-objects are pruned from the
/// result unless `preserve_empty_objects` is set.
pub fn filter_value(value: &Value, specs: &[String], preserve_empty_objects: bool) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };
    if specs.is_empty() {
        return Value::Object(map.clone());
    }

    let mut result = Map::new();
    for spec in specs {
        apply_spec(map, &mut result, spec);
    }
    let mut projected = Value::Object(result);
    if !preserve_empty_objects {
        prune_empty_objects(&mut projected);
    }
    projected
}

/// Recursively drop `Value::Object` entries that are empty after
/// projection (but never the top-level object itself).
fn prune_empty_objects(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };
    for v in map.values_mut() {
        prune_empty_objects(v);
    }
    map.retain(|_, v| !matches!(v, Value::Object(inner) if inner.is_empty()));
}

fn apply_spec(source: &Map<String, Value>, dest: &mut Map<String, Value>, spec: &str) {
    if spec == "*" {
        for (k, v) in source {
            dest.insert(k.clone(), v.clone());
        }
        return;
    }

    let (head, rest) = match spec.split_once('.') {
        Some((h, r)) => (h, Some(r)),
        None => (spec, None),
    };
    if head.is_empty() {
        return;
    }

    let Some(source_value) = source.get(head) else {
        return;
    };

    match rest {
        None => {
            dest.insert(head.to_string(), source_value.clone());
        }
        Some(rest_spec) => {
            if rest_spec == "*" {
                dest.insert(head.to_string(), source_value.clone());
                return;
            }
            let Value::Object(sub_source) = source_value else {
                return;
            };
            let entry = dest
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(sub_dest) = entry else {
                return;
            };
            apply_spec(sub_source, sub_dest, rest_spec);
        }
    }
}

/// Validate a list of dotted specs without applying them.
///
/// Returns the specs that are syntactically malformed (`.x`, `x.`, `x..y`).
pub fn invalid_specs(specs: &[String]) -> Vec<String> {
    specs
        .iter()
        .filter(|spec| {
            spec.is_empty()
                || spec.starts_with('.')
                || spec.ends_with('.')
                || spec.contains("..")
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn projects_top_level_and_nested_fields() {
        let note = json!({
            "id": "general/x.md",
            "metadata": {"tags": ["a", "b"], "status": "x"},
        });
        let filtered = filter_value(&note, &["id".into(), "metadata.tags".into()], false);
        assert_eq!(filtered, json!({"id": "general/x.md", "metadata": {"tags": ["a", "b"]}}));
    }

    #[test]
    fn wildcard_copies_whole_subobject() {
        let note = json!({"metadata": {"tags": ["a"], "status": "x"}});
        let filtered = filter_value(&note, &["metadata.*".into()], false);
        assert_eq!(filtered, json!({"metadata": {"tags": ["a"], "status": "x"}}));
    }

    #[test]
    fn unknown_field_is_dropped_silently() {
        let note = json!({"id": "x"});
        let filtered = filter_value(&note, &["does_not_exist".into()], false);
        assert_eq!(filtered, json!({}));
    }

    #[test]
    fn detects_malformed_specs() {
        let bad = invalid_specs(&[".x".into(), "x.".into(), "x..y".into(), "ok".into()]);
        assert_eq!(bad, vec![".x".to_string(), "x.".to_string(), "x..y".to_string()]);
    }

    #[test]
    fn empty_subobject_is_pruned_by_default() {
        let note = json!({"id": "x", "metadata": {"status": "draft"}});
        let filtered = filter_value(&note, &["id".into(), "metadata.missing".into()], false);
        assert_eq!(filtered, json!({"id": "x"}));
    }

    #[test]
    fn preserve_empty_objects_keeps_the_empty_subobject() {
        let note = json!({"id": "x", "metadata": {"status": "draft"}});
        let filtered = filter_value(&note, &["id".into(), "metadata.missing".into()], true);
        assert_eq!(filtered, json!({"id": "x", "metadata": {}}));
    }
}
