//! YAML frontmatter codec (component B).

use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// The fields the engine owns and writes on every save; callers may not
/// set these through the metadata-update path.
pub const PROTECTED_FIELDS: &[&str] = &["title", "filename", "created", "updated"];

/// Result of splitting and parsing a note file's frontmatter.
#[derive(Debug, Clone, Default)]
pub struct Frontmatter {
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub body: String,
}

/// Parse a full note file's text into frontmatter + body.
///
/// Malformed frontmatter is a soft failure: the file is returned with
/// empty metadata and its original text as the body, rather than an
/// error, so a hand-edited file never becomes unreadable.
pub fn parse(raw: &str) -> Frontmatter {
    let Some(rest) = raw.strip_prefix(&format!("{DELIMITER}\n")) else {
        return Frontmatter {
            metadata: BTreeMap::new(),
            body: raw.to_string(),
        };
    };

    let Some(end) = find_closing_delimiter(rest) else {
        return Frontmatter {
            metadata: BTreeMap::new(),
            body: raw.to_string(),
        };
    };

    let (yaml_block, body) = rest.split_at(end);
    let body = body
        .strip_prefix(&format!("\n{DELIMITER}\n"))
        .or_else(|| body.strip_prefix(&format!("\n{DELIMITER}")))
        .unwrap_or(body);

    match serde_yaml::from_str::<serde_yaml::Value>(yaml_block) {
        Ok(serde_yaml::Value::Mapping(map)) => {
            let metadata = map
                .into_iter()
                .filter_map(|(k, v)| {
                    let key = k.as_str()?.to_string();
                    let value = yaml_to_json(v);
                    Some((key, value))
                })
                .collect();
            Frontmatter {
                metadata,
                body: body.to_string(),
            }
        }
        _ => Frontmatter {
            metadata: BTreeMap::new(),
            body: raw.to_string(),
        },
    }
}

fn find_closing_delimiter(rest: &str) -> Option<usize> {
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches('\n');
        if trimmed == DELIMITER {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn yaml_to_json(value: serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

/// Serialise metadata + body back into a full note file, with a
/// deterministic key order: title, type, filename, created, updated, then
/// the remaining keys sorted lexicographically.
pub fn serialize(metadata: &BTreeMap<String, serde_json::Value>, body: &str) -> String {
    let mut ordered: Vec<(&String, &serde_json::Value)> = Vec::with_capacity(metadata.len());
    for key in ["title", "type", "filename", "created", "updated"] {
        if let Some((k, v)) = metadata.get_key_value(key) {
            ordered.push((k, v));
        }
    }
    let mut rest: Vec<(&String, &serde_json::Value)> = metadata
        .iter()
        .filter(|(k, _)| !PROTECTED_FIELDS.contains(&k.as_str()) && k.as_str() != "type")
        .collect();
    rest.sort_by(|a, b| a.0.cmp(b.0));
    ordered.extend(rest);

    let mut yaml = String::new();
    for (key, value) in ordered {
        yaml.push_str(&render_entry(key, value));
    }

    format!("{DELIMITER}\n{yaml}{DELIMITER}\n{body}")
}

fn render_entry(key: &str, value: &serde_json::Value) -> String {
    let yaml_value = json_to_yaml(value);
    let rendered = serde_yaml::to_string(&yaml_value).unwrap_or_default();
    let rendered = rendered.trim_end_matches('\n');
    if rendered.contains('\n') {
        format!("{key}:\n{}\n", indent(rendered))
    } else {
        format!("{key}: {rendered}\n")
    }
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn json_to_yaml(value: &serde_json::Value) -> serde_yaml::Value {
    serde_yaml::to_value(value).unwrap_or(serde_yaml::Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_frontmatter_and_body() {
        let raw = "---\ntitle: Hello\ntags:\n  - a\n  - b\n---\nbody text\n";
        let parsed = parse(raw);
        assert_eq!(parsed.metadata.get("title"), Some(&json!("Hello")));
        assert_eq!(parsed.metadata.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(parsed.body, "body text\n");
    }

    #[test]
    fn missing_frontmatter_is_soft_failure() {
        let raw = "just a plain note, no frontmatter";
        let parsed = parse(raw);
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, raw);
    }

    #[test]
    fn unterminated_frontmatter_is_soft_failure() {
        let raw = "---\ntitle: Hello\nbody without closing delimiter";
        let parsed = parse(raw);
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, raw);
    }

    #[test]
    fn serialize_orders_system_fields_first() {
        let mut metadata = BTreeMap::new();
        metadata.insert("zeta".to_string(), json!("z"));
        metadata.insert("title".to_string(), json!("Hello"));
        metadata.insert("type".to_string(), json!("general"));
        let rendered = serialize(&metadata, "body\n");
        let title_pos = rendered.find("title:").unwrap();
        let zeta_pos = rendered.find("zeta:").unwrap();
        assert!(title_pos < zeta_pos);
        assert!(rendered.ends_with("body\n"));
    }

    #[test]
    fn round_trips_through_parse_and_serialize() {
        let mut metadata = BTreeMap::new();
        metadata.insert("title".to_string(), json!("Hello World"));
        metadata.insert("type".to_string(), json!("general"));
        let written = serialize(&metadata, "content body\n");
        let parsed = parse(&written);
        assert_eq!(parsed.metadata.get("title"), Some(&json!("Hello World")));
        assert_eq!(parsed.body, "content body\n");
    }
}
