use std::collections::HashMap;
use std::path::Path;

use serde_yaml::Value;

use super::ConfigError;

/// Read a YAML file (if it exists) and merge its flattened keys into `values`.
pub(crate) fn load_yaml_file(path: &Path, values: &mut HashMap<String, Value>) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
    load_yaml_str(&content, values)
        .map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))
}

pub(crate) fn load_yaml_str(content: &str, values: &mut HashMap<String, Value>) -> Result<(), ConfigError> {
    let yaml: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
    flatten("", &yaml, values);
    Ok(())
}

/// Flatten a YAML tree into dot-separated keys.
///
/// Interior mappings and sequences are kept under their own key as well, so
/// a whole section can be deserialized at once (`data.managers`) while leaves
/// stay individually overridable from the environment.
pub(crate) fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, Value>) {
    match value {
        Value::Mapping(map) => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), value.clone());
            }
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => scalar_to_string(other),
                };
                let full_key = if prefix.is_empty() {
                    key
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&full_key, v, out);
            }
        }
        Value::Sequence(seq) => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), value.clone());
                for (i, item) in seq.iter().enumerate() {
                    flatten(&format!("{prefix}.{i}"), item, out);
                }
            }
        }
        leaf => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), leaf.clone());
            }
        }
    }
}

/// Environment values are parsed as YAML scalars so `"5"` reads back as a
/// number and `"true"` as a bool; anything unparsable stays a string.
pub(crate) fn env_value(raw: &str) -> Value {
    match serde_yaml::from_str::<Value>(raw) {
        Ok(v @ (Value::Bool(_) | Value::Number(_) | Value::Null)) => v,
        _ => Value::String(raw.to_string()),
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "null".to_string(),
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_mappings_and_keeps_sections() {
        let mut values = HashMap::new();
        load_yaml_str(
            "data:\n  managers:\n    primary:\n      url: \"sqlite::memory:\"\n",
            &mut values,
        )
        .unwrap();

        assert_eq!(
            values.get("data.managers.primary.url"),
            Some(&Value::String("sqlite::memory:".into()))
        );
        assert!(matches!(values.get("data.managers"), Some(Value::Mapping(_))));
        assert!(matches!(values.get("data"), Some(Value::Mapping(_))));
    }

    #[test]
    fn sequences_are_indexed() {
        let mut values = HashMap::new();
        load_yaml_str("names: [a, b]", &mut values).unwrap();
        assert_eq!(values.get("names.1"), Some(&Value::String("b".into())));
        assert!(matches!(values.get("names"), Some(Value::Sequence(_))));
    }

    #[test]
    fn env_values_parse_scalars() {
        assert_eq!(env_value("5"), Value::Number(5.into()));
        assert_eq!(env_value("true"), Value::Bool(true));
        assert_eq!(env_value("sqlite::memory:"), Value::String("sqlite::memory:".into()));
        assert_eq!(env_value("a: b"), Value::String("a: b".into()));
    }
}
