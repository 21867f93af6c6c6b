use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Types that can be requested as schema-constrained model output.
///
/// Automatically implemented for any type that implements `JsonSchema + DeserializeOwned`.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode JSON schema for this type.
    ///
    /// Strict decoding requires:
    /// 1. `additionalProperties: false` on all object schemas
    /// 2. ALL properties listed in `required`, even defaulted ones
    /// 3. Fully inlined schemas (no `$ref` references)
    fn openai_schema() -> Value {
        let schema = schema_for!(Self);
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        strict_schema(&mut value);
        value
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Rewrite a schemars root schema in place into strict form.
pub fn strict_schema(value: &mut Value) {
    let definitions = match value {
        Value::Object(map) => map.remove("definitions"),
        _ => None,
    };

    if let Some(defs) = definitions {
        inline_refs(value, &defs);
    }

    close_objects(value);

    if let Value::Object(map) = value {
        map.remove("$schema");
        map.remove("title");
    }
}

fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.get("type").and_then(Value::as_str) == Some("object") {
                map.insert("additionalProperties".to_string(), Value::Bool(false));

                let required = required_keys(map);
                if let Some(keys) = required {
                    map.insert("required".to_string(), Value::Array(keys));
                }
            }

            for (_, v) in map.iter_mut() {
                close_objects(v);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                close_objects(item);
            }
        }
        _ => {}
    }
}

fn required_keys(map: &Map<String, Value>) -> Option<Vec<Value>> {
    let props = map.get("properties")?.as_object()?;
    Some(props.keys().map(|k| Value::String(k.clone())).collect())
}

fn inline_refs(value: &mut Value, definitions: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(target) = map
                .get("$ref")
                .and_then(Value::as_str)
                .and_then(|r| r.strip_prefix("#/definitions/"))
                .and_then(|name| definitions.get(name))
            {
                *value = target.clone();
                inline_refs(value, definitions);
                return;
            }

            // schemars wraps documented references as `allOf: [{$ref}]`
            let single_all_of = match map.get("allOf") {
                Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.first().cloned(),
                _ => None,
            };
            if let Some(inner) = single_all_of {
                let description = map.get("description").cloned();
                *value = inner;
                inline_refs(value, definitions);
                if let (Some(desc), Value::Object(resolved)) = (description, &mut *value) {
                    resolved.insert("description".to_string(), desc);
                }
                return;
            }

            for (_, v) in map.iter_mut() {
                inline_refs(v, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                inline_refs(item, definitions);
            }
        }
        _ => {}
    }
}
