//! CloudFormation template bodies, authored in either JSON or YAML.

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

/// Resource type of a DynamoDB table in a template.
pub const TABLE_RESOURCE_TYPE: &str = "AWS::DynamoDB::Table";

/// A parsed template, remembering the format it was written in.
///
/// YAML templates are kept as `serde_yaml::Value` so short-form
/// intrinsic functions (`!Ref`, `!GetAtt`, `!Sub`) can be expanded when
/// the template is written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Template {
    Json(JsonValue),
    Yaml(YamlValue),
}

impl Template {
    /// Parses a template body as JSON, falling back to YAML.
    pub fn parse(body: &str) -> Result<Self, String> {
        match serde_json::from_str::<JsonValue>(body) {
            Ok(value) => Ok(Self::Json(value)),
            Err(json_err) => serde_yaml::from_str::<YamlValue>(body)
                .map(Self::Yaml)
                .map_err(|yaml_err| format!("JSON: {json_err}; YAML: {yaml_err}")),
        }
    }

    /// Logical ids of the top-level `Resources` section, in template order.
    #[cfg(test)]
    pub fn resource_ids(&self) -> Vec<String> {
        match self {
            Self::Json(value) => value
                .get("Resources")
                .and_then(JsonValue::as_object)
                .map(|resources| resources.keys().cloned().collect())
                .unwrap_or_default(),
            Self::Yaml(value) => value
                .get("Resources")
                .and_then(YamlValue::as_mapping)
                .map(|resources| {
                    resources
                        .keys()
                        .filter_map(YamlValue::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Logical id of the `AWS::DynamoDB::Table` resource named `table_name`.
    ///
    /// Only literal `TableName` properties can match; a name computed by an
    /// intrinsic function is not resolved.
    pub fn table_logical_id(&self, table_name: &str) -> Option<String> {
        match self {
            Self::Json(value) => value
                .get("Resources")
                .and_then(JsonValue::as_object)?
                .iter()
                .find(|(_, resource)| {
                    resource.get("Type").and_then(JsonValue::as_str) == Some(TABLE_RESOURCE_TYPE)
                        && resource
                            .get("Properties")
                            .and_then(|properties| properties.get("TableName"))
                            .and_then(JsonValue::as_str)
                            == Some(table_name)
                })
                .map(|(logical_id, _)| logical_id.clone()),
            Self::Yaml(value) => value
                .get("Resources")
                .and_then(YamlValue::as_mapping)?
                .iter()
                .find(|(_, resource)| {
                    resource.get("Type").and_then(YamlValue::as_str) == Some(TABLE_RESOURCE_TYPE)
                        && resource
                            .get("Properties")
                            .and_then(|properties| properties.get("TableName"))
                            .and_then(YamlValue::as_str)
                            == Some(table_name)
                })
                .and_then(|(logical_id, _)| logical_id.as_str().map(str::to_string)),
        }
    }

    /// Returns a copy of the template without the resource `logical_id`.
    pub fn without_resource(&self, logical_id: &str) -> Self {
        let mut template = self.clone();
        match &mut template {
            Self::Json(value) => {
                if let Some(JsonValue::Object(resources)) = value.get_mut("Resources") {
                    *resources = resources
                        .iter()
                        .filter(|(id, _)| id.as_str() != logical_id)
                        .map(|(id, resource)| (id.clone(), resource.clone()))
                        .collect();
                }
            }
            Self::Yaml(value) => {
                if let Some(YamlValue::Mapping(resources)) = value.get_mut("Resources") {
                    *resources = resources
                        .iter()
                        .filter(|(id, _)| id.as_str() != Some(logical_id))
                        .map(|(id, resource)| (id.clone(), resource.clone()))
                        .collect();
                }
            }
        }
        template
    }

    /// Serializes the template as a JSON body.
    ///
    /// YAML templates are converted rather than re-emitted: a YAML writer
    /// leaves strings such as `yes` or `off` unquoted, and CloudFormation
    /// would read them back as booleans.
    pub fn to_body(&self) -> Result<String, String> {
        let value = match self {
            Self::Json(value) => value.clone(),
            Self::Yaml(value) => yaml_to_json(value)?,
        };
        serde_json::to_string(&value).map_err(|e| e.to_string())
    }
}

fn yaml_to_json(value: &YamlValue) -> Result<JsonValue, String> {
    Ok(match value {
        YamlValue::Null => JsonValue::Null,
        YamlValue::Bool(flag) => JsonValue::Bool(*flag),
        YamlValue::Number(number) => {
            if let Some(n) = number.as_i64() {
                JsonValue::from(n)
            } else if let Some(n) = number.as_u64() {
                JsonValue::from(n)
            } else {
                number.as_f64().map_or(JsonValue::Null, JsonValue::from)
            }
        }
        YamlValue::String(text) => JsonValue::String(text.clone()),
        YamlValue::Sequence(items) => {
            JsonValue::Array(items.iter().map(yaml_to_json).collect::<Result<_, _>>()?)
        }
        YamlValue::Mapping(mapping) => JsonValue::Object(
            mapping
                .iter()
                .map(|(key, value)| -> Result<(String, JsonValue), String> {
                    Ok((mapping_key(key)?, yaml_to_json(value)?))
                })
                .collect::<Result<_, String>>()?,
        ),
        YamlValue::Tagged(tagged) => {
            let tag = tagged.tag.to_string();
            let function = tag.trim_start_matches('!');
            intrinsic_function(function, &tagged.value)?
        }
    })
}

/// Long form of a short-form intrinsic function such as `!Sub` or `!GetAtt`.
fn intrinsic_function(function: &str, argument: &YamlValue) -> Result<JsonValue, String> {
    let (key, value) = match (function, argument) {
        ("Ref" | "Condition", _) => (function.to_string(), yaml_to_json(argument)?),
        // `!GetAtt Resource.Attribute` splits on the first dot.
        ("GetAtt", YamlValue::String(path)) => {
            let parts = match path.split_once('.') {
                Some((resource, attribute)) => vec![resource, attribute],
                None => vec![path.as_str()],
            };
            ("Fn::GetAtt".to_string(), JsonValue::from(parts))
        }
        _ => (format!("Fn::{function}"), yaml_to_json(argument)?),
    };

    let mut object = serde_json::Map::new();
    object.insert(key, value);
    Ok(JsonValue::Object(object))
}

fn mapping_key(key: &YamlValue) -> Result<String, String> {
    match key {
        YamlValue::String(text) => Ok(text.clone()),
        YamlValue::Bool(flag) => Ok(flag.to_string()),
        YamlValue::Number(number) => Ok(number.to_string()),
        YamlValue::Null => Ok("null".to_string()),
        other => Err(format!("unsupported mapping key {other:?}")),
    }
}
