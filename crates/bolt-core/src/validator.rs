use crate::catalog::{Task, TaskCatalog};
use crate::error::{ProxyError, ValidationError};
use crate::options::{option_schema, scrub, OptionDescriptor, OptionType, OptionValue};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

const REQUIRED_FIELDS: [&str; 4] = ["name", "parameters", "targets", "options"];

/// A fully normalized run request, ready to become a job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedRun {
    pub name: String,
    pub parameters: Map<String, Value>,
    pub targets: Vec<String>,
    pub options: BTreeMap<String, OptionValue>,
}

pub struct RequestValidator {
    catalog: Arc<TaskCatalog>,
}

impl RequestValidator {
    pub fn new(catalog: Arc<TaskCatalog>) -> Self {
        Self { catalog }
    }

    /// Check a raw `{name, parameters, targets, options}` request against the
    /// catalog and the option schema.
    ///
    /// Catalog failures are returned as-is; everything else the caller got
    /// wrong is a [`ValidationError`].
    pub async fn validate(&self, request: &Value) -> Result<ValidatedRun, ProxyError> {
        let data = request.as_object().ok_or(ValidationError::NotAnObject)?;

        let missing: Vec<String> = REQUIRED_FIELDS
            .iter()
            .filter(|field| !data.contains_key(**field))
            .map(|field| field.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingFields(missing).into());
        }

        let name = data["name"]
            .as_str()
            .filter(|name| !name.is_empty())
            .ok_or(ValidationError::EmptyName)?;
        info!("Task: {}", name);

        let tasks = self.catalog.get(false).await?;
        let task = tasks
            .get(name)
            .ok_or_else(|| ValidationError::UnknownTask(name.to_string()))?;

        let parameters = validate_parameters(task, &data["parameters"])?;
        debug!("Normalized parameters: {:?}", parameters);

        let targets = parse_targets(&data["targets"])?;
        debug!("Targets: {:?}", targets);

        let options = validate_options(&data["options"])?;
        info!("Final options: {}", scrub(&options));

        Ok(ValidatedRun {
            name: name.to_string(),
            parameters,
            targets,
            options,
        })
    }
}

fn validate_parameters(task: &Task, raw: &Value) -> Result<Map<String, Value>, ValidationError> {
    let params = match raw {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        _ => return Err(ValidationError::ParametersNotMapping),
    };

    let missing: Vec<String> = task
        .required_parameters()
        .filter(|name| !params.contains_key(*name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingParameters(missing));
    }

    let unknown: Vec<String> = params
        .keys()
        .filter(|key| !task.parameters.contains_key(key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownParameters(unknown));
    }

    Ok(normalize_values(params))
}

/// Accept `"a, b"` or `["a", "b,c"]`; every entry is split on commas and trimmed.
fn parse_targets(raw: &Value) -> Result<Vec<String>, ValidationError> {
    let pieces: Vec<&str> = match raw {
        Value::String(s) => vec![s.as_str()],
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().ok_or(ValidationError::InvalidTargets))
            .collect::<Result<_, _>>()?,
        _ => return Err(ValidationError::InvalidTargets),
    };

    let targets: Vec<String> = pieces
        .iter()
        .flat_map(|piece| piece.split(','))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_string)
        .collect();

    if targets.is_empty() {
        return Err(ValidationError::EmptyTargets);
    }
    Ok(targets)
}

fn validate_options(raw: &Value) -> Result<BTreeMap<String, OptionValue>, ValidationError> {
    let options = match raw {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        _ => return Err(ValidationError::OptionsNotMapping),
    };

    let schema = option_schema();
    let unknown: Vec<String> = options
        .keys()
        .filter(|key| !schema.contains_key(key.as_str()))
        .cloned()
        .collect();
    if !unknown.is_empty() {
        return Err(ValidationError::UnknownOptions(unknown));
    }

    let options = normalize_values(options);

    let mut validated = BTreeMap::new();
    for (key, value) in options {
        let descriptor = &schema[key.as_str()];
        let value = coerce_option(&key, descriptor, value)?;
        validated.insert(key, value);
    }

    for (key, descriptor) in schema {
        if let Some(default) = &descriptor.default {
            validated
                .entry(key.to_string())
                .or_insert_with(|| default.clone());
        }
    }

    Ok(validated)
}

fn coerce_option(
    key: &str,
    descriptor: &OptionDescriptor,
    value: Value,
) -> Result<OptionValue, ValidationError> {
    match &descriptor.option_type {
        OptionType::Boolean => match value {
            Value::Bool(b) => Ok(OptionValue::Bool(b)),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(OptionValue::Bool(true)),
                "false" => Ok(OptionValue::Bool(false)),
                other => Err(ValidationError::InvalidBoolean {
                    option: key.to_string(),
                    value: other.to_string(),
                }),
            },
            other => Err(ValidationError::InvalidBoolean {
                option: key.to_string(),
                value: other.to_string(),
            }),
        },
        OptionType::String => match value {
            Value::String(s) if s.trim().is_empty() => Err(ValidationError::EmptyOption {
                option: key.to_string(),
            }),
            Value::String(s) => Ok(OptionValue::Str(s.trim().to_string())),
            _ => Err(ValidationError::NotAString {
                option: key.to_string(),
            }),
        },
        OptionType::OneOf(allowed) => match value.as_str().map(str::trim) {
            Some(s) if allowed.iter().any(|v| *v == s) => Ok(OptionValue::Str(s.to_string())),
            _ => Err(ValidationError::NotInSet {
                option: key.to_string(),
                allowed: allowed.iter().map(|v| v.to_string()).collect(),
            }),
        },
    }
}

/// Blank strings, empty lists and nulls mean "not provided" and are dropped.
/// Strings, and strings inside lists, are trimmed.
pub fn normalize_values(values: Map<String, Value>) -> Map<String, Value> {
    values
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::Null => return None,
                Value::String(s) => {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        return None;
                    }
                    Value::String(trimmed.to_string())
                }
                Value::Array(items) => {
                    if items.is_empty() {
                        return None;
                    }
                    Value::Array(
                        items
                            .into_iter()
                            .map(|item| match item {
                                Value::String(s) => Value::String(s.trim().to_string()),
                                other => other,
                            })
                            .collect(),
                    )
                }
                other => other,
            };
            Some((key, value))
        })
        .collect()
}
