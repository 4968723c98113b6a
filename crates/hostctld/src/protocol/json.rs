//! JSON input: the `run` protocol, the flat protocol and JSON strings.

use serde_json::{Map, Number, Value};

use super::errors::ChannelError;
use super::legacy::parse_actions;
use super::request::{ActionBatch, ActionRequest, Origin, ReplyShape};
use crate::session::Action;

/// Parses a unit whose first character is `{` or `[`.
pub(super) fn parse_structured(
    text: &str,
    syntax_shape: ReplyShape,
) -> Result<ActionBatch, ChannelError> {
    let value: Value =
        serde_json::from_str(text).map_err(|error| syntax_error(&error, syntax_shape))?;
    match value {
        Value::Object(map) if map.contains_key("run") => parse_run(map),
        Value::Object(map) => {
            let action = parse_action_spec(&map)
                .map_err(|message| ChannelError::semantic(message, ReplyShape::Flat))?;
            Ok(ActionBatch::new(vec![flat_request(action)]))
        }
        Value::Array(items) => parse_flat_array(&items),
        _ => Err(ChannelError::semantic(
            "Not a struct or array",
            ReplyShape::Flat,
        )),
    }
}

/// Parses a unit holding one or more whitespace-separated JSON strings.
pub(super) fn parse_strings(
    text: &str,
    syntax_shape: ReplyShape,
    reply: ReplyShape,
) -> Result<ActionBatch, ChannelError> {
    let mut requests = Vec::new();
    for item in serde_json::Deserializer::from_str(text).into_iter::<Value>() {
        let value = item.map_err(|error| syntax_error(&error, syntax_shape))?;
        let Value::String(line) = value else {
            return Err(ChannelError::semantic("Not a string", reply));
        };
        let steps = parse_actions(&line)
            .map_err(|error| ChannelError::semantic(error.to_string(), reply))?;
        requests.extend(ActionRequest::new(steps, Origin::JsonString, reply));
    }
    Ok(ActionBatch::new(requests))
}

fn parse_run(mut map: Map<String, Value>) -> Result<ActionBatch, ChannelError> {
    let semantic = |message: &str| ChannelError::semantic(message, ReplyShape::Run);
    if let Some(key) = map.keys().find(|key| key.as_str() != "run") {
        return Err(semantic(&format!("Unknown struct element '{key}'")));
    }
    let Some(Value::Object(mut body)) = map.remove("run") else {
        return Err(semantic("Invalid 'run' type"));
    };
    let r_tag = match body.remove("r-tag") {
        None => None,
        Some(Value::String(tag)) => Some(tag),
        Some(_) => return Err(semantic("Invalid 'r-tag' type")),
    };
    let Some(actions) = body.remove("actions") else {
        return Err(semantic("Missing struct element 'actions'"));
    };
    if let Some(key) = body.keys().next() {
        return Err(semantic(&format!("Unknown struct element '{key}'")));
    }

    let specs = match actions {
        Value::Object(spec) => {
            vec![parse_action_spec(&spec).map_err(|message| semantic(&message))?]
        }
        Value::Array(items) if items.is_empty() => {
            return Err(semantic("Empty 'actions' array"));
        }
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                parse_element(item)
                    .map_err(|message| semantic(&format!("Element {index}: {message}")))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => return Err(semantic("Invalid 'actions' type")),
    };

    let requests = specs
        .into_iter()
        .map(|action| {
            ActionRequest::single(action, Origin::JsonObject, ReplyShape::Run)
                .with_tag(r_tag.clone())
        })
        .collect();
    Ok(ActionBatch::new(requests))
}

fn parse_flat_array(items: &[Value]) -> Result<ActionBatch, ChannelError> {
    if items.is_empty() {
        return Err(ChannelError::semantic("Empty array", ReplyShape::Flat));
    }
    let mut requests = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let action = parse_element(item).map_err(|message| {
            ChannelError::semantic(format!("Element {index}: {message}"), ReplyShape::Flat)
        })?;
        requests.push(flat_request(action));
    }
    Ok(ActionBatch::new(requests))
}

fn flat_request(action: Action) -> ActionRequest {
    ActionRequest::single(action, Origin::JsonObject, ReplyShape::Flat)
}

fn parse_element(value: &Value) -> Result<Action, String> {
    match value {
        Value::Object(map) => parse_action_spec(map),
        _ => Err("Not a struct".to_owned()),
    }
}

/// Validates one `{"action": …, "args": […]}` object.
///
/// The action is checked before any other member, so a missing or mistyped
/// `action` wins over an unknown key.
fn parse_action_spec(map: &Map<String, Value>) -> Result<Action, String> {
    let name = match map.get("action") {
        None => return Err("Missing struct element 'action'".to_owned()),
        Some(Value::String(action)) => action.clone(),
        Some(_) => return Err("Invalid 'action' type".to_owned()),
    };
    let mut args = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            "action" => {}
            "args" => {
                let Value::Array(items) = value else {
                    return Err("Invalid 'args' type".to_owned());
                };
                args = items
                    .iter()
                    .map(scalar_arg)
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| "Invalid arg type".to_owned())?;
            }
            other => return Err(format!("Unknown struct element '{other}'")),
        }
    }
    Ok(Action::new(name, args))
}

fn scalar_arg(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number_arg(number)),
        Value::String(text) => Some(text.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn number_arg(number: &Number) -> String {
    match (number.as_i64(), number.as_u64(), number.as_f64()) {
        (Some(signed), _, _) => signed.to_string(),
        (None, Some(unsigned), _) => unsigned.to_string(),
        (None, None, Some(float)) => float.to_string(),
        (None, None, None) => number.to_string(),
    }
}

fn syntax_error(error: &serde_json::Error, shape: ReplyShape) -> ChannelError {
    let line = error.line();
    let column = error.column();
    let full = error.to_string();
    let suffix = format!(" at line {line} column {column}");
    let detail = full.strip_suffix(&suffix).unwrap_or(&full);
    ChannelError::syntax(
        format!("JSON parse error: line {line}, column {column}: {detail}"),
        shape,
    )
    .at(line, column)
}
