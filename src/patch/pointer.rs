//! Path resolution for patch operations.
//!
//! Paths follow JSON Pointer syntax (`/spec/indicators/0/name`, with `~0`
//! and `~1` escapes) and accept two extensions on arrays:
//! - `-` designates the position after the last element (for `add`);
//! - `key=value` selects the first object element whose `key` attribute
//!   equals `value`, e.g. `/spec/indicators/name=latency/thresholds/level=warning`.

use super::error::PatchError;
use serde_json::Value;

/// Splits a path into unescaped tokens. The empty path designates the root.
pub fn parse_path(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    if !path.starts_with('/') {
        return Err(PatchError::InvalidPath(path.to_string()));
    }
    Ok(path[1..]
        .split('/')
        .map(|token| token.replace("~1", "/").replace("~0", "~"))
        .collect())
}

fn selector_matches(element: &Value, key: &str, expected: &str) -> bool {
    match element.get(key) {
        Some(Value::String(value)) => value == expected,
        Some(Value::Number(value)) => value.to_string() == expected,
        Some(Value::Bool(value)) => value.to_string() == expected,
        _ => false,
    }
}

/// Resolves a token against an array, returning an existing element index.
fn array_index(array: &[Value], token: &str, path: &str) -> Result<usize, PatchError> {
    if let Some((key, expected)) = token.split_once('=') {
        return array
            .iter()
            .position(|element| selector_matches(element, key, expected))
            .ok_or_else(|| PatchError::PathNotFound(path.to_string()));
    }

    let index = parse_index(token, path)?;
    if index < array.len() {
        Ok(index)
    } else {
        Err(PatchError::PathNotFound(path.to_string()))
    }
}

fn parse_index(token: &str, path: &str) -> Result<usize, PatchError> {
    // leading zeros are not valid array indexes
    if token.is_empty() || (token.len() > 1 && token.starts_with('0')) {
        return Err(PatchError::InvalidIndex {
            path: path.to_string(),
            token: token.to_string(),
        });
    }
    token.parse::<usize>().map_err(|_| PatchError::InvalidIndex {
        path: path.to_string(),
        token: token.to_string(),
    })
}

fn child<'a>(value: &'a Value, token: &str, path: &str) -> Result<&'a Value, PatchError> {
    match value {
        Value::Object(map) => map
            .get(token)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(array) => Ok(&array[array_index(array, token, path)?]),
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

fn child_mut<'a>(value: &'a mut Value, token: &str, path: &str) -> Result<&'a mut Value, PatchError> {
    match value {
        Value::Object(map) => map
            .get_mut(token)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(array) => {
            let index = array_index(array, token, path)?;
            Ok(&mut array[index])
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

pub fn get<'a>(root: &'a Value, tokens: &[String], path: &str) -> Result<&'a Value, PatchError> {
    tokens
        .iter()
        .try_fold(root, |value, token| child(value, token, path))
}

pub fn get_mut<'a>(
    root: &'a mut Value,
    tokens: &[String],
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for token in tokens {
        current = child_mut(current, token, path)?;
    }
    Ok(current)
}

/// Adds a value, inserting into arrays and setting object members.
pub fn add(root: &mut Value, tokens: &[String], path: &str, value: Value) -> Result<(), PatchError> {
    let Some((last, parents)) = tokens.split_last() else {
        *root = value;
        return Ok(());
    };

    match get_mut(root, parents, path)? {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(array) => {
            let index = if last == "-" {
                array.len()
            } else if last.contains('=') {
                array_index(array, last, path)?
            } else {
                let index = parse_index(last, path)?;
                if index > array.len() {
                    return Err(PatchError::PathNotFound(path.to_string()));
                }
                index
            };
            array.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

/// Removes and returns the designated value.
pub fn remove(root: &mut Value, tokens: &[String], path: &str) -> Result<Value, PatchError> {
    let Some((last, parents)) = tokens.split_last() else {
        return Err(PatchError::InvalidPath(path.to_string()));
    };

    match get_mut(root, parents, path)? {
        Value::Object(map) => map
            .remove(last)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(array) => {
            let index = array_index(array, last, path)?;
            Ok(array.remove(index))
        }
        _ => Err(PatchError::NotAContainer(path.to_string())),
    }
}

/// Replaces an existing value. The target must exist.
pub fn replace(
    root: &mut Value,
    tokens: &[String],
    path: &str,
    value: Value,
) -> Result<(), PatchError> {
    let target = get_mut(root, tokens, path)?;
    *target = value;
    Ok(())
}
