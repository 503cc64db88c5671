//! Runtime checker library.
//!
//! Generated code calls `deBool`, `deNumber`, `deString`, `deField`, `deList`
//! and `deMapping` by name. [`RUNTIME_JS`] is the JavaScript those calls bind
//! to; the functions below follow the same contract over `serde_json::Value`,
//! with `None` standing for JavaScript `undefined`.
//!
//! Success returns the validated value, failure returns a [`DeError`]. Lists
//! and mappings collect every element failure before reporting.
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct DeError {
    pub message: String,
}

impl DeError {
    pub fn new(message: impl Into<String>) -> Self {
        DeError { message: message.into() }
    }
}

pub type DeResult = Result<Value, DeError>;

// ————————————————————————————————————————————————————————————————————————————
// PRIMITIVES
// ————————————————————————————————————————————————————————————————————————————

pub fn de_bool(x: Option<&Value>) -> DeResult {
    match x {
        Some(v @ Value::Bool(_)) => Ok(v.clone()),
        _ => Err(DeError::new(format!("Could not deserialize \"{}\" into a bool.", js_string(x)))),
    }
}

pub fn de_number(x: Option<&Value>) -> DeResult {
    match x {
        Some(v @ Value::Number(_)) => Ok(v.clone()),
        _ => Err(DeError::new(format!("Could not deserialize \"{}\" into a number.", js_string(x)))),
    }
}

pub fn de_string(x: Option<&Value>) -> DeResult {
    match x {
        Some(v @ Value::String(_)) => Ok(v.clone()),
        _ => Err(DeError::new(format!("Could not deserialize \"{}\" into a string.", js_string(x)))),
    }
}

pub fn de_field<F>(name: &str, deserializer: F, x: Option<&Value>) -> DeResult
where
    F: Fn(Option<&Value>) -> DeResult,
{
    deserializer(x).map_err(|e| {
        DeError::new(format!("Could not deserialize field {name}: {}", e.message))
    })
}

/// Validate every element; fail with all element errors, in order.
pub fn de_list<F>(element: F, x: Option<&Value>) -> DeResult
where
    F: Fn(Option<&Value>) -> DeResult,
{
    let Some(Value::Array(items)) = x else {
        return Err(DeError::new(format!(
            "Could not deserialize \"{}\" into an Array",
            js_string(x),
        )));
    };
    collect_all(items.iter().map(|item| element(Some(item)))).map(Value::Array)
}

/// Keys and values are validated as two independent lists; key `i` pairs
/// with value `i` afterwards.
pub fn de_mapping<K, V>(key: K, value: V, x: Option<&Value>) -> DeResult
where
    K: Fn(Option<&Value>) -> DeResult,
    V: Fn(Option<&Value>) -> DeResult,
{
    let (keys, values): (Vec<Value>, Vec<&Value>) = match x {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (Value::String(k.clone()), v)).unzip(),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (Value::String(i.to_string()), v))
            .unzip(),
        _ => {
            return Err(DeError::new(format!(
                "Could not deserialize {} into an object.",
                js_string(x),
            )));
        }
    };
    let keys = collect_all(keys.iter().map(|k| key(Some(k))))
        .map_err(|e| DeError::new(format!("Could not deserialize keys: {}", e.message)))?;
    let values = collect_all(values.into_iter().map(|v| value(Some(v))))
        .map_err(|e| DeError::new(format!("Could not deserialize values: {}", e.message)))?;

    let mut out = Map::new();
    for (k, v) in keys.into_iter().zip(values) {
        let k = match k {
            Value::String(s) => s,
            other => js_string(Some(&other)),
        };
        out.insert(k, v);
    }
    Ok(Value::Object(out))
}

fn collect_all<I>(results: I) -> Result<Vec<Value>, DeError>
where
    I: Iterator<Item = DeResult>,
{
    let mut list = Vec::new();
    let mut errors = Vec::new();
    for (index, result) in results.enumerate() {
        match result {
            Ok(v) => list.push(v),
            Err(e) => errors.push(format!("at index {index}: {}", e.message)),
        }
    }
    if errors.is_empty() {
        Ok(list)
    } else {
        Err(DeError::new(format!(
            "Could not deserialize list due to errors in the elements: {}",
            errors.join("\n"),
        )))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// JAVASCRIPT COERCIONS
// ————————————————————————————————————————————————————————————————————————————

/// `String(x)`.
pub fn js_string(x: Option<&Value>) -> String {
    match x {
        None => "undefined".to_string(),
        Some(Value::Null) => "null".to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => js_number(n),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(Some(other)),
            })
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".to_string(),
    }
}

/// `typeof x`.
pub fn js_typeof(x: Option<&Value>) -> &'static str {
    match x {
        None => "undefined",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Null | Value::Array(_) | Value::Object(_)) => "object",
    }
}

/// `JSON.stringify(x)`; `undefined` has no JSON text.
pub fn json_stringify(x: Option<&Value>) -> String {
    match x {
        None => "undefined".to_string(),
        Some(v) => v.to_string(),
    }
}

fn js_number(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if !(n.is_i64() || n.is_u64()) && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            format!("{f:.0}")
        }
        _ => n.to_string(),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUNDLED SOURCE
// ————————————————————————————————————————————————————————————————————————————

/// The checker library generated files import from.
pub const RUNTIME_JS: &str = r#"// @flow strict

export const deBool = (x: mixed): boolean | Error => {
  if(typeof x != 'boolean') {
    return new Error('Could not deserialize "' + String(x) + '" into a bool.')
  }
  else {
    return x
  }
}

export const deNumber = (x: mixed): number | Error => {
  if(typeof x != 'number') {
    return new Error('Could not deserialize "' + String(x) + '" into a number.')
  }
  else {
    return x
  }
}

export const deString = (x: mixed): string | Error => {
  if(typeof x != 'string') {
    return new Error('Could not deserialize "' + String(x) + '" into a string.')
  }
  else {
    return x
  }
}

export const deField = <T>(
  name: string,
  deserializer: (mixed) => T | Error,
  x: mixed,
): T | Error => {
  const deserialized = deserializer(x)
  if(deserialized instanceof Error) {
    return new Error('Could not deserialize field ' + name + ': ' + deserialized.message)
  }
  else {
    return deserialized
  }
}

export const deList = <T>(
  elementDeserializer: (mixed) => T | Error,
  value: mixed,
): Array<T> | Error => {
  if(Array.isArray(value)) {
    const list: Array<T> = []
    const errors: Array<string> = []
    value.forEach((element: mixed, index: number) => {
      const result = elementDeserializer(element)
      if(result instanceof Error) {
        errors.push('at index ' + String(index) + ': ' + result.message)
      }
      else {
        list.push(result)
      }
    })
    if(errors.length > 0) {
      return new Error('Could not deserialize list due to errors in the elements: ' + errors.join('\n'))
    }
    else {
      return list
    }
  }
  else {
    return new Error('Could not deserialize "' + String(value) + '" into an Array')
  }
}

export const deMapping = <K: string, V>(
  keyDeserializer: (mixed) => K | Error,
  valueDeserializer: (mixed) => V | Error,
  x: mixed,
): {[K]: V} | Error => {
  if(x == null || typeof x != 'object') {
    return new Error('Could not deserialize ' + String(x) + ' into an object.')
  }
  else {
    const keys = deList(keyDeserializer, Object.keys(x))
    if(keys instanceof Error) {
      return new Error('Could not deserialize keys: ' + keys.message)
    }
    else {
      const values = deList(valueDeserializer, Object.values(x))
      if(values instanceof Error) {
        return new Error('Could not deserialize values: ' + values.message)
      }
      else {
        const result: {[K]: V} = {}
        for(let i = 0; i < keys.length; ++i) {
          result[keys[i]] = values[i]
        }
        return result
      }
    }
  }
}
"#;

// ------------------------------- Tests ------------------------------------ //
