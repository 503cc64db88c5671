//! In-memory backend.
//!
//! Interprets a [`Generator`] tree directly against `serde_json::Value`
//! instead of emitting text. Results and messages match what the emitted
//! validator returns for the same input, which makes this the executable
//! reference for the renderer.
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::ir::{Field, Generator, Sentinel, TypeExpr};
use crate::runtime::{self, js_string, js_typeof, json_stringify};

pub use crate::runtime::{DeError, DeResult};

/// Validate `value` against `de`, with no custom validators registered.
pub fn deserialize(de: &Generator, value: &Value) -> DeResult {
    Evaluator::new().run(de, Some(value))
}

/// Runs generator trees. `Custom` generators resolve against the named
/// generators registered with [`Evaluator::with`].
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    named: IndexMap<String, Generator>,
}

impl Evaluator {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, import: impl Into<String>, de: Generator) -> Self {
        self.named.insert(import.into(), de);
        self
    }

    /// `x` is `None` when the value is absent (`undefined`).
    pub fn run(&self, de: &Generator, x: Option<&Value>) -> DeResult {
        match de {
            Generator::Bool => runtime::de_bool(x),
            Generator::Number => runtime::de_number(x),
            Generator::String | Generator::FilePath => runtime::de_string(x),
            Generator::Value { ty, value } => literal(ty, value, x),
            Generator::Enum { ty, values } => enum_of(ty, values, x),
            Generator::Object { ty: _, fields, optional } => self.object(fields, optional, x),
            Generator::List { element } => runtime::de_list(|e| self.run(element, e), x),
            Generator::Mapping { key, value } => {
                runtime::de_mapping(|k| self.run(key, k), |v| self.run(value, v), x)
            }
            Generator::Sum { ty, discriminant, discriminant_type, variants } => {
                self.sum(ty, discriminant, discriminant_type, variants, x)
            }
            Generator::Custom { import, .. } => match self.named.get(import) {
                Some(named) => self.run(named, x),
                None => Err(DeError::new(format!("no validator is registered for `{import}`"))),
            },
        }
    }

    /// Fail-fast: the first failing field ends validation.
    fn object(&self, fields: &[Field], optional: &[Field], x: Option<&Value>) -> DeResult {
        let source = match x {
            Some(Value::Null) => {
                return Err(DeError::new("Could not deserialize json because the value is null."));
            }
            None => {
                return Err(DeError::new("Could not deserialize json because the value is undefined."));
            }
            Some(v @ (Value::Object(_) | Value::Array(_))) => v,
            Some(_) => {
                return Err(DeError::new(format!(
                    "Could not deserialize object \"{}\"",
                    js_string(x),
                )));
            }
        };
        let mut result = Map::new();
        for field in fields {
            let slot = source.as_object().and_then(|m| m.get(&field.name));
            result.insert(field.name.clone(), self.field(field, slot)?);
        }
        for field in optional {
            match source.as_object().and_then(|m| m.get(&field.name)) {
                None | Some(Value::Null) => {}
                slot => {
                    result.insert(field.name.clone(), self.field(field, slot)?);
                }
            }
        }
        Ok(Value::Object(result))
    }

    fn field(&self, field: &Field, slot: Option<&Value>) -> DeResult {
        runtime::de_field(&field.name, |y| self.run(&field.de, y), slot).map_err(|e| {
            DeError::new(format!("Could not deserialize field \"{}\": {}", field.name, e.message))
        })
    }

    fn sum(
        &self,
        ty: &TypeExpr,
        discriminant: &str,
        discriminant_type: &TypeExpr,
        variants: &[Sentinel],
        x: Option<&Value>,
    ) -> DeResult {
        let tag = match x {
            Some(Value::Object(map)) => match map.get(discriminant) {
                Some(tag @ Value::String(_)) => tag,
                _ => return Err(not_a_variant(ty, x)),
            },
            _ => return Err(not_a_variant(ty, x)),
        };
        let keys = variants.iter().map(|v| v.key.clone()).collect::<Vec<_>>();
        let tag = enum_of(discriminant_type, &keys, Some(tag)).map_err(|e| {
            DeError::new(format!(
                "Sentinel field {discriminant} could not deserialize properly: {}",
                e.message,
            ))
        })?;
        match variants.iter().find(|v| Some(v.key.as_str()) == tag.as_str()) {
            Some(variant) => self.run(&variant.de, x),
            None => Err(DeError::new("unreachable")),
        }
    }
}

fn not_a_variant(ty: &TypeExpr, x: Option<&Value>) -> DeError {
    DeError::new(format!("Could not deserialize object into {ty}: {}", json_stringify(x)))
}

fn literal(ty: &str, expected: &Value, x: Option<&Value>) -> DeResult {
    if js_typeof(x) != ty {
        return Err(DeError::new(format!(
            "Could not deserialize \"{}\" into a {ty}.",
            js_string(x),
        )));
    }
    match x {
        Some(v) if strict_equals(v, expected) => Ok(v.clone()),
        _ => Err(DeError::new(format!(
            "Could not deserialize \"{}\" into a {ty} with the value {expected}.",
            js_string(x),
        ))),
    }
}

/// `===` on JSON values; composite values are never identical.
fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::String(a), Value::String(b)) => a == b,
        _ => false,
    }
}

fn enum_of(ty: &TypeExpr, values: &[String], x: Option<&Value>) -> DeResult {
    let either = runtime::de_string(x).map_err(|e| {
        DeError::new(format!(
            "Could not deserialize \"{}\" into enum \"{ty}\": {}",
            js_string(x),
            e.message,
        ))
    })?;
    if values.iter().any(|v| either.as_str() == Some(v.as_str())) {
        Ok(either)
    } else {
        Err(DeError::new(format!(
            "Could not deserialize \"{}\" into one of the enum values: {}",
            js_string(x),
            values.join(", "),
        )))
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn point() -> Generator {
        Generator::object("Point", vec![
            Field::new("x", Generator::number()),
            Field::new("y", Generator::number()),
        ])
    }

    fn shape() -> Generator {
        let circle = Generator::object("Circle", vec![
            Field::new("kind", Generator::value("string", json!("circle"))),
            Field::new("r", Generator::number()),
        ]);
        let square = Generator::object("Square", vec![
            Field::new("kind", Generator::value("string", json!("square"))),
            Field::new("s", Generator::number()),
        ]);
        Generator::sum("Shape", "kind", "ShapeKind", vec![
            Sentinel::new("circle", circle),
            Sentinel::new("square", square),
        ])
    }

    #[test]
    fn point_accepts_valid_input() {
        assert_eq!(deserialize(&point(), &json!({"x": 1, "y": 2})), Ok(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn point_names_the_missing_field() {
        let err = deserialize(&point(), &json!({"x": 1})).unwrap_err();
        assert!(err.message.starts_with("Could not deserialize field \"y\": "), "{}", err.message);
        assert!(err.message.contains("\"undefined\" into a number"));
    }

    #[test]
    fn object_drops_undeclared_fields() {
        let out = deserialize(&point(), &json!({"x": 1, "y": 2, "z": 3})).unwrap();
        assert_eq!(out, json!({"x": 1, "y": 2}));
    }

    #[test]
    fn object_short_circuits_on_first_bad_field() {
        let three = Generator::object("Three", vec![
            Field::new("a", Generator::number()),
            Field::new("b", Generator::number()),
            Field::new("c", Generator::number()),
        ]);
        let err = deserialize(&three, &json!({"a": 1, "b": "bad", "c": "worse"})).unwrap_err();
        assert!(err.message.contains("field \"b\""));
        assert!(!err.message.contains("field \"c\""));
        assert!(!err.message.contains("worse"));
    }

    #[test]
    fn object_guards() {
        let err = deserialize(&point(), &json!(null)).unwrap_err();
        assert_eq!(err.message, "Could not deserialize json because the value is null.");
        let err = Evaluator::new().run(&point(), None).unwrap_err();
        assert_eq!(err.message, "Could not deserialize json because the value is undefined.");
        let err = deserialize(&point(), &json!(7)).unwrap_err();
        assert_eq!(err.message, "Could not deserialize object \"7\"");
    }

    #[test]
    fn optional_fields_may_be_absent_or_null() {
        let de = Generator::object_with_optional(
            "Note",
            vec![Field::new("id", Generator::number())],
            vec![Field::new("text", Generator::string())],
        );
        assert_eq!(deserialize(&de, &json!({"id": 1})), Ok(json!({"id": 1})));
        assert_eq!(deserialize(&de, &json!({"id": 1, "text": null})), Ok(json!({"id": 1})));
        assert_eq!(deserialize(&de, &json!({"id": 1, "text": "hi"})), Ok(json!({"id": 1, "text": "hi"})));
        let err = deserialize(&de, &json!({"id": 1, "text": 3})).unwrap_err();
        assert!(err.message.contains("field \"text\""));
    }

    #[test]
    fn optional_fields_only_see_own_properties() {
        let de = Generator::object_with_optional("Named", vec![], vec![Field::new("constructor", Generator::string())]);
        assert_eq!(deserialize(&de, &json!({})), Ok(json!({})));
        assert_eq!(deserialize(&de, &json!({"constructor": "x"})), Ok(json!({"constructor": "x"})));
    }

    #[test]
    fn list_of_strings() {
        let de = Generator::list(Generator::string());
        assert_eq!(deserialize(&de, &json!(["a", "b"])), Ok(json!(["a", "b"])));
        let err = deserialize(&de, &json!(["a", 2, "c"])).unwrap_err();
        assert_eq!(err.message.matches("at index ").count(), 1);
        assert!(err.message.contains("at index 1: Could not deserialize \"2\" into a string."));
    }

    #[test]
    fn list_collects_all_while_object_fails_fast() {
        let de = Generator::list(point());
        let err = deserialize(&de, &json!([{"x": 1, "y": 2}, {"x": "a"}, null, {"x": 1, "y": 2}, 5])).unwrap_err();
        assert_eq!(err.message.matches("at index ").count(), 3);
        assert!(err.message.contains("at index 1:"));
        assert!(err.message.contains("at index 2:"));
        assert!(err.message.contains("at index 4:"));
    }

    #[test]
    fn mapping_of_numbers() {
        let de = Generator::mapping(Generator::string(), Generator::number());
        assert_eq!(deserialize(&de, &json!({"a": 1})), Ok(json!({"a": 1})));
        assert!(deserialize(&de, &json!({"a": "1"})).is_err());
    }

    #[test]
    fn literal_values() {
        let de = Generator::value("string", json!("circle"));
        assert_eq!(deserialize(&de, &json!("circle")), Ok(json!("circle")));
        let err = deserialize(&de, &json!("square")).unwrap_err();
        assert_eq!(err.message, "Could not deserialize \"square\" into a string with the value \"circle\".");
        let err = deserialize(&de, &json!(1)).unwrap_err();
        assert_eq!(err.message, "Could not deserialize \"1\" into a string.");
        let one = Generator::value("number", json!(1));
        assert_eq!(deserialize(&one, &json!(1.0)), Ok(json!(1.0)));
    }

    #[test]
    fn enums_distinguish_kind_and_membership() {
        let de = Generator::enum_of("Color", ["red", "green"]);
        assert_eq!(deserialize(&de, &json!("red")), Ok(json!("red")));
        let err = deserialize(&de, &json!(3)).unwrap_err();
        assert!(err.message.starts_with("Could not deserialize \"3\" into enum \"Color\": "));
        let err = deserialize(&de, &json!("blue")).unwrap_err();
        assert_eq!(err.message, "Could not deserialize \"blue\" into one of the enum values: red, green");
    }

    #[test]
    fn sum_dispatches_like_the_variant() {
        let input = json!({"kind": "circle", "r": 5});
        let Generator::Sum { variants, .. } = shape() else { unreachable!() };
        let direct = deserialize(&variants[0].de, &input);
        assert_eq!(deserialize(&shape(), &input), direct);
        assert_eq!(direct, Ok(json!({"kind": "circle", "r": 5})));
    }

    #[test]
    fn sum_rejects_bad_discriminants() {
        let err = deserialize(&shape(), &json!({"kind": "triangle"})).unwrap_err();
        assert!(err.message.starts_with("Sentinel field kind could not deserialize properly: "));
        assert!(err.message.contains("one of the enum values: circle, square"));

        let err = deserialize(&shape(), &json!({"r": 5})).unwrap_err();
        assert_eq!(err.message, "Could not deserialize object into Shape: {\"r\":5}");

        let err = deserialize(&shape(), &json!({"kind": 1})).unwrap_err();
        assert!(err.message.starts_with("Could not deserialize object into Shape"));
    }

    #[test]
    fn custom_generators_resolve_by_name() {
        let tree = Generator::object_with_optional(
            "Tree",
            vec![Field::new("label", Generator::string())],
            vec![Field::new("children", Generator::list(Generator::custom("deTree", vec![])))],
        );
        let ev = Evaluator::new().with("deTree", tree.clone());
        let input = json!({"label": "root", "children": [{"label": "leaf"}]});
        assert_eq!(ev.run(&tree, Some(&input)), Ok(input.clone()));

        let err = deserialize(&Generator::custom("deNothing", vec![]), &json!(1)).unwrap_err();
        assert!(err.message.contains("deNothing"));
    }
}
