//! Generator IR.
//!
//! A [`Generator`] is a plain tree describing a validator. Nothing is rendered
//! when a tree is built: [`crate::render::render`] produces the source text and
//! [`Generator::deps`] folds the dependency descriptor, both on demand.
use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::deps::{DeImport, DeType, Deps};
use crate::error::{GenError, Result};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A type annotation as written in emitted code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeExpr {
    Name(String),                                   // `Point`
    Literal { literal: String },                    // `'foo'`
    Applied {                                       // `Config<string, string>`
        name: String,
        #[serde(default)]
        params: Vec<TypeExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Generator {
    Bool,
    Number,
    String,
    FilePath,                // a string, kept apart for intent only
    Value {                  // exactly one literal value
        #[serde(rename = "type")]
        ty: String,
        value: serde_json::Value,
    },
    Enum {
        #[serde(rename = "type")]
        ty: TypeExpr,
        values: Vec<String>,
    },
    Object {
        #[serde(rename = "type")]
        ty: TypeExpr,
        #[serde(default)]
        fields: Vec<Field>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        optional: Vec<Field>,
    },
    List {
        element: Box<Generator>,
    },
    Mapping {
        key: Box<Generator>,
        value: Box<Generator>,
    },
    Sum {
        #[serde(rename = "type")]
        ty: TypeExpr,
        discriminant: String,
        discriminant_type: TypeExpr,
        variants: Vec<Sentinel>,
    },
    Custom {                 // a validator provided elsewhere, referenced by import name
        import: String,
        #[serde(default)]
        types: Vec<TypeExpr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub de: Generator,
}

/// One arm of a tagged sum: the discriminant value and the generator applied
/// to the whole input when the discriminant matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentinel {
    pub key: String,
    pub de: Generator,
}

// ————————————————————————————————————————————————————————————————————————————
// COMBINATORS
// ————————————————————————————————————————————————————————————————————————————

impl Generator {
    pub fn bool() -> Self { Generator::Bool }
    pub fn number() -> Self { Generator::Number }
    pub fn string() -> Self { Generator::String }
    pub fn file_path() -> Self { Generator::FilePath }

    pub fn value(ty: impl Into<String>, value: serde_json::Value) -> Self {
        Generator::Value { ty: ty.into(), value }
    }

    pub fn enum_of<S: Into<String>>(ty: impl Into<TypeExpr>, values: impl IntoIterator<Item = S>) -> Self {
        Generator::Enum {
            ty: ty.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn object(ty: impl Into<TypeExpr>, fields: Vec<Field>) -> Self {
        Self::object_with_optional(ty, fields, Vec::new())
    }

    pub fn object_with_optional(ty: impl Into<TypeExpr>, fields: Vec<Field>, optional: Vec<Field>) -> Self {
        Generator::Object { ty: ty.into(), fields, optional }
    }

    pub fn list(element: Generator) -> Self {
        Generator::List { element: Box::new(element) }
    }

    pub fn mapping(key: Generator, value: Generator) -> Self {
        Generator::Mapping { key: Box::new(key), value: Box::new(value) }
    }

    pub fn sum(
        ty: impl Into<TypeExpr>,
        discriminant: impl Into<String>,
        discriminant_type: impl Into<TypeExpr>,
        variants: Vec<Sentinel>,
    ) -> Self {
        Generator::Sum {
            ty: ty.into(),
            discriminant: discriminant.into(),
            discriminant_type: discriminant_type.into(),
            variants,
        }
    }

    pub fn custom(import: impl Into<String>, types: Vec<TypeExpr>) -> Self {
        Generator::Custom { import: import.into(), types }
    }
}

impl Field {
    pub fn new(name: impl Into<String>, de: Generator) -> Self {
        Field { name: name.into(), de }
    }
}

impl Sentinel {
    pub fn new(key: impl Into<String>, de: Generator) -> Self {
        Sentinel { key: key.into(), de }
    }
}

impl TypeExpr {
    pub fn applied(name: impl Into<String>, params: Vec<TypeExpr>) -> Self {
        TypeExpr::Applied { name: name.into(), params }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        TypeExpr::Literal { literal: value.into() }
    }

    /// The head name, `None` for literals.
    pub fn base_name(&self) -> Option<&str> {
        match self {
            TypeExpr::Name(name) | TypeExpr::Applied { name, .. } => Some(name),
            TypeExpr::Literal { .. } => None,
        }
    }

    /// Every type name mentioned, outermost first.
    pub fn type_refs(&self) -> Vec<DeType> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs(&self, out: &mut Vec<DeType>) {
        match self {
            TypeExpr::Name(name) => out.push(DeType::named(name)),
            TypeExpr::Literal { .. } => {}
            TypeExpr::Applied { name, params } => {
                out.push(DeType::named(name));
                for p in params {
                    p.collect_refs(out);
                }
            }
        }
    }
}

impl From<&str> for TypeExpr {
    fn from(name: &str) -> Self { TypeExpr::Name(name.to_string()) }
}

impl From<String> for TypeExpr {
    fn from(name: String) -> Self { TypeExpr::Name(name) }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(name) => f.write_str(name),
            TypeExpr::Literal { literal } => f.write_str(&crate::render::js_str(literal)),
            TypeExpr::Applied { name, params } if params.is_empty() => f.write_str(name),
            TypeExpr::Applied { name, params } => {
                let params = params.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(f, "{name}<{}>", params.join(", "))
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DEPENDENCY FOLD
// ————————————————————————————————————————————————————————————————————————————

impl Generator {
    /// Everything the rendered text of this generator needs, in tree order.
    pub fn deps(&self) -> Deps {
        match self {
            Generator::Bool => Deps::import(DeImport::DeBool),
            Generator::Number => Deps::import(DeImport::DeNumber),
            Generator::String | Generator::FilePath => {
                Deps::import(DeImport::DeString).merge(Deps::of_type(DeType::String))
            }
            Generator::Value { .. } => Deps::empty(),
            Generator::Enum { ty, .. } => Generator::String.deps().with_types(ty.type_refs()),
            Generator::Object { ty, fields, optional } => fields
                .iter()
                .chain(optional)
                .map(|f| Deps::import(DeImport::DeField).merge(f.de.deps()))
                .collect::<Deps>()
                .with_types(ty.type_refs()),
            Generator::List { element } => Deps::import(DeImport::DeList).merge(element.deps()),
            Generator::Mapping { key, value } => Deps::import(DeImport::DeMapping)
                .merge(key.deps())
                .merge(value.deps()),
            Generator::Sum { ty, discriminant, discriminant_type, variants } => {
                let tag = Generator::Enum {
                    ty: discriminant_type.clone(),
                    values: variants.iter().map(|v| v.key.clone()).collect(),
                };
                let hoist = Deps::hoist(
                    crate::render::refine_name(ty),
                    crate::render::refine_hoist(ty, discriminant, discriminant_type, variants),
                );
                let own = Deps::empty()
                    .with_types(ty.type_refs())
                    .with_types(discriminant_type.type_refs());
                variants
                    .iter()
                    .map(|v| v.de.deps())
                    .fold(own.merge(hoist), Deps::merge)
                    .merge(tag.deps())
            }
            Generator::Custom { import, types } => Deps::import(DeImport::named(import))
                .with_types(types.iter().flat_map(TypeExpr::type_refs)),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALIDATION
// ————————————————————————————————————————————————————————————————————————————

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern is valid")
});

/// Names a field binding may not take: target keywords, plus the locals and
/// runtime functions emitted code already relies on.
const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "enum", "export", "extends", "false",
    "finally", "for", "function", "if", "implements", "import", "in",
    "instanceof", "interface", "let", "new", "null", "package", "private",
    "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "undefined", "var", "void", "while",
    "with", "yield",
    "json", "result", "fieldError", "Error", "JSON", "Object", "String",
    "deBool", "deField", "deList", "deMapping", "deNumber", "deString",
];

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

fn check_binding(name: &str, context: impl FnOnce() -> String) -> Result<()> {
    if is_identifier(name) && !RESERVED.contains(&name) {
        Ok(())
    } else {
        Err(GenError::InvalidIdentifier { name: name.to_string(), context: context() })
    }
}

impl Generator {
    /// Reject trees whose rendered text would not be valid code.
    pub fn validate(&self) -> Result<()> {
        match self {
            Generator::Bool
            | Generator::Number
            | Generator::String
            | Generator::FilePath
            | Generator::Value { .. }
            | Generator::Enum { .. } => Ok(()),
            Generator::Object { ty, fields, optional } => {
                let mut seen = HashSet::new();
                for field in fields.iter().chain(optional) {
                    check_binding(&field.name, || format!("a field of `{ty}`"))?;
                    if !seen.insert(field.name.as_str()) {
                        return Err(GenError::DuplicateField {
                            ty: ty.to_string(),
                            name: field.name.clone(),
                        });
                    }
                    field.de.validate()?;
                }
                Ok(())
            }
            Generator::List { element } => element.validate(),
            Generator::Mapping { key, value } => {
                key.validate()?;
                value.validate()
            }
            Generator::Sum { ty, discriminant, variants, .. } => {
                let base = ty.base_name().unwrap_or_default();
                if !is_identifier(base) {
                    return Err(GenError::InvalidIdentifier {
                        name: ty.to_string(),
                        context: "a sum type name".into(),
                    });
                }
                if !is_identifier(discriminant) {
                    return Err(GenError::InvalidIdentifier {
                        name: discriminant.clone(),
                        context: format!("the discriminant of `{ty}`"),
                    });
                }
                let mut seen = HashSet::new();
                for variant in variants {
                    if !seen.insert(variant.key.as_str()) {
                        return Err(GenError::DuplicateSentinel {
                            ty: ty.to_string(),
                            key: variant.key.clone(),
                        });
                    }
                    variant.de.validate()?;
                }
                Ok(())
            }
            Generator::Custom { import, .. } => {
                if is_identifier(import) {
                    Ok(())
                } else {
                    Err(GenError::InvalidIdentifier {
                        name: import.clone(),
                        context: "a custom import".into(),
                    })
                }
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// SCOPES
// ————————————————————————————————————————————————————————————————————————————

impl Generator {
    /// Every object field binding anywhere in the tree.
    pub fn field_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_field_names(&mut out);
        out
    }

    fn collect_field_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Generator::Object { fields, optional, .. } => {
                for field in fields.iter().chain(optional) {
                    out.push(field.name.as_str());
                    field.de.collect_field_names(out);
                }
            }
            Generator::List { element } => element.collect_field_names(out),
            Generator::Mapping { key, value } => {
                key.collect_field_names(out);
                value.collect_field_names(out);
            }
            Generator::Sum { variants, .. } => {
                for variant in variants {
                    variant.de.collect_field_names(out);
                }
            }
            _ => {}
        }
    }

    /// Custom imports read when the rendered expression itself is evaluated,
    /// not later from inside a function body.
    pub fn eager_refs(&self) -> Vec<&str> {
        match self {
            Generator::Custom { import, .. } => vec![import.as_str()],
            Generator::List { element } => element.eager_refs(),
            Generator::Mapping { key, value } => {
                let mut out = key.eager_refs();
                out.extend(value.eager_refs());
                out
            }
            _ => Vec::new(),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
