//! Dependency descriptors.
//!
//! Every generator declares the types, imports and hoisted declarations its
//! emitted text needs. Descriptors are merged by plain concatenation while the
//! generator tree is folded; duplicates survive until the emission driver
//! dedups them.

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// A type name referenced by emitted annotations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeType {
    Object,
    Bool,
    Number,
    String,
    Custom(String),
}

/// A runtime function referenced by emitted code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeImport {
    DeBool,
    DeField,
    DeList,
    DeMapping,
    DeNumber,
    DeString,
    Custom(String),
}

/// A free-standing declaration that must appear once per output file.
///
/// `key` is the name the declaration binds; two hoists with the same key must
/// carry the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hoist {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deps {
    pub types: Vec<DeType>,
    pub imports: Vec<DeImport>,
    pub hoists: Vec<Hoist>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Names the target type system knows without an import.
const BUILTIN_TYPE_NAMES: &[&str] = &["mixed", "empty", "void", "null", "Array", "Error"];

impl DeType {
    pub fn named(name: &str) -> Self {
        match name {
            "Object" => DeType::Object,
            "bool" | "boolean" => DeType::Bool,
            "number" => DeType::Number,
            "string" => DeType::String,
            other => DeType::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeType::Object => "Object",
            DeType::Bool => "boolean",
            DeType::Number => "number",
            DeType::String => "string",
            DeType::Custom(name) => name,
        }
    }

    /// Whether an import location is required for this type.
    ///
    /// Primitives, Flow builtins and `$`-prefixed utility types resolve
    /// without configuration.
    pub fn needs_location(&self) -> bool {
        match self {
            DeType::Custom(name) => {
                !name.starts_with('$') && !BUILTIN_TYPE_NAMES.contains(&name.as_str())
            }
            _ => false,
        }
    }
}

impl DeImport {
    pub fn named(name: &str) -> Self {
        match name {
            "deBool" => DeImport::DeBool,
            "deField" => DeImport::DeField,
            "deList" => DeImport::DeList,
            "deMapping" => DeImport::DeMapping,
            "deNumber" => DeImport::DeNumber,
            "deString" => DeImport::DeString,
            other => DeImport::Custom(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            DeImport::DeBool => "deBool",
            DeImport::DeField => "deField",
            DeImport::DeList => "deList",
            DeImport::DeMapping => "deMapping",
            DeImport::DeNumber => "deNumber",
            DeImport::DeString => "deString",
            DeImport::Custom(name) => name,
        }
    }
}

impl Deps {
    pub fn empty() -> Self { Self::default() }

    pub fn import(import: DeImport) -> Self {
        Deps { imports: vec![import], ..Deps::default() }
    }

    pub fn of_type(ty: DeType) -> Self {
        Deps { types: vec![ty], ..Deps::default() }
    }

    pub fn hoist(key: impl Into<String>, text: impl Into<String>) -> Self {
        Deps {
            hoists: vec![Hoist { key: key.into(), text: text.into() }],
            ..Deps::default()
        }
    }

    /// Concatenate `other` after `self`.
    pub fn merge(mut self, other: Deps) -> Deps {
        self.types.extend(other.types);
        self.imports.extend(other.imports);
        self.hoists.extend(other.hoists);
        self
    }

    pub fn with_types<I>(mut self, types: I) -> Deps
    where
        I: IntoIterator<Item = DeType>,
    {
        self.types.extend(types);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.imports.is_empty() && self.hoists.is_empty()
    }
}

impl FromIterator<Deps> for Deps {
    fn from_iter<I: IntoIterator<Item = Deps>>(iter: I) -> Self {
        iter.into_iter().fold(Deps::empty(), Deps::merge)
    }
}

// ------------------------------- Tests ------------------------------------ //
