//! Generation-time failures.
//!
//! These abort a run. Failures of the *generated* validators are plain values
//! (see [`crate::eval::DeError`]) and never show up here.
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GenError {
    #[error("`{name}` is not a valid identifier for {context}")]
    InvalidIdentifier { name: String, context: String },

    #[error("object type `{ty}` declares the field `{name}` more than once")]
    DuplicateField { ty: String, name: String },

    #[error("sum type `{ty}` declares the sentinel `{key}` more than once")]
    DuplicateSentinel { ty: String, key: String },

    #[error("{} exports `{name}` more than once, or under a name its own declarations use", file.display())]
    DuplicateExport { name: String, file: PathBuf },

    #[error("field `{name}` in {} shadows a name declared by the module", file.display())]
    ShadowedName { name: String, file: PathBuf },

    #[error("exports in {} read each other while the module loads: {}", file.display(), names.join(", "))]
    ExportCycle { names: Vec<String>, file: PathBuf },

    #[error("hoisted declaration `{key}` is generated with two different bodies in {}", file.display())]
    ConflictingHoist { key: String, file: PathBuf },

    #[error("unresolved names in {}:\n{}", file.display(), format_unresolved(names))]
    Unresolved { file: PathBuf, names: Vec<Unresolved> },

    #[error("{} does not export `{name}`", input.display())]
    MissingExport { input: PathBuf, name: String },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Error deserializing config file {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },
}

/// A type or import name with no configured location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    Type(String),
    Import(String),
}

fn format_unresolved(names: &[Unresolved]) -> String {
    names
        .iter()
        .map(|name| match name {
            Unresolved::Type(n) => format!("  - type `{n}` has no entry in typeLocations"),
            Unresolved::Import(n) => format!("  - import `{n}` has no entry in importLocations"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;
