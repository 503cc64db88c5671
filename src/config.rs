//! Configuration file and job loading.
//!
//! ```json
//! {
//!   "baseDir": "..",
//!   "generatedPreamble": "// @flow\n// generated by degen",
//!   "typeLocations": { "Point": "./src/types.js" },
//!   "importLocations": { "deNumber": "./src/deserializer.js" },
//!   "generators": [
//!     { "exports": { "point": "dePoint" }, "inputFile": "schema/point.json", "outputFile": "src/point.deserializer.js" }
//!   ]
//! }
//! ```
//!
//! `baseDir` is relative to the config file. Input and output files are
//! relative to `baseDir`. An input file is a JSON object mapping names to
//! serialized generators; `exports` picks which of them are emitted, and under
//! which name.
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::emit::{Job, Locations};
use crate::error::{GenError, Result};
use crate::ir::{Field, Generator, TypeExpr};
use crate::path_de;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub base_dir: String,
    pub generated_preamble: String,
    pub generators: Vec<ConfigGenerator>,
    pub import_locations: IndexMap<String, String>,
    pub type_locations: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigGenerator {
    /// Input name → output name.
    pub exports: IndexMap<String, String>,
    pub input_file: String,
    pub output_file: String,
}

/// The generator describing [`Config`] itself.
pub fn config_generator() -> Generator {
    let string = || TypeExpr::from("string");
    let locations = || Generator::mapping(Generator::string(), Generator::file_path());
    Generator::object(
        TypeExpr::applied("Config", vec![string(), string()]),
        vec![
            Field::new("baseDir", Generator::file_path()),
            Field::new("generatedPreamble", Generator::string()),
            Field::new("typeLocations", locations()),
            Field::new("importLocations", locations()),
            Field::new("generators", Generator::list(Generator::object("ConfigGenerator", vec![
                Field::new("exports", Generator::mapping(Generator::string(), Generator::string())),
                Field::new("inputFile", Generator::file_path()),
                Field::new("outputFile", Generator::file_path()),
            ]))),
        ],
    )
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

impl Config {
    /// Parse, validate against [`config_generator`], then type.
    pub fn load(path: &Path) -> Result<Config> {
        let json: serde_json::Value = path_de::read_json_file(path)?;
        Self::from_json(path, json)
    }

    pub fn from_json(path: &Path, json: serde_json::Value) -> Result<Config> {
        crate::eval::deserialize(&config_generator(), &json).map_err(|e| GenError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.message,
        })?;
        path_de::from_value_with_path(json).map_err(|message| GenError::InvalidConfig {
            path: path.to_path_buf(),
            message,
        })
    }

    /// `baseDir` resolved against the directory holding the config file.
    pub fn resolve_base_dir(&self, config_path: &Path) -> PathBuf {
        config_path.parent().unwrap_or_else(|| Path::new("")).join(&self.base_dir)
    }

    /// Configured locations, plus every exported name located in its output
    /// file so generators can reference each other through `custom`.
    pub fn locations(&self) -> Locations {
        let mut imports = self.import_locations.clone();
        for generator in &self.generators {
            let location = as_relative_specifier(&generator.output_file);
            for output_name in generator.exports.values() {
                imports.insert(output_name.clone(), location.clone());
            }
        }
        Locations { types: self.type_locations.clone(), imports }
    }

    /// Load every input module and select its exports.
    pub fn jobs(&self, base_dir: &Path) -> Result<Vec<Job>> {
        self.generators
            .iter()
            .map(|generator| generator.job(base_dir))
            .collect()
    }
}

impl ConfigGenerator {
    pub fn job(&self, base_dir: &Path) -> Result<Job> {
        let input = base_dir.join(&self.input_file);
        tracing::debug!(input = %input.display(), "loading module");
        let module: IndexMap<String, Generator> = path_de::read_json_file(&input)?;
        if let Some(name) = self.exports.keys().find(|name| !module.contains_key(*name)) {
            return Err(GenError::MissingExport { input, name: name.clone() });
        }
        let exports = module
            .into_iter()
            .filter_map(|(name, de)| self.exports.get(&name).map(|out| (out.clone(), de)))
            .collect();
        Ok(Job { output: PathBuf::from(&self.output_file), exports })
    }
}

fn as_relative_specifier(file: &str) -> String {
    if file.starts_with("./") || file.starts_with("../") || Path::new(file).is_absolute() {
        file.to_string()
    } else {
        format!("./{file}")
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "baseDir": ".",
            "generatedPreamble": "// @flow",
            "typeLocations": { "Point": "./types.js" },
            "importLocations": { "deNumber": "./runtime.js", "deField": "./runtime.js" },
            "generators": [
                { "exports": { "point": "dePoint" }, "inputFile": "point.json", "outputFile": "out/point.js" }
            ]
        })
    }

    #[test]
    fn valid_config_loads() {
        let config = Config::from_json(Path::new("degen.json"), sample()).unwrap();
        assert_eq!(config.base_dir, ".");
        assert_eq!(config.generators[0].exports["point"], "dePoint");
        assert_eq!(config.import_locations.len(), 2);
    }

    #[test]
    fn config_generator_reports_the_bad_field() {
        let mut bad = sample();
        bad["generators"][0]["inputFile"] = json!(3);
        let err = Config::from_json(Path::new("degen.json"), bad).unwrap_err();
        let message = match err {
            GenError::InvalidConfig { message, .. } => message,
            other => panic!("unexpected {other}"),
        };
        assert!(message.starts_with("Could not deserialize field \"generators\""), "{message}");
        assert!(message.contains("at index 0"));
        assert!(message.contains("inputFile"));
    }

    #[test]
    fn missing_section_is_rejected() {
        let mut bad = sample();
        bad.as_object_mut().unwrap().remove("importLocations");
        let err = Config::from_json(Path::new("degen.json"), bad).unwrap_err();
        assert!(err.to_string().contains("importLocations"));
    }

    #[test]
    fn exports_become_import_locations() {
        let config = Config::from_json(Path::new("degen.json"), sample()).unwrap();
        let locations = config.locations();
        assert_eq!(locations.imports["dePoint"], "./out/point.js");
        assert_eq!(locations.types["Point"], "./types.js");
    }

    #[test]
    fn base_dir_is_relative_to_the_config_file() {
        let mut json = sample();
        json["baseDir"] = json!("..");
        let config = Config::from_json(Path::new("conf/degen.json"), json).unwrap();
        assert_eq!(config.resolve_base_dir(Path::new("conf/degen.json")), PathBuf::from("conf/.."));
    }

    #[test]
    fn config_generator_declares_its_types() {
        let deps = config_generator().deps();
        let names: Vec<_> = deps.types.iter().map(|t| t.name().to_string()).collect();
        assert!(names.contains(&"Config".to_string()));
        assert!(names.contains(&"ConfigGenerator".to_string()));
        assert_eq!(
            crate::render::render(&config_generator()).lines().next(),
            Some("(json: mixed): Config<string, string> | Error => {"),
        );
    }
}
