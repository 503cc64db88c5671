//! Emission driver.
//!
//! Turns jobs (an output file plus its named top-level generators) into
//! complete file bodies: preamble, imports grouped by location, hoisted
//! declarations, then one exported binding per generator. All jobs are
//! generated in memory; callers write nothing unless every job succeeded.
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Component, Path, PathBuf};

use indexmap::IndexMap;

use crate::deps::{Deps, Hoist};
use crate::error::{GenError, Result, Unresolved};
use crate::ir::{Generator, is_identifier};
use crate::render::{js_str, render};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Where imported names live. Values are module specifiers: `./`-relative
/// specifiers are resolved against the base directory, anything else is
/// emitted verbatim.
#[derive(Debug, Clone, Default)]
pub struct Locations {
    pub types: IndexMap<String, String>,
    pub imports: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Job {
    /// Relative to the base directory.
    pub output: PathBuf,
    pub exports: Vec<(String, Generator)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

// ————————————————————————————————————————————————————————————————————————————
// DRIVER
// ————————————————————————————————————————————————————————————————————————————

pub fn generate(
    base_dir: &Path,
    preamble: &str,
    locations: &Locations,
    jobs: &[Job],
) -> Result<Vec<GeneratedFile>> {
    jobs.iter()
        .map(|job| generate_file(base_dir, preamble, locations, job))
        .collect()
}

pub fn generate_file(
    base_dir: &Path,
    preamble: &str,
    locations: &Locations,
    job: &Job,
) -> Result<GeneratedFile> {
    let path = normalize(&base_dir.join(&job.output));
    tracing::debug!(file = %path.display(), exports = job.exports.len(), "generating");

    for (_, de) in &job.exports {
        de.validate()?;
    }
    let deps: Deps = job.exports.iter().map(|(_, de)| de.deps()).collect();

    let mut missing = Vec::new();
    let mut imports = BTreeMap::<String, BTreeSet<&str>>::new();
    for import in &deps.imports {
        match locations.imports.get(import.name()) {
            Some(location) if resolves_to(base_dir, location, &path) => {}
            Some(location) => {
                imports
                    .entry(specifier(base_dir, &path, location))
                    .or_default()
                    .insert(import.name());
            }
            None => push_unique(&mut missing, Unresolved::Import(import.name().to_string())),
        }
    }
    let mut types = BTreeMap::<String, BTreeSet<&str>>::new();
    for ty in deps.types.iter().filter(|t| t.needs_location()) {
        match locations.types.get(ty.name()) {
            Some(location) if resolves_to(base_dir, location, &path) => {}
            Some(location) => {
                types
                    .entry(specifier(base_dir, &path, location))
                    .or_default()
                    .insert(ty.name());
            }
            None => push_unique(&mut missing, Unresolved::Type(ty.name().to_string())),
        }
    }
    if !missing.is_empty() {
        return Err(GenError::Unresolved { file: path, names: missing });
    }

    let hoists = register_hoists(&path, &deps.hoists)?;

    let mut declared: HashSet<&str> = hoists.keys().map(String::as_str).collect();
    declared.extend(imports.values().flatten().copied());
    for (name, _) in &job.exports {
        if !is_identifier(name) {
            return Err(GenError::InvalidIdentifier {
                name: name.clone(),
                context: format!("an export of {}", path.display()),
            });
        }
        if !declared.insert(name.as_str()) {
            return Err(GenError::DuplicateExport { name: name.clone(), file: path });
        }
    }
    for (_, de) in &job.exports {
        if let Some(name) = de.field_names().into_iter().find(|name| declared.contains(name)) {
            return Err(GenError::ShadowedName { name: name.to_string(), file: path });
        }
    }
    let exports = export_order(&path, &job.exports)?;

    let mut blocks = Vec::<String>::new();
    if !preamble.trim().is_empty() {
        blocks.push(preamble.trim_end().to_string());
    }
    let import_lines = imports
        .iter()
        .map(|(from, names)| import_line("import", names, from))
        .chain(types.iter().map(|(from, names)| import_line("import type", names, from)))
        .collect::<Vec<_>>();
    if !import_lines.is_empty() {
        blocks.push(import_lines.join("\n"));
    }
    blocks.extend(hoists.into_values());
    for (name, de) in exports {
        blocks.push(format!("export const {name} = {}", render(de)));
    }

    let mut contents = blocks.join("\n\n");
    contents.push('\n');
    Ok(GeneratedFile { path, contents })
}

/// One declaration per key, in first-seen order. The same key with a
/// different body means two distinct types share a name.
fn register_hoists(file: &Path, hoists: &[Hoist]) -> Result<IndexMap<String, String>> {
    let mut registry = IndexMap::<String, String>::new();
    for hoist in hoists {
        match registry.get(&hoist.key) {
            Some(text) if *text == hoist.text => {}
            Some(_) => {
                return Err(GenError::ConflictingHoist {
                    key: hoist.key.clone(),
                    file: file.to_path_buf(),
                });
            }
            None => {
                registry.insert(hoist.key.clone(), hoist.text.clone());
            }
        }
    }
    Ok(registry)
}

/// Module order, except that an export is emitted after every same-file
/// export its initializer reads.
fn export_order<'a>(file: &Path, exports: &'a [(String, Generator)]) -> Result<Vec<&'a (String, Generator)>> {
    let names: HashSet<&str> = exports.iter().map(|(name, _)| name.as_str()).collect();
    let mut pending: Vec<(&(String, Generator), Vec<&str>)> = exports
        .iter()
        .map(|export| {
            let refs = export.1.eager_refs().into_iter().filter(|r| names.contains(r)).collect();
            (export, refs)
        })
        .collect();
    let mut emitted = HashSet::<&str>::new();
    let mut order = Vec::with_capacity(exports.len());
    while !pending.is_empty() {
        let Some(next) = pending
            .iter()
            .position(|(_, refs)| refs.iter().all(|r| emitted.contains(r)))
        else {
            return Err(GenError::ExportCycle {
                names: pending.iter().map(|(export, _)| export.0.clone()).collect(),
                file: file.to_path_buf(),
            });
        };
        let (export, _) = pending.remove(next);
        emitted.insert(export.0.as_str());
        order.push(export);
    }
    Ok(order)
}

fn import_line(keyword: &str, names: &BTreeSet<&str>, from: &str) -> String {
    let names = names.iter().copied().collect::<Vec<_>>().join(", ");
    format!("{keyword} {{ {names} }} from {}", js_str(from))
}

fn push_unique(missing: &mut Vec<Unresolved>, name: Unresolved) {
    if !missing.contains(&name) {
        missing.push(name);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PATHS
// ————————————————————————————————————————————————————————————————————————————

fn is_relative_specifier(location: &str) -> bool {
    location.starts_with("./") || location.starts_with("../") || location == "." || location == ".."
}

/// The specifier to write in `output` for a configured location.
fn specifier(base_dir: &Path, output: &Path, location: &str) -> String {
    if !is_relative_specifier(location) {
        return location.to_string();
    }
    let target = normalize(&base_dir.join(location));
    let from = output.parent().unwrap_or_else(|| Path::new(""));
    let rel = relative_path(&target, from).to_string_lossy().replace('\\', "/");
    if rel.starts_with("../") {
        rel
    } else {
        format!("./{rel}")
    }
}

fn resolves_to(base_dir: &Path, location: &str, path: &Path) -> bool {
    if is_relative_specifier(location) {
        normalize(&base_dir.join(location)) == path
    } else {
        Path::new(location) == path
    }
}

/// Lexical normalization: drops `.` and folds `..` where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut out = Vec::<Component>::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out.iter().collect()
}

fn relative_path(target: &Path, from_dir: &Path) -> PathBuf {
    let target = target.components().collect::<Vec<_>>();
    let from = from_dir.components().collect::<Vec<_>>();
    let common = target.iter().zip(&from).take_while(|(a, b)| a == b).count();
    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component.as_os_str());
    }
    out
}

// ------------------------------- Tests ------------------------------------ //
