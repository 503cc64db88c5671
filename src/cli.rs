//! Minimal CLI: config → generated deserializer files
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::emit::{self, GeneratedFile};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate Flow deserializers from a degen config file
#[derive(Parser, Debug)]
#[command(name = "degen", version)]
pub struct CommandLineInterface {
    /// path to the config JSON file
    config: Option<PathBuf>,

    /// print generated files to stdout instead of writing them
    #[arg(long, default_value_t = false)]
    stdout: bool,

    /// also write the runtime checker library to this path
    #[arg(long)]
    runtime_out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        let Some(config_path) = self.config.as_ref() else {
            bail!("usage: degen config-file.json");
        };
        let files = generate_from_config(config_path)?;

        let mut outputs = Vec::<(&Path, &str)>::new();
        for file in &files {
            if self.stdout {
                println!("// ----- {} -----", file.path.display());
                print!("{}", file.contents);
            } else {
                outputs.push((file.path.as_path(), file.contents.as_str()));
            }
        }
        if let Some(out) = self.runtime_out.as_ref() {
            outputs.push((out.as_path(), crate::runtime::RUNTIME_JS));
        }
        write_all(&outputs)
    }
}

/// Everything a config produces, generated in memory.
pub fn generate_from_config(config_path: &Path) -> anyhow::Result<Vec<GeneratedFile>> {
    let config = Config::load(config_path)?;
    let base_dir = config.resolve_base_dir(config_path);
    let jobs = config.jobs(&base_dir)?;
    tracing::debug!(base_dir = %base_dir.display(), jobs = jobs.len(), "loaded config");
    let files = emit::generate(&base_dir, &config.generated_preamble, &config.locations(), &jobs)?;
    Ok(files)
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Stage every file as a temporary sibling of its target, then move them all
/// into place. A failure while staging leaves the targets untouched.
fn write_all(outputs: &[(&Path, &str)]) -> anyhow::Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        staged.push((*path, stage(path, contents)?));
    }
    for (path, temp) in staged {
        temp.persist(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!(file = %path.display(), "wrote");
    }
    Ok(())
}

fn stage(path: &Path, contents: &str) -> anyhow::Result<NamedTempFile> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage {}", path.display()))?;
    temp.write_all(contents.as_bytes())
        .with_context(|| format!("failed to stage {}", path.display()))?;
    Ok(temp)
}
