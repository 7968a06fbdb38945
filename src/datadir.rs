//! Data directory layout and output naming.
//!
//! ```text
//! <data>/config.json
//! <data>/in/tables/<input>.csv
//! <data>/out/tables/<name>.csv          flat-file output
//! <data>/out/files/<name>/              vector-store working directory
//! <data>/out/files/<name>.tar.gz        vector-store archive
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::PipelineError;
use crate::config::{ConfigError, OutputFormat, Settings};

const OUTPUT_SUFFIX: &str = "_embedded";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

/// Where a run writes, fixed before the first row is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    Csv { path: PathBuf },
    VectorStore { dir: PathBuf, archive: PathBuf },
}

impl OutputTarget {
    pub fn format(&self) -> OutputFormat {
        match self {
            OutputTarget::Csv { .. } => OutputFormat::Csv,
            OutputTarget::VectorStore { .. } => OutputFormat::VectorStore,
        }
    }

    /// The file a successful run leaves behind.
    pub fn output_path(&self) -> &Path {
        match self {
            OutputTarget::Csv { path } => path,
            OutputTarget::VectorStore { archive, .. } => archive,
        }
    }
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn in_tables(&self) -> PathBuf {
        self.root.join("in").join("tables")
    }

    pub fn out_tables(&self) -> PathBuf {
        self.root.join("out").join("tables")
    }

    pub fn out_files(&self) -> PathBuf {
        self.root.join("out").join("files")
    }

    /// The single `*.csv` under `in/tables/`.
    pub fn locate_input(&self) -> Result<PathBuf, PipelineError> {
        let dir = self.in_tables();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::NoInput(
                    "No input table specified. Please provide one input table in the input mapping!"
                        .into(),
                ));
            }
            Err(source) => {
                return Err(PipelineError::NoInput(format!(
                    "cannot list {}: {source}",
                    dir.display()
                )));
            }
        };

        let mut tables: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_csv(path))
            .collect();
        tables.sort();

        match tables.len() {
            0 => Err(PipelineError::NoInput(
                "No input table specified. Please provide one input table in the input mapping!"
                    .into(),
            )),
            1 => Ok(tables.remove(0)),
            n => Err(PipelineError::NoInput(format!(
                "Only one input table is supported, found {n} in {}",
                dir.display()
            ))),
        }
    }

    pub fn output_target(
        &self,
        settings: &Settings,
        input: &Path,
    ) -> Result<OutputTarget, ConfigError> {
        let name = output_name(settings.output_table_name.as_deref(), input)?;
        Ok(match settings.output_format {
            OutputFormat::Csv => OutputTarget::Csv {
                path: self.out_tables().join(format!("{name}.csv")),
            },
            OutputFormat::VectorStore => {
                let files = self.out_files();
                OutputTarget::VectorStore {
                    dir: files.join(&name),
                    archive: files.join(format!("{name}.tar.gz")),
                }
            }
        })
    }
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// `name` without a trailing `.csv`, in any case.
fn strip_csv_suffix(name: &str) -> &str {
    name.len()
        .checked_sub(".csv".len())
        .filter(|&at| name.is_char_boundary(at) && name[at..].eq_ignore_ascii_case(".csv"))
        .map_or(name, |at| &name[..at])
}

/// Configured name (minus a trailing `.csv`) or `<input stem>_embedded`.
pub fn output_name(configured: Option<&str>, input: &Path) -> Result<String, ConfigError> {
    let name = match configured.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => strip_csv_suffix(name).to_string(),
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "cannot derive an output name from {}",
                        input.display()
                    ))
                })?;
            format!("{stem}{OUTPUT_SUFFIX}")
        }
    };

    if name.is_empty() || name == "." || name.contains("..") || name.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "invalid output table name '{name}'"
        )));
    }
    Ok(name)
}
