//! Typed run configuration: the buffers and worker functions that make up a
//! pipeline, and the on-disk layout for one run's logs and error dumps.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferSpec {
    pub name: String,
    pub slot_count: usize,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub sinks: Vec<String>,
    #[serde(default)]
    pub observes: Vec<String>,
    #[serde(default = "default_process_count")]
    pub process_count: usize,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

fn default_process_count() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOptions {
    pub buffers: Vec<BufferSpec>,
    pub workers: Vec<WorkerSpec>,
    pub target_directory: PathBuf,
    #[serde(default)]
    pub run_name: Option<String>,
}

/// The directory layout for one run: a timestamped root plus an `errors/`
/// subdirectory, created exclusively so concurrent runs never collide or
/// silently overwrite each other's logs.
pub struct RunLayout {
    root: PathBuf,
    errors: PathBuf,
}

impl RunLayout {
    /// Creates `<target>/run_<epoch-seconds>/` (or `<target>/<run_name>/`
    /// if one was given) and its `errors/` subdirectory.
    pub fn create(options: &RunOptions) -> Result<Self, ControlError> {
        let dir_name = match &options.run_name {
            Some(name) => name.clone(),
            None => {
                let epoch = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                format!("run_{epoch}")
            }
        };
        let root = options.target_directory.join(dir_name);
        fs::create_dir(&root).map_err(|source| ControlError::RunLayout { path: root.clone(), source })?;

        let errors = root.join("errors");
        fs::create_dir_all(&errors).map_err(|source| ControlError::RunLayout { path: errors.clone(), source })?;

        Ok(Self { root, errors })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn errors(&self) -> &Path {
        &self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_run_directory_with_errors_subdir() {
        let tmp = std::env::temp_dir().join(format!("mimo-control-test-{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();

        let options = RunOptions {
            buffers: vec![],
            workers: vec![],
            target_directory: tmp.clone(),
            run_name: Some("fixed-name".to_owned()),
        };
        let layout = RunLayout::create(&options).unwrap();
        assert!(layout.root().is_dir());
        assert!(layout.errors().is_dir());

        fs::remove_dir_all(&tmp).unwrap();
    }
}
