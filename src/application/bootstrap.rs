use crate::infrastructure::config::{AppConfig, ensure_default_config, load_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

const DATABASE_FILE: &str = "dayplanner.sqlite";

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
    pub config_dir: PathBuf,
    pub state_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub database_path: PathBuf,
}

impl WorkspacePaths {
    pub fn new(root: &Path) -> Self {
        let state_dir = root.join("state");
        Self {
            root: root.to_path_buf(),
            config_dir: root.join("config"),
            database_path: state_dir.join(DATABASE_FILE),
            logs_dir: root.join("logs"),
            state_dir,
        }
    }
}

#[derive(Debug)]
pub struct BootstrapResult {
    pub paths: WorkspacePaths,
    pub config: AppConfig,
}

/// Creates the workspace layout, writes a default config on first run and
/// applies the SQLite schema.
pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let paths = WorkspacePaths::new(workspace_root);

    fs::create_dir_all(&paths.config_dir)?;
    fs::create_dir_all(&paths.state_dir)?;
    fs::create_dir_all(&paths.logs_dir)?;

    ensure_default_config(&paths.config_dir)?;
    let config = load_config(&paths.config_dir)?;
    initialize_database(&paths.database_path)?;

    Ok(BootstrapResult { paths, config })
}
