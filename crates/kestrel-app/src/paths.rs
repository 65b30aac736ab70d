use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::{Error, Result};

const APP_QUALIFIER: &str = "dev";
const APP_ORGANIZATION: &str = "kestrel";
const APP_NAME: &str = "kestrel";

const SESSION_DB_FILENAME: &str = "store.db";
const GLOBAL_CONFIG_FILENAME: &str = "config.json";
const PROJECT_CONFIG_DIRNAME: &str = ".kestrel";

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or(Error::MissingUserDataDir)
}

/// App-local user data directory (for durable application state).
pub fn user_data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_local_dir().to_path_buf())
}

pub fn ensure_user_data_dir() -> Result<PathBuf> {
    let dir = user_data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// App-local user config directory, `$XDG_CONFIG_HOME/kestrel` on Linux.
pub fn user_config_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn ensure_user_config_dir() -> Result<PathBuf> {
    let dir = user_config_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn session_db_path() -> Result<PathBuf> {
    Ok(ensure_user_data_dir()?.join(SESSION_DB_FILENAME))
}

pub fn global_config_path() -> Result<PathBuf> {
    Ok(user_config_dir()?.join(GLOBAL_CONFIG_FILENAME))
}

pub fn commands_dir() -> Result<PathBuf> {
    Ok(user_config_dir()?.join("commands"))
}

pub fn logs_dir() -> Result<PathBuf> {
    Ok(ensure_user_data_dir()?.join("logs"))
}

/// Project-local config file path for a given workspace root, if the
/// project has one (`<root>/.kestrel/config.json`). Does not create it.
pub fn project_config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root
        .as_ref()
        .join(PROJECT_CONFIG_DIRNAME)
        .join(GLOBAL_CONFIG_FILENAME)
}
