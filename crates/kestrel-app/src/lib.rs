//! Process-wide paths and layered configuration for the kestrel app.

mod config;
mod paths;

pub use config::{AgentModelBinding, Config, ConfigFile, LspDefinition, McpDefinition, Options, ProviderConfig};
pub use paths::{
    commands_dir, ensure_user_config_dir, ensure_user_data_dir, global_config_path, logs_dir,
    project_config_path, session_db_path, user_config_dir, user_data_dir,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("could not resolve user data directory")]
    MissingUserDataDir,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_defaults_when_no_files_present() {
        // Safe regardless of the ambient environment: missing config files
        // fall back to ConfigFile::default() at both layers.
        let cwd = std::env::temp_dir().join("kestrel-config-test-missing");
        std::fs::create_dir_all(&cwd).unwrap();
        let config = Config::load(&cwd, true, false).unwrap();
        assert!(config.options().debug);
        assert!(!config.yolo_mode());
    }

    #[test]
    fn project_config_overrides_global_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let project_dir = dir.path().join(".kestrel");
        std::fs::create_dir_all(&project_dir).unwrap();
        std::fs::write(
            project_dir.join("config.json"),
            r#"{"options": {"compact_mode": true}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path(), false, true).unwrap();
        assert!(config.options().compact_mode);
        assert!(config.yolo_mode());
    }
}
