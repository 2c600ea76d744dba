pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{ArmSettings, DEFAULT_ARM_ENDPOINT, SettleSettings, Settings};

use std::path::{Path, PathBuf};

const CONFIG_DIR_NAME: &str = "settleflow";
const PROJECT_DIR_NAME: &str = ".settleflow";

/// Get the SettleFlow configuration directory, creating it if needed
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(CONFIG_DIR_NAME);

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Names tried in each searched directory, most specific first
const SETTLE_FILE_NAMES: [&str; 4] = [
    "settle.local.kdl",
    ".settle.local.kdl",
    "settle.kdl",
    ".settle.kdl",
];

/// Find the project's settle.kdl resource file
///
/// Search order:
/// 1. `SETTLE_CONFIG_PATH` environment variable (direct path)
/// 2. current directory: settle.local.kdl, .settle.local.kdl, settle.kdl, .settle.kdl
/// 3. the same names inside `./.settleflow/`
/// 4. `~/.config/settleflow/settle.kdl` (global)
pub fn find_settle_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("SETTLE_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(
            "SETTLE_CONFIG_PATH points at {} which does not exist",
            path.display()
        );
    }

    let global = dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join("settle.kdl"));
    discover(&std::env::current_dir()?, global)
}

/// Walk `root` and its project directory, then fall back to `global`
fn discover(root: &Path, global: Option<PathBuf>) -> Result<PathBuf> {
    let project = root.join(PROJECT_DIR_NAME);

    [root, project.as_path()]
        .into_iter()
        .flat_map(|dir| SETTLE_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .chain(global)
        .find(|path| path.is_file())
        .inspect(|path| tracing::debug!("Using resource file {}", path.display()))
        .ok_or(ConfigError::SettleFileNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn project(files: &[&str]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        for file in files {
            let path = root.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "// resources").unwrap();
        }
        root
    }

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("settleflow"));
        assert!(config_dir.exists());
    }

    #[test]
    fn test_discover_order() {
        let cases: &[(&[&str], &str)] = &[
            (&["settle.kdl"], "settle.kdl"),
            (&["settle.kdl", "settle.local.kdl"], "settle.local.kdl"),
            (&[".settle.kdl", ".settle.local.kdl"], ".settle.local.kdl"),
            (&[".settleflow/settle.kdl"], ".settleflow/settle.kdl"),
            (&[".settleflow/settle.local.kdl", ".settle.kdl"], ".settle.kdl"),
        ];

        for (files, expected) in cases {
            let root = project(files);
            let found = discover(root.path(), None).unwrap();
            assert_eq!(found, root.path().join(expected), "{:?}", files);
        }
    }

    #[test]
    fn test_discover_falls_back_to_global() {
        let root = project(&[]);
        let global = project(&["settleflow/settle.kdl"]);
        let global_file = global.path().join("settleflow/settle.kdl");

        let found = discover(root.path(), Some(global_file.clone())).unwrap();
        assert_eq!(found, global_file);

        let missing = global.path().join("other/settle.kdl");
        assert!(matches!(
            discover(root.path(), Some(missing)),
            Err(ConfigError::SettleFileNotFound)
        ));
    }

    #[test]
    fn test_discover_ignores_directories() {
        let root = project(&[]);
        fs::create_dir(root.path().join("settle.kdl")).unwrap();
        assert!(discover(root.path(), None).is_err());
    }

    #[test]
    #[serial]
    fn test_find_settle_file_env_var() {
        let root = project(&["custom.kdl"]);
        let config_path = root.path().join("custom.kdl");

        let result = temp_env::with_var(
            "SETTLE_CONFIG_PATH",
            Some(config_path.to_str().unwrap()),
            find_settle_file,
        );
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    #[serial]
    fn test_find_settle_file_in_current_dir() {
        let root = project(&["settle.kdl"]);
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(root.path()).unwrap();

        let result = temp_env::with_var_unset("SETTLE_CONFIG_PATH", find_settle_file);

        std::env::set_current_dir(original_dir).unwrap();
        assert!(result.unwrap().ends_with("settle.kdl"));
    }
}
