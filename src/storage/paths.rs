// Storage path utilities.
// Locates the per-user files backing the extension's local storage and configuration.

use std::path::PathBuf;

use directories::ProjectDirs;

const APP_NAME: &str = "resume-tailor";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME)
}

/// Get the base data directory (~/.local/share/resume-tailor on Linux).
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Get the base configuration directory (~/.config/resume-tailor on Linux).
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Path to the key-value storage file.
pub fn storage_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("storage.json"))
}

/// Path to the configuration file.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        // Path construction only; nothing touches the filesystem
        if let Some(path) = storage_path() {
            assert!(path.ends_with("storage.json"));
        }
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.json"));
        }
    }
}
