use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", "entrylab")
    }

    /// Default location of exported experiment records.
    pub fn export_dir() -> PathBuf {
        Self::project()
            .map(|pd| pd.data_local_dir().join("exports"))
            .unwrap_or_else(|| PathBuf::from("entrylab_exports"))
    }

    /// Log file; the terminal UI owns stdout and stderr while running.
    pub fn log_path() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".local")
                .join("state")
                .join("entrylab")
                .join("entrylab.log")
        } else {
            Self::project()
                .map(|pd| pd.data_local_dir().join("entrylab.log"))
                .unwrap_or_else(|| PathBuf::from("entrylab.log"))
        }
    }
}
