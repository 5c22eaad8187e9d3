// src/layout.rs
//! On-disk directory layout derived from the data directory and task name

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::constants::layout::*;
use crate::error::PathError;

/// Host convention used to locate the lab server mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    MacOs,
    Linux,
    Windows,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::MacOs, Platform::Linux, Platform::Windows];

    /// Platform this binary was built for; other Unix systems use the Linux mount.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Parse an operating-system name such as `Darwin`, `Linux` or `Windows`.
    pub fn from_system_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "darwin" | "macos" => Some(Platform::MacOs),
            "linux" => Some(Platform::Linux),
            "windows" => Some(Platform::Windows),
            _ => None,
        }
    }

    /// Mount point of the experiment server
    pub fn server_dir(&self) -> PathBuf {
        PathBuf::from(match self {
            Platform::MacOs => MACOS_SERVER_DIR,
            Platform::Linux => LINUX_SERVER_DIR,
            Platform::Windows => WINDOWS_SERVER_DIR,
        })
    }

    /// `server / project / experiment / data`
    pub fn data_dir(&self, project_id: &str, experiment_id: &str) -> PathBuf {
        self.server_dir()
            .join(project_id)
            .join(experiment_id)
            .join(SERVER_DATA_LEAF)
    }
}

/// Resolved directory tree for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    task: String,
    data_dir: PathBuf,
    source_dir: PathBuf,
    bids_dir: PathBuf,
    derivatives_dir: PathBuf,
    reports_dir: PathBuf,
    analyses_dir: PathBuf,
}

impl DirectoryLayout {
    /// Derive every path from `data_dir` and `task`. Touches no files.
    pub fn resolve<P: Into<PathBuf>>(data_dir: P, task: &str) -> Self {
        let data_dir = data_dir.into();
        let task_dir = format!("{}{}", TASK_PREFIX, task);
        let derivatives_dir = data_dir.join(DERIVATIVES_DIR).join(&task_dir);

        Self {
            task: task.to_string(),
            source_dir: data_dir.join(SOURCE_DIR),
            bids_dir: data_dir.join(BIDS_DIR),
            reports_dir: derivatives_dir.join(REPORTS_DIR),
            analyses_dir: data_dir.join(ANALYSES_DIR).join(&task_dir),
            derivatives_dir,
            data_dir,
        }
    }

    /// Create every output directory that does not exist yet.
    ///
    /// Each directory is created with its parents independently of the others,
    /// so calling this again is a no-op.
    pub fn ensure(&self) -> Result<(), PathError> {
        for dir in self.created_dirs() {
            ensure_dir(dir)?;
        }
        debug!(data_dir = %self.data_dir.display(), task = %self.task, "directory layout ready");
        Ok(())
    }

    /// Directories [`DirectoryLayout::ensure`] creates, parents first
    pub fn created_dirs(&self) -> [&Path; 4] {
        [
            self.bids_dir.as_path(),
            self.derivatives_dir.as_path(),
            self.reports_dir.as_path(),
            self.analyses_dir.as_path(),
        ]
    }

    /// Whether every created directory is present
    pub fn is_ready(&self) -> bool {
        self.created_dirs().iter().all(|dir| dir.is_dir())
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Raw recordings and behavioral logs; read-only input, never created
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn bids_dir(&self) -> &Path {
        &self.bids_dir
    }

    pub fn derivatives_dir(&self) -> &Path {
        &self.derivatives_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn analyses_dir(&self) -> &Path {
        &self.analyses_dir
    }

    /// `derivatives / sub-<subject>`; resolution only
    pub fn subject_derivatives_dir(&self, subject: &str) -> PathBuf {
        self.derivatives_dir
            .join(format!("{}{}", SUBJECT_PREFIX, subject))
    }
}

fn ensure_dir(dir: &Path) -> Result<(), PathError> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(PathError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    std::fs::create_dir_all(dir).map_err(|source| PathError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// A task name must be a single normal path component.
pub fn is_valid_task_name(task: &str) -> bool {
    !task.is_empty()
        && task != "."
        && task != ".."
        && !task.contains(['/', '\\'])
        && !task.chars().any(char::is_control)
}
