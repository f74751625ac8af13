use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "mailcraft";

/// Filesystem locations the service reads from and writes to.
///
/// `config.yml` lives under `project_root`; secrets and logs live under
/// `user_data_dir` so they stay out of the source tree in release builds.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub project_root: PathBuf,
    pub user_data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub secrets_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        let lookup = |name: &str| env::var(name).ok();
        let project_root = project_root(lookup);
        let user_data_dir = user_data_dir(&project_root, lookup);
        Self::from_dirs(project_root, user_data_dir)
    }

    /// Build paths rooted at explicit directories, creating the data and log dirs.
    pub fn from_dirs(project_root: PathBuf, user_data_dir: PathBuf) -> Self {
        let log_dir = user_data_dir.join("logs");
        if let Err(err) = fs::create_dir_all(&log_dir) {
            eprintln!("cannot create {}: {}", log_dir.display(), err);
        }

        AppPaths {
            secrets_path: user_data_dir.join("secrets.yaml"),
            project_root,
            user_data_dir,
            log_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

/// `MAILCRAFT_ROOT`, else the crate dir when it holds a `config.yml`, else cwd.
fn project_root<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(root) = lookup("MAILCRAFT_ROOT") {
        return PathBuf::from(root);
    }

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join("config.yml").is_file() {
        return manifest_dir;
    }
    env::current_dir().unwrap_or(manifest_dir)
}

fn user_data_dir<F>(project_root: &Path, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup("MAILCRAFT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    // Debug builds keep everything next to the checkout.
    if cfg!(debug_assertions) {
        return project_root.to_path_buf();
    }
    platform_data_dir(lookup)
}

fn platform_data_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let home = lookup("HOME")
        .or_else(|| lookup("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    if cfg!(target_os = "windows") {
        let base = lookup("LOCALAPPDATA").map(PathBuf::from).unwrap_or(home);
        return base.join("Mailcraft");
    }
    if cfg!(target_os = "macos") {
        return home.join("Library/Application Support/Mailcraft");
    }

    lookup("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join(".local/share"))
        .join(APP_DIR)
}
