use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    } else if path == "~" {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home);
        }
    }
    PathBuf::from(path)
}

/// Expands `~` and anchors relative paths at the current directory.
pub fn absolute_dir(path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        return Ok(expanded);
    }
    let cwd = std::env::current_dir().context("failed to get working directory")?;
    Ok(cwd.join(expanded))
}

/// Walks from `start` up to the filesystem root looking for `file_name`.
pub fn find_upward(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Step paths are resolved against the working directory, so they must stay inside it.
pub fn validate_step_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("step path must not be empty");
    }
    let p = Path::new(path);
    for component in p.components() {
        match component {
            Component::RootDir | Component::Prefix(_) => {
                bail!(
                    "step path must be relative: {}\n  hint: paths are resolved against the repository directory",
                    path
                );
            }
            Component::ParentDir => {
                bail!("step path must not contain '..': {}", path);
            }
            _ => {}
        }
    }
    Ok(())
}
