//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from `start`
///
/// Walks up parent directories until finding `config_name`.
///
/// # Example
/// ```text
/// /home/user/app/src/client/   ← start
/// /home/user/app/hmr.toml      ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

/// Absolute, lexically normalized form of `path` (resolves `.` and `..`
/// without touching the filesystem when the path does not exist).
pub fn normalize_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().unwrap_or_default().join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            std::path::Component::CurDir => {}
            std::path::Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_file_walks_upward() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src/client");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("hmr.toml"), "").unwrap();

        let found = find_config_file(&nested, Path::new("hmr.toml")).unwrap();
        assert_eq!(found, dir.path().join("hmr.toml"));
    }

    #[test]
    fn test_find_config_file_missing() {
        let dir = TempDir::new().unwrap();
        assert!(find_config_file(dir.path(), Path::new("no-such-config-name.toml")).is_none());
    }

    #[test]
    fn test_normalize_path_resolves_dots() {
        let p = normalize_path(Path::new("/definitely/not/../here/./x"));
        assert_eq!(p, PathBuf::from("/definitely/here/x"));
    }
}
