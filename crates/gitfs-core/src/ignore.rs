//! Ignore-aware path matching for the `current` view's staging layer.
//!
//! Unions `.gitignore`, `.gitmodules`-derived submodule paths, an optional
//! extra exclude file, and a "hard ignore" list (always-ignored paths like
//! `.git` itself) the same way the original `CachedIgnore` does, using the
//! `ignore` crate's gitignore matcher instead of hand-rolled glob matching.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// Union of ignore sources consulted before staging a path.
pub struct CachedIgnore {
    gitignore: Gitignore,
    submodules: Vec<String>,
    hard_ignore: Vec<String>,
}

impl CachedIgnore {
    /// Build the ignore set for a repository rooted at `repo_path`.
    ///
    /// `extra_exclude` is an additional exclude file path (e.g., from `-o
    /// exclude=<path>`); `hard_ignore` are paths that are never staged
    /// regardless of `.gitignore` content (GitFS always includes `.git`).
    #[must_use]
    pub fn new(repo_path: &Path, extra_exclude: Option<&Path>, hard_ignore: &[&str]) -> Self {
        let mut builder = GitignoreBuilder::new(repo_path);
        let _ = builder.add(repo_path.join(".gitignore"));
        if let Some(exclude) = extra_exclude {
            let _ = builder.add(exclude);
        }
        let gitignore = builder.build().unwrap_or_else(|_| Gitignore::empty());

        let submodules = read_submodule_paths(repo_path);
        let mut hard = vec![".git".to_owned()];
        hard.extend(hard_ignore.iter().map(|s| (*s).to_owned()));

        Self {
            gitignore,
            submodules,
            hard_ignore: hard,
        }
    }

    /// Whether `path` (relative to the repo root, no leading `/`) should be
    /// excluded from staging.
    #[must_use]
    pub fn is_ignored(&self, path: &str, is_dir: bool) -> bool {
        if self.hard_ignore.iter().any(|h| path == h || path.starts_with(&format!("{h}/"))) {
            return true;
        }
        if self.submodules.iter().any(|s| path == s) {
            return true;
        }
        self.gitignore.matched(path, is_dir).is_ignore()
    }
}

fn read_submodule_paths(repo_path: &Path) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(repo_path.join(".gitmodules")) else {
        return Vec::new();
    };
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            line.strip_prefix("path = ").map(str::to_owned)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn git_directory_always_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CachedIgnore::new(dir.path(), None, &[]);
        assert!(cache.is_ignored(".git", true));
        assert!(cache.is_ignored(".git/config", false));
    }

    #[test]
    fn gitignore_patterns_respected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "*.log\n").unwrap();
        let cache = CachedIgnore::new(dir.path(), None, &[]);
        assert!(cache.is_ignored("debug.log", false));
        assert!(!cache.is_ignored("main.rs", false));
    }

    #[test]
    fn submodule_paths_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".gitmodules"),
            "[submodule \"vendor/lib\"]\n\tpath = vendor/lib\n\turl = https://example.com/lib.git\n",
        )
        .unwrap();
        let cache = CachedIgnore::new(dir.path(), None, &[]);
        assert!(cache.is_ignored("vendor/lib", true));
    }
}
