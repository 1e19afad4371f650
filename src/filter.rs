//! Removal of non-essential paths from a raw file listing.
//!
//! Build artifacts, dependency caches, editor and VCS metadata, logs and
//! lock files add nothing to a codebase summary and are dropped before
//! ingestion. Matching is case-insensitive and works on `/`-separated
//! relative paths (`\` is normalized first).

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::source::SourceFile;

/// Directory names that exclude a path when they appear as any segment.
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", ".vscode", "dist", "build"];

/// File suffixes that exclude a path.
pub const EXCLUDED_SUFFIXES: &[&str] = &[".log", ".lock"];

/// Exclusion predicate over relative paths.
pub struct FileSetFilter {
    extra: GlobSet,
}

impl FileSetFilter {
    /// Filter with only the built-in exclusions.
    pub fn new() -> Self {
        Self {
            extra: GlobSet::empty(),
        }
    }

    /// Filter with the built-in exclusions plus user globs.
    pub fn with_excludes(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            extra: build_globset(patterns)?,
        })
    }

    /// Whether `path` should be dropped.
    pub fn is_excluded(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/").to_lowercase();

        if EXCLUDED_SUFFIXES.iter().any(|s| normalized.ends_with(s)) {
            return true;
        }

        // Every segment but the last is a directory
        let mut segments: Vec<&str> = normalized.split('/').collect();
        segments.pop();
        if segments.iter().any(|seg| EXCLUDED_DIRS.contains(seg)) {
            return true;
        }

        self.extra.is_match(&normalized)
    }

    /// Keep the files that are not excluded, preserving order.
    pub fn apply<F: SourceFile + ?Sized>(&self, files: Vec<Box<F>>) -> Vec<Box<F>> {
        files
            .into_iter()
            .filter(|f| !self.is_excluded(f.path()))
            .collect()
    }
}

impl Default for FileSetFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern)
                .case_insensitive(true)
                .build()?,
        );
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excludes_dependency_and_vcs_dirs_anywhere() {
        let f = FileSetFilter::new();
        assert!(f.is_excluded("node_modules/react/index.js"));
        assert!(f.is_excluded("web/node_modules/react/index.js"));
        assert!(f.is_excluded(".git/HEAD"));
        assert!(f.is_excluded("repo/.git/config"));
        assert!(f.is_excluded(".vscode/settings.json"));
        assert!(f.is_excluded("app/dist/bundle.js"));
        assert!(f.is_excluded("dist/bundle.js"));
        assert!(f.is_excluded("build/out.o"));
        assert!(f.is_excluded("pkg\\build\\out.o"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let f = FileSetFilter::new();
        assert!(f.is_excluded("Node_Modules/x.js"));
        assert!(f.is_excluded("src/Build/x.js"));
        assert!(f.is_excluded("logs/Server.LOG"));
        assert!(f.is_excluded("Cargo.LOCK"));
    }

    #[test]
    fn excludes_logs_and_locks() {
        let f = FileSetFilter::new();
        assert!(f.is_excluded("npm-debug.log"));
        assert!(f.is_excluded("yarn.lock"));
        assert!(f.is_excluded("deep/dir/Cargo.lock"));
    }

    #[test]
    fn keeps_lookalike_names() {
        let f = FileSetFilter::new();
        assert!(!f.is_excluded("src/main.rs"));
        assert!(!f.is_excluded("src/build.rs"));
        assert!(!f.is_excluded("src/distance.ts"));
        assert!(!f.is_excluded("docs/building/intro.md"));
        assert!(!f.is_excluded("src/logger.js"));
        assert!(!f.is_excluded("src/lockfile.ts"));
        assert!(!f.is_excluded("dist"));
    }

    #[test]
    fn extra_globs_apply_on_top() {
        let f = FileSetFilter::with_excludes(&["**/*.min.js".to_string()]).unwrap();
        assert!(f.is_excluded("static/app.MIN.js"));
        assert!(f.is_excluded("node_modules/a.js"));
        assert!(!f.is_excluded("static/app.js"));
    }

    #[test]
    fn invalid_glob_is_an_error() {
        assert!(FileSetFilter::with_excludes(&["a[".to_string()]).is_err());
    }
}
