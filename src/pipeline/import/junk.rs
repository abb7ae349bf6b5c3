//! Noise filter for archive entries.
//!
//! OS metadata, VCS directories, dependency caches and lockfiles carry no
//! project state and would drown the payload. Matching is a plain,
//! case-sensitive substring test; over-filtering is acceptable.

/// Substrings that mark a path as junk.
pub const IGNORE_PATTERNS: &[&str] = &[
    "__MACOSX",
    ".DS_Store",
    "Thumbs.db",
    ".git",
    ".idea/",
    "node_modules",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".venv",
    "venv/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// True if `path` contains any ignore pattern.
pub fn is_junk(path: &str) -> bool {
    IGNORE_PATTERNS.iter().any(|pattern| path.contains(pattern))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_is_junk_anywhere_in_path() {
        for pattern in IGNORE_PATTERNS {
            assert!(is_junk(pattern), "{pattern} should be junk");
            assert!(is_junk(&format!("project/{pattern}/x")), "nested {pattern}");
            assert!(is_junk(&format!("prefix{pattern}suffix")), "embedded {pattern}");
        }
    }

    #[test]
    fn ordinary_paths_are_kept() {
        for path in ["main.py", "src/app.rs", "docs/README.md", "data/report.xlsx", ""] {
            assert!(!is_junk(path), "{path} should not be junk");
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!is_junk("Node_Modules/react/index.js"));
        assert!(!is_junk("__macosx/a.txt"));
        assert!(is_junk("node_modules/react/index.js"));
    }

    #[test]
    fn gitignore_is_filtered_as_accepted_false_positive() {
        assert!(is_junk(".gitignore"));
        assert!(is_junk("repo/.github/workflows/ci.yml"));
    }
}
