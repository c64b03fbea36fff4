//! Path syntax and name rules.

use crate::error::FsError;
use serde::{Deserialize, Serialize};

pub const SEPARATOR: char = '/';
pub const CURRENT_DIR: &str = ".";
pub const PARENT_DIR: &str = "..";

/// Characters never allowed in a node name
pub const RESERVED_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

const TRIM_CHARS: [char; 4] = [' ', '\r', '\n', '\t'];

/// Sibling-name comparison policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameCase {
    #[default]
    Sensitive,
    Insensitive,
}

impl NameCase {
    pub fn matches(self, a: &str, b: &str) -> bool {
        match self {
            NameCase::Sensitive => a == b,
            NameCase::Insensitive => a == b || a.to_lowercase() == b.to_lowercase(),
        }
    }
}

/// Trim and validate a node name, returning the stored form.
pub fn normalize_name(name: &str) -> Result<String, FsError> {
    let trimmed = name.trim_matches(&TRIM_CHARS[..]);
    if trimmed.is_empty() {
        return Err(FsError::EmptyName);
    }
    if trimmed.contains(&RESERVED_CHARS[..])
        || trimmed == CURRENT_DIR
        || trimmed == PARENT_DIR
    {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Non-empty segments of a relative path, in order
pub fn segments(path: &str) -> Vec<&str> {
    path.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

pub fn is_absolute(path: &str) -> bool {
    path.starts_with(SEPARATOR)
}

/// Strip leading and trailing separators. An all-separator path becomes empty (the root).
pub fn trim_separators(path: &str) -> &str {
    path.trim_matches(SEPARATOR)
}

/// Validate a relative path for directory entry points.
pub fn check_relative(path: &str) -> Result<(), FsError> {
    if path.is_empty() {
        return Err(FsError::EmptyPath);
    }
    if is_absolute(path) {
        return Err(FsError::MustUseRelativePath(path.to_string()));
    }
    Ok(())
}

/// Validate an absolute path for store-handle entry points, returning the relative remainder.
pub fn strip_absolute(path: &str) -> Result<&str, FsError> {
    if path.is_empty() {
        return Err(FsError::EmptyPath);
    }
    if !is_absolute(path) {
        return Err(FsError::MustUseAbsolutePath(path.to_string()));
    }
    Ok(trim_separators(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_trimmed() {
        assert_eq!(normalize_name("  notes.txt\t\n").unwrap(), "notes.txt");
    }

    #[test]
    fn test_rejects_empty_and_blank() {
        assert!(matches!(normalize_name(""), Err(FsError::EmptyName)));
        assert!(matches!(normalize_name(" \t "), Err(FsError::EmptyName)));
    }

    #[test]
    fn test_rejects_reserved_chars_and_dot_tokens() {
        for bad in ["a/b", "a\\b", "c:", "x*", "what?", "\"q\"", "<a>", "p|q", ".", ".."] {
            assert!(
                matches!(normalize_name(bad), Err(FsError::InvalidName(_))),
                "{bad} should be rejected"
            );
        }
        assert!(normalize_name("...").is_ok());
        assert!(normalize_name(".hidden").is_ok());
    }

    #[test]
    fn test_segments_skip_empty() {
        assert_eq!(segments("a//b/./c/"), vec!["a", "b", ".", "c"]);
        assert!(segments("///").is_empty());
    }

    #[test]
    fn test_absolute_and_relative_checks() {
        assert_eq!(strip_absolute("/a/b/").unwrap(), "a/b");
        assert_eq!(strip_absolute("///").unwrap(), "");
        assert!(matches!(strip_absolute("a"), Err(FsError::MustUseAbsolutePath(_))));
        assert!(matches!(strip_absolute(""), Err(FsError::EmptyPath)));
        assert!(matches!(check_relative("/a"), Err(FsError::MustUseRelativePath(_))));
        assert!(check_relative("a/b").is_ok());
    }

    #[test]
    fn test_name_case_policy() {
        assert!(NameCase::Sensitive.matches("A", "A"));
        assert!(!NameCase::Sensitive.matches("A", "a"));
        assert!(NameCase::Insensitive.matches("Readme", "README"));
    }
}
