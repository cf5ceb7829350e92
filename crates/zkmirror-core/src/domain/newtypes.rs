//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for domain identifiers and values.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// UUID-based ID types
// ============================================================================

/// Identifier attached to one sync request, carried through its tracing spans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random RequestId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Node paths
// ============================================================================

/// Absolute path of a node in the remote namespace
///
/// Format: `/` for the root, otherwise `/`-separated non-empty components
/// with a leading slash and no trailing slash, e.g. `/app/cfg/a.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodePath(String);

impl NodePath {
    /// Create a new NodePath from its canonical form
    ///
    /// # Errors
    /// Returns error if the path is not absolute, has a trailing slash,
    /// contains an empty, `.` or `..` component, or contains a NUL character
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidNodePath(format!(
                "Node path must start with '/': {path}"
            )));
        }

        if path == "/" {
            return Ok(Self(path));
        }

        if path.ends_with('/') {
            return Err(DomainError::InvalidNodePath(format!(
                "Node path must not end with '/': {path}"
            )));
        }

        for component in path[1..].split('/') {
            validate_component(component)
                .map_err(|reason| DomainError::InvalidNodePath(format!("{reason}: {path}")))?;
        }

        Ok(Self(path))
    }

    /// Normalize a user-supplied destination prefix
    ///
    /// Trailing separators are dropped (`/app/` becomes `/app`, `//` becomes `/`),
    /// then the result is validated like [`NodePath::new`].
    ///
    /// # Errors
    /// Returns error if the trimmed path is not a valid node path
    pub fn normalize(path: &str) -> Result<Self, DomainError> {
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() && path.starts_with('/') {
            return Ok(Self::root());
        }
        Self::new(trimmed.to_string())
    }

    /// The root node `/`
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Returns true for the root node
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one component
    ///
    /// # Errors
    /// Returns error if the component is empty, `.`, `..`, or contains `/` or NUL
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        validate_component(component).map_err(|reason| {
            DomainError::InvalidNodePath(format!("{reason}: {component:?}"))
        })?;

        let path = if self.is_root() {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };

        Ok(Self(path))
    }

    /// Get the parent path (`None` for the root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// Last component of the path (`None` for the root)
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }

    /// Returns true if `self` is `other` or lies below it
    #[must_use]
    pub fn starts_with(&self, other: &NodePath) -> bool {
        if other.is_root() || self == other {
            return true;
        }
        self.0
            .strip_prefix(other.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }
}

fn validate_component(component: &str) -> Result<(), &'static str> {
    if component.is_empty() {
        return Err("Empty path component");
    }
    if component == "." || component == ".." {
        return Err("Relative path component");
    }
    if component.contains('/') {
        return Err("Path component contains '/'");
    }
    if component.contains('\0') {
        return Err("Path component contains NUL");
    }
    Ok(())
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for NodePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<NodePath> for String {
    fn from(path: NodePath) -> Self {
        path.0
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod request_id_tests {
        use super::*;

        #[test]
        fn test_new_ids_are_unique() {
            assert_ne!(RequestId::new(), RequestId::new());
        }

        #[test]
        fn test_display_is_hyphenated_uuid() {
            let id = RequestId::new();
            let text = id.to_string();
            assert_eq!(text.len(), 36);
            assert_eq!(text.matches('-').count(), 4);
        }
    }

    mod node_path_tests {
        use super::*;

        #[test]
        fn test_valid_path() {
            let path = NodePath::new("/app/cfg/a.txt".to_string()).unwrap();
            assert_eq!(path.as_str(), "/app/cfg/a.txt");
        }

        #[test]
        fn test_root() {
            let root = NodePath::root();
            assert_eq!(root.as_str(), "/");
            assert!(root.is_root());
            assert_eq!(root.parent(), None);
            assert_eq!(root.name(), None);
        }

        #[test]
        fn test_no_leading_slash_fails() {
            assert!(NodePath::new("app/cfg".to_string()).is_err());
        }

        #[test]
        fn test_trailing_slash_fails() {
            assert!(NodePath::new("/app/".to_string()).is_err());
        }

        #[test]
        fn test_double_slash_fails() {
            assert!(NodePath::new("/app//cfg".to_string()).is_err());
        }

        #[test]
        fn test_relative_components_fail() {
            assert!(NodePath::new("/app/../cfg".to_string()).is_err());
            assert!(NodePath::new("/app/./cfg".to_string()).is_err());
        }

        #[test]
        fn test_dots_inside_name_allowed() {
            assert!(NodePath::new("/app/..hidden".to_string()).is_ok());
            assert!(NodePath::new("/app/a.b.c".to_string()).is_ok());
        }

        #[test]
        fn test_normalize_trims_trailing_slashes() {
            assert_eq!(NodePath::normalize("/app/").unwrap().as_str(), "/app");
            assert_eq!(NodePath::normalize("/app").unwrap().as_str(), "/app");
            assert_eq!(NodePath::normalize("/").unwrap().as_str(), "/");
            assert_eq!(NodePath::normalize("//").unwrap().as_str(), "/");
        }

        #[test]
        fn test_normalize_rejects_relative() {
            assert!(NodePath::normalize("app").is_err());
            assert!(NodePath::normalize("").is_err());
        }

        #[test]
        fn test_join_from_root_has_single_separator() {
            let path = NodePath::root().join("cfg").unwrap();
            assert_eq!(path.as_str(), "/cfg");
        }

        #[test]
        fn test_join_nested() {
            let path = NodePath::normalize("/app/").unwrap().join("cfg").unwrap();
            assert_eq!(path.as_str(), "/app/cfg");
        }

        #[test]
        fn test_join_rejects_bad_components() {
            let base = NodePath::root();
            assert!(base.join("").is_err());
            assert!(base.join("..").is_err());
            assert!(base.join("a/b").is_err());
        }

        #[test]
        fn test_parent_and_name() {
            let path = NodePath::new("/app/cfg/a.txt".to_string()).unwrap();
            assert_eq!(path.name(), Some("a.txt"));
            assert_eq!(path.parent().unwrap().as_str(), "/app/cfg");
            assert_eq!(
                NodePath::new("/app".to_string()).unwrap().parent(),
                Some(NodePath::root())
            );
        }

        #[test]
        fn test_starts_with() {
            let app = NodePath::new("/app".to_string()).unwrap();
            let cfg = NodePath::new("/app/cfg".to_string()).unwrap();
            let apple = NodePath::new("/apple".to_string()).unwrap();
            assert!(cfg.starts_with(&app));
            assert!(app.starts_with(&app));
            assert!(app.starts_with(&NodePath::root()));
            assert!(!apple.starts_with(&app));
        }

        #[test]
        fn test_ordering_is_lexicographic() {
            let a = NodePath::new("/a".to_string()).unwrap();
            let b = NodePath::new("/b".to_string()).unwrap();
            assert!(a < b);
        }

        #[test]
        fn test_serde_roundtrip() {
            let path = NodePath::new("/app/cfg".to_string()).unwrap();
            let yaml = serde_yaml::to_string(&path).unwrap();
            let back: NodePath = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(path, back);
        }

        #[test]
        fn test_serde_rejects_invalid() {
            let result: Result<NodePath, _> = serde_yaml::from_str("\"relative/path\"");
            assert!(result.is_err());
        }
    }
}
