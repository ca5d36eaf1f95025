//! Hierarchical group paths.
//!
//! A [`GroupPath`] names a node in the tree of job groups. Every path has an
//! implicit empty root as its first ancestor; `site-A/indexing` has the
//! ancestors `<root>` and `site-A`.
//!
//! # Example
//!
//! ```
//! use groupexec::executor::GroupPath;
//!
//! let site: GroupPath = "site-A".parse().unwrap();
//! let indexing = site.child("indexing");
//!
//! assert!(site.is_ancestor_of(&indexing));
//! assert!(GroupPath::root().is_ancestor_of(&site));
//! assert_eq!(indexing.to_string(), "site-A/indexing");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Separator used by [`GroupPath`]'s `Display` and `FromStr` forms.
pub const PATH_SEPARATOR: char = '/';

/// Display form of the root path, accepted back by `FromStr`.
const ROOT_DISPLAY: &str = "<root>";

/// Immutable ordered sequence of segments identifying a job group.
///
/// `Display` and `FromStr` round-trip for paths built by parsing. Segments
/// passed to [`new`](Self::new) or [`child`](Self::child) are stored as
/// given, so one containing `/` or surrounding whitespace prints in a form
/// that parses back to different segments.
#[derive(Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct GroupPath(Vec<String>);

impl GroupPath {
    /// The empty root path, ancestor of every other path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Creates a path from its segments, outermost first.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new path one level below this one.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Returns the direct parent, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        match self.0.split_last() {
            Some((_, rest)) => Some(Self(rest.to_vec())),
            None => None,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `self` is a strict prefix of `other`.
    ///
    /// A path is never its own ancestor.
    pub fn is_ancestor_of(&self, other: &GroupPath) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// Returns true if neither path is an ancestor of the other and they differ.
    pub fn is_unrelated_to(&self, other: &GroupPath) -> bool {
        self != other && !self.is_ancestor_of(other) && !other.is_ancestor_of(self)
    }

    /// Returns every strict ancestor, root first and direct parent last.
    pub fn ancestors(&self) -> Vec<GroupPath> {
        (0..self.0.len())
            .map(|depth| Self(self.0[..depth].to_vec()))
            .collect()
    }
}

impl fmt::Debug for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupPath({})", self)
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(ROOT_DISPLAY);
        }
        let mut first = true;
        for segment in &self.0 {
            if !first {
                write!(f, "{}", PATH_SEPARATOR)?;
            }
            write!(f, "{}", segment)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for GroupPath {
    type Err = Infallible;

    /// Splits on `/`, ignoring empty segments. `""`, `"/"` and `"<root>"`
    /// parse to the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == ROOT_DISPLAY {
            return Ok(Self::root());
        }
        Ok(Self(
            s.split(PATH_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        ))
    }
}

impl From<Vec<String>> for GroupPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for GroupPath {
    fn from(segments: &[&str]) -> Self {
        Self::new(segments.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn path(s: &str) -> GroupPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_root_is_ancestor_of_everything_but_itself() {
        let root = GroupPath::root();
        assert!(root.is_ancestor_of(&path("a")));
        assert!(root.is_ancestor_of(&path("a/b/c")));
        assert!(!root.is_ancestor_of(&root));
    }

    #[test]
    fn test_ancestry_is_segment_prefix_not_string_prefix() {
        assert!(path("site").is_ancestor_of(&path("site/indexing")));
        assert!(!path("site").is_ancestor_of(&path("site-A")));
        assert!(!path("site/indexing").is_ancestor_of(&path("site")));
    }

    #[test]
    fn test_siblings_are_unrelated() {
        assert!(path("a/b").is_unrelated_to(&path("a/c")));
        assert!(!path("a").is_unrelated_to(&path("a/c")));
        assert!(!path("a").is_unrelated_to(&path("a")));
    }

    #[test]
    fn test_ancestors_root_first() {
        let ancestors = path("a/b/c").ancestors();
        assert_eq!(ancestors, vec![GroupPath::root(), path("a"), path("a/b")]);
        assert!(GroupPath::root().ancestors().is_empty());
    }

    #[test]
    fn test_parent_and_child() {
        let ab = path("a").child("b");
        assert_eq!(ab, GroupPath::new(["a", "b"]));
        assert_eq!(ab.parent(), Some(path("a")));
        assert_eq!(path("a").parent(), Some(GroupPath::root()));
        assert_eq!(GroupPath::root().parent(), None);
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(path("site-A/indexing").to_string(), "site-A/indexing");
        assert_eq!(path("/a//b/").segments(), &["a".to_string(), "b".to_string()]);
        assert_eq!(GroupPath::root().to_string(), "<root>");
        assert!(path("").is_root());
    }

    #[test]
    fn test_root_display_parses_back_to_root() {
        let root = GroupPath::root();
        assert_eq!(path(&root.to_string()), root);
        assert!(path(" <root> ").is_root());
        assert_eq!(path("<root>/a").segments(), &["<root>".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_segment_with_separator_does_not_round_trip() {
        let p = GroupPath::new(["a/b"]);
        assert_eq!(p.len(), 1);
        assert_eq!(path(&p.to_string()), GroupPath::new(["a", "b"]));
    }

    proptest! {
        /// Property: every path reported by `ancestors()` is an ancestor, and
        /// there is exactly one per level above the path.
        #[test]
        fn prop_ancestors_are_ancestors(segments in proptest::collection::vec("[a-z]{1,4}", 0..6)) {
            let p = GroupPath::new(segments.clone());
            let ancestors = p.ancestors();
            prop_assert_eq!(ancestors.len(), segments.len());
            for (depth, ancestor) in ancestors.iter().enumerate() {
                prop_assert_eq!(ancestor.len(), depth);
                prop_assert!(ancestor.is_ancestor_of(&p));
                prop_assert!(!p.is_ancestor_of(ancestor));
            }
        }

        /// Property: parsed paths survive a trip through `Display`.
        #[test]
        fn prop_display_parse_round_trip(segments in proptest::collection::vec("[a-z-]{1,4}", 0..6)) {
            let p = GroupPath::new(segments);
            prop_assert_eq!(path(&p.to_string()), p);
        }

        /// Property: appending a segment always yields a descendant.
        #[test]
        fn prop_child_is_descendant(
            segments in proptest::collection::vec("[a-z]{1,4}", 0..6),
            extra in "[a-z]{1,4}",
        ) {
            let p = GroupPath::new(segments);
            let c = p.child(extra);
            prop_assert!(p.is_ancestor_of(&c));
            prop_assert_eq!(c.parent(), Some(p));
        }
    }
}
