//! Core types for locsync.
//! The JSON reader decodes into these; the synchronizer works on these only.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Separator used when a [`KeyPath`] is rendered as a single string.
pub const PATH_SEPARATOR: &str = "::";

/// An ordered mapping of key name to node. Order is document order.
pub type Tree = IndexMap<String, ResourceNode>;

/// One node of a translation resource tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResourceNode {
    /// A translatable string. Interpolation placeholders are kept verbatim.
    Leaf(String),
    /// A nested group of keys.
    Subtree(Tree),
}

impl ResourceNode {
    pub fn leaf(value: impl Into<String>) -> Self {
        ResourceNode::Leaf(value.into())
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, ResourceNode::Leaf(_))
    }

    pub fn is_subtree(&self) -> bool {
        matches!(self, ResourceNode::Subtree(_))
    }

    pub fn as_leaf(&self) -> Option<&str> {
        match self {
            ResourceNode::Leaf(value) => Some(value),
            ResourceNode::Subtree(_) => None,
        }
    }

    pub fn as_subtree(&self) -> Option<&Tree> {
        match self {
            ResourceNode::Subtree(tree) => Some(tree),
            ResourceNode::Leaf(_) => None,
        }
    }

    /// Short name of the node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceNode::Leaf(_) => "string",
            ResourceNode::Subtree(_) => "object",
        }
    }
}

/// Location of a node inside a tree, as a sequence of key names.
///
/// Identity is segment-wise: `["a::b"]` and `["a", "b"]` are different paths
/// even though both render as `a::b`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn root() -> Self {
        KeyPath(Vec::new())
    }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new path with `key` appended.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        KeyPath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn is_prefix_of(&self, other: &KeyPath) -> bool {
        self.0.len() <= other.0.len() && self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }

    /// Iterates `self` and every ancestor, longest first. The root is not included.
    pub fn ancestors_inclusive(&self) -> impl Iterator<Item = &[String]> {
        (1..=self.0.len()).rev().map(move |n| &self.0[..n])
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(PATH_SEPARATOR))
    }
}

impl FromStr for KeyPath {
    type Err = std::convert::Infallible;

    /// Splits on the `::` separator. Only use for paths you rendered yourself.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(KeyPath::root());
        }
        Ok(KeyPath(s.split(PATH_SEPARATOR).map(str::to_string).collect()))
    }
}

/// Looks up the node at `path`.
pub fn node_at<'a>(tree: &'a Tree, path: &KeyPath) -> Option<&'a ResourceNode> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = tree;
    for segment in parents {
        current = current.get(segment)?.as_subtree()?;
    }
    current.get(last)
}

/// Looks up the node at `path` for mutation.
pub fn node_at_mut<'a>(tree: &'a mut Tree, path: &KeyPath) -> Option<&'a mut ResourceNode> {
    let (last, parents) = path.segments().split_last()?;
    let mut current = tree;
    for segment in parents {
        current = match current.get_mut(segment)? {
            ResourceNode::Subtree(sub) => sub,
            ResourceNode::Leaf(_) => return None,
        };
    }
    current.get_mut(last)
}

/// Collects every leaf beneath `node` as `(path, value)`, in document order.
/// A leaf node yields itself.
pub fn collect_leaves(node: &ResourceNode, path: &KeyPath) -> Vec<(KeyPath, String)> {
    let mut out = Vec::new();
    push_leaves(node, path, &mut out);
    out
}

fn push_leaves(node: &ResourceNode, path: &KeyPath, out: &mut Vec<(KeyPath, String)>) {
    match node {
        ResourceNode::Leaf(value) => out.push((path.clone(), value.clone())),
        ResourceNode::Subtree(tree) => {
            for (key, child) in tree {
                push_leaves(child, &path.child(key), out);
            }
        }
    }
}

/// Standard CLDR plural categories.
#[derive(Ord, PartialOrd, Eq, PartialEq, Debug, Clone, Copy, Deserialize, Serialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl FromStr for PluralCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ZERO" => Ok(PluralCategory::Zero),
            "ONE" => Ok(PluralCategory::One),
            "TWO" => Ok(PluralCategory::Two),
            "FEW" => Ok(PluralCategory::Few),
            "MANY" => Ok(PluralCategory::Many),
            "OTHER" => Ok(PluralCategory::Other),
            _ => Err(format!("Unknown plural category: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tree {
        let mut inner = Tree::new();
        inner.insert("title".to_string(), ResourceNode::leaf("Hello"));
        inner.insert("body".to_string(), ResourceNode::leaf("World"));
        let mut tree = Tree::new();
        tree.insert("page".to_string(), ResourceNode::Subtree(inner));
        tree.insert("footer".to_string(), ResourceNode::leaf("Bye"));
        tree
    }

    #[test]
    fn test_key_path_display_uses_separator() {
        let path = KeyPath::new(["page", "title"]);
        assert_eq!(path.to_string(), "page::title");
        assert_eq!("page::title".parse::<KeyPath>().unwrap(), path);
    }

    #[test]
    fn test_key_path_identity_is_segment_wise() {
        let joined = KeyPath::new(["a::b"]);
        let split = KeyPath::new(["a", "b"]);
        assert_eq!(joined.to_string(), split.to_string());
        assert_ne!(joined, split);
    }

    #[test]
    fn test_key_path_prefix() {
        let parent = KeyPath::new(["a"]);
        let child = parent.child("b");
        assert!(parent.is_prefix_of(&child));
        assert!(child.is_prefix_of(&child));
        assert!(!child.is_prefix_of(&parent));
        assert!(!KeyPath::new(["ab"]).is_prefix_of(&KeyPath::new(["a", "b"])));
    }

    #[test]
    fn test_ancestors_inclusive_longest_first() {
        let path = KeyPath::new(["a", "b", "c"]);
        let all: Vec<Vec<String>> = path.ancestors_inclusive().map(|s| s.to_vec()).collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0], vec!["a", "b", "c"]);
        assert_eq!(all[2], vec!["a"]);
    }

    #[test]
    fn test_node_lookup() {
        let mut tree = sample();
        let path = KeyPath::new(["page", "title"]);
        assert_eq!(node_at(&tree, &path).and_then(|n| n.as_leaf()), Some("Hello"));
        assert!(node_at(&tree, &KeyPath::new(["footer", "x"])).is_none());
        assert!(node_at(&tree, &KeyPath::root()).is_none());

        if let Some(ResourceNode::Leaf(value)) = node_at_mut(&mut tree, &path) {
            *value = "Hi".to_string();
        }
        assert_eq!(node_at(&tree, &path).and_then(|n| n.as_leaf()), Some("Hi"));
    }

    #[test]
    fn test_collect_leaves_in_document_order() {
        let tree = sample();
        let leaves = collect_leaves(&ResourceNode::Subtree(tree), &KeyPath::root());
        let keys: Vec<String> = leaves.iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(keys, vec!["page::title", "page::body", "footer"]);
    }

    #[test]
    fn test_plural_category_parse() {
        assert_eq!("few".parse::<PluralCategory>().unwrap(), PluralCategory::Few);
        assert!("several".parse::<PluralCategory>().is_err());
    }
}
