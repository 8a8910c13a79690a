//! The category tree is the nested structure the user navigates when answering "what are you
//! doing?". Every node is either a leaf, which is a directly recordable activity, or an interior
//! node with at least one named child.
//!
//! Nodes own their children directly, so the whole tree is a single value with structural
//! equality. Children are kept in a [BTreeMap], which makes sibling order irrelevant for
//! comparisons and gives the ascending order used for presenting options for free.

pub mod snapshot;

use std::{collections::BTreeMap, fmt::Display};

use snapshot::Snapshot;
use thiserror::Error;

/// Separator used when a path is written as a single string, e.g. `Books.Reading`.
pub const PATH_SEPARATOR: &str = ".";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("no category at path \"{path}\"")]
    NotFound { path: CategoryPath },
    #[error("option \"{name}\" already exists under \"{path}\"")]
    Collision { name: String, path: CategoryPath },
    #[error("cannot promote the root, path is empty")]
    EmptyPromotionPath,
}

/// Ordered sequence of category names leading from the root to a node. The empty path is the
/// root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CategoryPath(Vec<String>);

impl CategoryPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Name of the node the path points to. [None] for the root.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.0.push(name.into());
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut path = self.clone();
        path.push(name);
        path
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

    pub fn joined(&self) -> String {
        self.0.join(PATH_SEPARATOR)
    }
}

impl Display for CategoryPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_root() {
            write!(f, "<root>")
        } else {
            write!(f, "{}", self.joined())
        }
    }
}

impl<S: Into<String>> FromIterator<S> for CategoryPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A node of the category tree. The node does not know its own name, names live in the parent's
/// children map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryTree {
    children: BTreeMap<String, CategoryTree>,
}

impl CategoryTree {
    /// Creates an empty tree, which is also how a leaf looks.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Names of direct children in ascending order.
    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &CategoryTree)> {
        self.children.iter().map(|(name, node)| (name.as_str(), node))
    }

    pub fn contains_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }

    pub fn get_subtree(&self, path: &CategoryPath) -> Result<&CategoryTree, TreeError> {
        path.segments()
            .iter()
            .try_fold(self, |node, segment| node.children.get(segment))
            .ok_or_else(|| TreeError::NotFound { path: path.clone() })
    }

    fn get_subtree_mut(&mut self, path: &CategoryPath) -> Result<&mut CategoryTree, TreeError> {
        let mut node = self;
        for segment in path.segments() {
            node = node
                .children
                .get_mut(segment)
                .ok_or_else(|| TreeError::NotFound { path: path.clone() })?;
        }
        Ok(node)
    }

    /// Adds a new leaf called `name` under the node at `path`. If that node was a leaf it becomes
    /// an interior node.
    pub fn add_child(&mut self, path: &CategoryPath, name: &str) -> Result<(), TreeError> {
        let node = self.get_subtree_mut(path)?;
        if node.children.contains_key(name) {
            return Err(TreeError::Collision {
                name: name.to_owned(),
                path: path.clone(),
            });
        }
        node.children.insert(name.to_owned(), CategoryTree::new());
        Ok(())
    }

    /// Subdivides the node at `path`: its own name is re-inserted as a child so it stays
    /// selectable at the new level, then `name` is added next to it.
    ///
    /// Both insertions are validated before anything is touched, so a failure leaves the tree
    /// unchanged.
    pub fn add_child_with_sibling_promotion(
        &mut self,
        path: &CategoryPath,
        name: &str,
    ) -> Result<(), TreeError> {
        let own_name = path.last().ok_or(TreeError::EmptyPromotionPath)?.to_owned();
        let node = self.get_subtree_mut(path)?;

        for candidate in [own_name.as_str(), name] {
            if node.children.contains_key(candidate) {
                return Err(TreeError::Collision {
                    name: candidate.to_owned(),
                    path: path.clone(),
                });
            }
        }
        if own_name == name {
            return Err(TreeError::Collision {
                name: name.to_owned(),
                path: path.clone(),
            });
        }

        node.children.insert(own_name, CategoryTree::new());
        node.children.insert(name.to_owned(), CategoryTree::new());
        Ok(())
    }

    /// Exports the tree into its plain nested-mapping form.
    pub fn to_snapshot(&self) -> Snapshot {
        self.children
            .iter()
            .map(|(name, node)| {
                let value = if node.is_leaf() {
                    None
                } else {
                    Some(node.to_snapshot())
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Builds a tree from a snapshot. An empty nested mapping is read as a leaf, since a node
    /// without children can't be anything else.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let children = snapshot
            .entries()
            .map(|(name, value)| {
                let node = value
                    .as_ref()
                    .map(CategoryTree::from_snapshot)
                    .unwrap_or_default();
                (name.to_owned(), node)
            })
            .collect();
        Self { children }
    }
}
