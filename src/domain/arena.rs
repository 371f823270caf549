//! Arena-based lineage forest.
//!
//! Nodes live in a single generational arena; parent and child links are
//! stored as arena indices, so a child only refers back to its parent and
//! never owns it. All traversals use explicit stacks, lineage chains can be
//! arbitrarily deep.

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::{Resource, Slot, Time};
use crate::domain::error::DomainError;

/// Result type for forest operations.
pub type ForestResult<T> = Result<T, DomainError>;

/// One resource instance within a lineage tree.
#[derive(Debug, Clone)]
pub struct LineageNode {
    /// Resource payload; its id identifies the node
    pub resource: Resource,
    /// Index of the node owning the slot that points here, None for roots
    pub parent: Option<Index>,
    pub left: Option<Index>,
    pub right: Option<Index>,
}

impl LineageNode {
    fn new(resource: Resource) -> Self {
        Self {
            resource,
            parent: None,
            left: None,
            right: None,
        }
    }

    pub fn child(&self, slot: Slot) -> Option<Index> {
        match slot {
            Slot::Left => self.left,
            Slot::Right => self.right,
        }
    }

    /// Occupied child slots, left first.
    pub fn children(&self) -> impl Iterator<Item = Index> {
        self.left.into_iter().chain(self.right)
    }

    pub fn has_children(&self) -> bool {
        self.left.is_some() || self.right.is_some()
    }
}

impl PartialEq for LineageNode {
    fn eq(&self, other: &Self) -> bool {
        self.resource.id == other.resource.id
    }
}

impl Eq for LineageNode {}

impl Hash for LineageNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.id.hash(state);
    }
}

/// Forest of lineage trees sharing one arena.
///
/// Roots are kept in insertion order. The same resource may appear in more
/// than one tree (e.g. a resource received twice); forest-wide queries
/// deduplicate by resource id.
#[derive(Debug, Default)]
pub struct LineageForest {
    arena: Arena<LineageNode>,
    roots: Vec<Index>,
}

impl LineageForest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new tree consisting of `resource` alone.
    #[instrument(level = "trace", skip(self))]
    pub fn insert_root(&mut self, resource: Resource) -> Index {
        let idx = self.arena.insert(LineageNode::new(resource));
        self.roots.push(idx);
        idx
    }

    /// Add a detached node, to be placed with [`LineageForest::attach`].
    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, resource: Resource) -> Index {
        self.arena.insert(LineageNode::new(resource))
    }

    /// Place `child` in `slot` of `parent` and set its back-reference.
    ///
    /// Fails without modifying the forest if the slot is taken or the child
    /// already hangs under another node.
    #[instrument(level = "trace", skip(self))]
    pub fn attach(&mut self, parent: Index, slot: Slot, child: Index) -> ForestResult<()> {
        let child_node = self.arena.get(child).ok_or(DomainError::UnknownNode)?;
        let parent_node = self.arena.get(parent).ok_or(DomainError::UnknownNode)?;

        if let Some(existing) = child_node.parent {
            let first = self
                .arena
                .get(existing)
                .map(|n| n.resource.id)
                .ok_or(DomainError::UnknownNode)?;
            return Err(DomainError::MultipleParents {
                child: child_node.resource.id,
                first,
                second: parent_node.resource.id,
            });
        }
        if parent_node.child(slot).is_some() {
            return Err(DomainError::SlotOccupied {
                parent: parent_node.resource.id,
                slot,
            });
        }

        if let Some(parent_node) = self.arena.get_mut(parent) {
            match slot {
                Slot::Left => parent_node.left = Some(child),
                Slot::Right => parent_node.right = Some(child),
            }
        }
        if let Some(child_node) = self.arena.get_mut(child) {
            child_node.parent = Some(parent);
        }
        Ok(())
    }

    pub fn get_node(&self, idx: Index) -> Option<&LineageNode> {
        self.arena.get(idx)
    }

    pub fn roots(&self) -> &[Index] {
        &self.roots
    }

    /// Number of nodes across all trees.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn is_slot_free(&self, idx: Index, slot: Slot) -> bool {
        self.get_node(idx).is_some_and(|n| n.child(slot).is_none())
    }

    /// Leaf test under `cutoff` (`None` is +infinity).
    ///
    /// A node is a leaf iff it exists before `cutoff` and none of its
    /// children do. A node created at or after `cutoff` is not a leaf.
    pub fn is_leaf(&self, idx: Index, cutoff: Option<Time>) -> bool {
        let Some(node) = self.get_node(idx) else {
            return false;
        };
        let before = |t: Time| cutoff.map_or(true, |c| t < c);

        let child_exists = node
            .children()
            .filter_map(|c| self.get_node(c))
            .any(|c| before(c.resource.time));
        !child_exists && before(node.resource.time)
    }

    /// Nodes representing the undivided state of the tree under `idx`
    /// as of `cutoff`, in left-to-right order.
    #[instrument(level = "trace", skip(self))]
    pub fn frontier(&self, idx: Index, cutoff: Option<Time>) -> Vec<Index> {
        let mut result = Vec::new();
        let mut stack = vec![idx];

        while let Some(current) = stack.pop() {
            let Some(node) = self.get_node(current) else {
                continue;
            };
            if self.is_leaf(current, cutoff) {
                result.push(current);
                continue;
            }
            if cutoff.is_some_and(|c| node.resource.time >= c) {
                // not yet created; its parent is covered one level up
                continue;
            }
            if let Some(right) = node.right {
                stack.push(right);
            }
            if let Some(left) = node.left {
                stack.push(left);
            }
        }
        result
    }

    /// Union of every tree's frontier, deduplicated by resource id.
    #[instrument(level = "debug", skip(self))]
    pub fn forest_frontier(&self, cutoff: Option<Time>) -> BTreeSet<Resource> {
        self.roots
            .iter()
            .flat_map(|&root| self.frontier(root, cutoff))
            .filter_map(|idx| self.get_node(idx).map(|n| n.resource))
            .collect()
    }

    /// Nodes without children in the tree under `idx`.
    pub fn leaves(&self, idx: Index) -> Vec<Index> {
        self.iter_tree(idx)
            .filter(|(_, node)| !node.has_children())
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of levels in the tree under `idx`, 0 if it does not exist.
    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self, idx: Index) -> usize {
        let mut max_depth = 0;
        let mut stack = Vec::new();
        if self.get_node(idx).is_some() {
            stack.push((idx, 1));
        }
        while let Some((current, depth)) = stack.pop() {
            max_depth = max_depth.max(depth);
            if let Some(node) = self.get_node(current) {
                for child in node.children() {
                    stack.push((child, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Every parent-child pair in the forest, tree by tree.
    pub fn edges(&self) -> Vec<(&Resource, &Resource)> {
        self.iter()
            .flat_map(move |(_, node)| {
                node.children()
                    .filter_map(move |c| self.get_node(c))
                    .map(move |child| (&node.resource, &child.resource))
            })
            .collect()
    }

    /// Pre-order walk of the tree under `idx`, left before right.
    pub fn iter_tree(&self, idx: Index) -> TreeIterator<'_> {
        TreeIterator::new(self, idx)
    }

    /// Post-order walk of the tree under `idx`, children before parents.
    pub fn iter_postorder(&self, idx: Index) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self, idx)
    }

    /// Pre-order walk over all trees.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &LineageNode)> {
        self.roots.iter().flat_map(move |&root| self.iter_tree(root))
    }
}

pub struct TreeIterator<'a> {
    forest: &'a LineageForest,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(forest: &'a LineageForest, root: Index) -> Self {
        Self {
            forest,
            stack: vec![root],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a LineageNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current) {
                // right first so left pops first
                self.stack.extend(node.right);
                self.stack.extend(node.left);
                return Some((current, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    forest: &'a LineageForest,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(forest: &'a LineageForest, root: Index) -> Self {
        Self {
            forest,
            stack: vec![(root, false)],
        }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a LineageNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current, visited)) = self.stack.pop() {
            if let Some(node) = self.forest.get_node(current) {
                if visited {
                    return Some((current, node));
                }
                self.stack.push((current, true));
                if let Some(right) = node.right {
                    self.stack.push((right, false));
                }
                if let Some(left) = node.left {
                    self.stack.push((left, false));
                }
            }
        }
        None
    }
}
