//! Textual renderings of a lineage forest: Graphviz DOT and terminal trees.

use std::collections::{BTreeSet, HashMap};

use generational_arena::Index;
use itertools::Itertools;
use termtree::Tree;

use crate::domain::LineageForest;

/// Deduplicated `"parent" -> "child"` edge lines, sorted.
pub fn dot_edges(forest: &LineageForest) -> BTreeSet<String> {
    forest
        .edges()
        .into_iter()
        .map(|(parent, child)| format!("\"{}\" -> \"{}\"", parent, child))
        .collect()
}

/// Directed graph description of every parent-child edge in the forest.
pub fn dot_graph(forest: &LineageForest) -> String {
    let body = dot_edges(forest)
        .iter()
        .map(|edge| format!("    {};\n", edge))
        .join("");
    format!("digraph G {{\n{}}}\n", body)
}

/// Conversion of lineage trees into printable `termtree` trees.
pub trait TreeRender {
    /// One printable tree per root.
    fn to_trees(&self) -> Vec<Tree<String>>;
}

impl TreeRender for LineageForest {
    fn to_trees(&self) -> Vec<Tree<String>> {
        self.roots()
            .iter()
            .filter_map(|&root| render_tree(self, root))
            .collect()
    }
}

// built bottom-up from a post-order walk so deep chains need no recursion
fn render_tree(forest: &LineageForest, root: Index) -> Option<Tree<String>> {
    let mut rendered: HashMap<Index, Tree<String>> = HashMap::new();
    for (idx, node) in forest.iter_postorder(root) {
        let leaves: Vec<_> = node
            .children()
            .filter_map(|child| rendered.remove(&child))
            .collect();
        rendered.insert(idx, Tree::new(node.resource.to_string()).with_leaves(leaves));
    }
    rendered.remove(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Resource, Slot};

    fn split_forest() -> LineageForest {
        let mut forest = LineageForest::new();
        let r1 = forest.insert_root(Resource::new(1, 0, 10.0));
        let r2 = forest.insert_node(Resource::new(2, 5, 4.0));
        let r3 = forest.insert_node(Resource::new(3, 5, 6.0));
        forest.attach(r1, Slot::Left, r2).unwrap();
        forest.attach(r1, Slot::Right, r3).unwrap();
        forest
    }

    #[test]
    fn dot_graph_has_header_edges_and_footer() {
        let graph = dot_graph(&split_forest());
        assert_eq!(
            graph,
            "digraph G {\n\
             \x20   \"Res 1 @ t=0 (qty 10)\" -> \"Res 2 @ t=5 (qty 4)\";\n\
             \x20   \"Res 1 @ t=0 (qty 10)\" -> \"Res 3 @ t=5 (qty 6)\";\n\
             }\n"
        );
    }

    #[test]
    fn empty_forest_renders_empty_graph() {
        assert_eq!(dot_graph(&LineageForest::new()), "digraph G {\n}\n");
    }

    #[test]
    fn tree_render_nests_children() {
        let trees = split_forest().to_trees();
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].root, "Res 1 @ t=0 (qty 10)");
        assert_eq!(trees[0].leaves.len(), 2);
        assert_eq!(trees[0].leaves[1].root, "Res 3 @ t=5 (qty 6)");
    }
}
