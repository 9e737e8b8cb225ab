// Hierarchical view over a flat path list, with interactive pruning.
//
// Nodes live in an arena and refer to children by index. Filtering only
// detaches indices from child lists, so nothing ever points at a removed node.
use serde::Serialize;

pub const ROOT_LABEL: &str = "Files";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    label: String,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub label: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<Node>,
}

impl PathTree {
    pub fn build<S: AsRef<str>>(paths: &[S]) -> Self {
        let mut tree = PathTree {
            nodes: vec![Node {
                label: ROOT_LABEL.to_string(),
                children: Vec::new(),
            }],
        };
        for path in paths {
            let mut cursor = tree.root();
            for segment in path
                .as_ref()
                .split(['/', '\\'])
                .filter(|segment| !segment.is_empty())
            {
                cursor = tree.child_or_insert(cursor, segment);
            }
        }
        log::trace!("Built path tree with {} nodes", tree.nodes.len());
        tree
    }

    fn child_or_insert(&mut self, parent: NodeId, label: &str) -> NodeId {
        if let Some(existing) = self.nodes[parent.0]
            .children
            .iter()
            .find(|child| self.nodes[child.0].label == label)
        {
            return *existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            label: label.to_string(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.nodes[id.0].label
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    // Post-order prune: after filtering a child's subtree, the child is
    // dropped if it is now a leaf and its label does not contain `query`
    // (case-insensitive). An empty query keeps everything.
    pub fn filter(&mut self, query: &str) {
        let query_lower = query.to_lowercase();
        self.filter_node(self.root(), &query_lower);
    }

    fn filter_node(&mut self, id: NodeId, query_lower: &str) {
        let children = self.nodes[id.0].children.clone();
        for child in &children {
            self.filter_node(*child, query_lower);
        }
        let kept: Vec<NodeId> = children
            .into_iter()
            .filter(|child| {
                let node = &self.nodes[child.0];
                !node.children.is_empty() || node.label.to_lowercase().contains(query_lower)
            })
            .collect();
        self.nodes[id.0].children = kept;
    }

    pub fn filtered(mut self, query: &str) -> Self {
        self.filter(query);
        self
    }

    pub fn leaf_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let children = self.children(id);
            if children.is_empty() && id != self.root() {
                count += 1;
            }
            stack.extend_from_slice(children);
        }
        count
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(self.root(), 0, &mut out);
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.label(id));
        if !self.is_leaf(id) && id != self.root() {
            out.push('/');
        }
        out.push('\n');
        for child in self.children(id) {
            self.render_node(*child, depth + 1, out);
        }
    }

    pub fn to_nested(&self) -> TreeNode {
        self.nested_from(self.root())
    }

    fn nested_from(&self, id: NodeId) -> TreeNode {
        TreeNode {
            label: self.label(id).to_string(),
            children: self
                .children(id)
                .iter()
                .map(|child| self.nested_from(*child))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(tree: &PathTree, id: NodeId) -> Vec<&str> {
        tree.children(id).iter().map(|c| tree.label(*c)).collect()
    }

    #[test]
    fn test_build_merges_shared_prefixes() {
        let tree = PathTree::build(&["src/a.rs", "src\\b.rs", "/README.md", "src//c.rs"]);
        let root = tree.root();
        assert_eq!(tree.label(root), ROOT_LABEL);
        assert_eq!(labels(&tree, root), vec!["src", "README.md"]);
        let src = tree.children(root)[0];
        assert_eq!(labels(&tree, src), vec!["a.rs", "b.rs", "c.rs"]);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_file_and_directory_with_same_label_share_a_node() {
        let tree = PathTree::build(&["docs", "docs/guide.md"]);
        let docs = tree.children(tree.root())[0];
        assert_eq!(tree.children(tree.root()).len(), 1);
        assert_eq!(labels(&tree, docs), vec!["guide.md"]);
    }

    #[test]
    fn test_filter_prunes_non_matching_leaves_and_empty_dirs() {
        let tree = PathTree::build(&["src/main.rs", "src/util.rs", "docs/notes.md"]).filtered("MAIN");
        let nested = tree.to_nested();
        assert_eq!(
            nested,
            TreeNode {
                label: ROOT_LABEL.to_string(),
                children: vec![TreeNode {
                    label: "src".to_string(),
                    children: vec![TreeNode {
                        label: "main.rs".to_string(),
                        children: vec![],
                    }],
                }],
            }
        );
    }

    #[test]
    fn test_filter_keeps_matching_directory_once_emptied() {
        // "docs" loses its children, becomes a leaf, and then matches itself.
        let tree = PathTree::build(&["docs/notes.md"]).filtered("doc");
        assert_eq!(labels(&tree, tree.root()), vec!["docs"]);
        assert!(tree.is_leaf(tree.children(tree.root())[0]));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let paths = ["a/b/c.txt", "a/d.rs", "e/f/g.rs", "h.txt"];
        let once = PathTree::build(&paths).filtered("rs");
        let twice = once.clone().filtered("rs");
        assert_eq!(once.to_nested(), twice.to_nested());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let paths = ["a/b.txt", "c.txt"];
        let tree = PathTree::build(&paths);
        let filtered = tree.clone().filtered("");
        assert_eq!(tree.to_nested(), filtered.to_nested());
    }

    #[test]
    fn test_render_outline() {
        let tree = PathTree::build(&["src/main.rs", "Cargo.toml"]);
        assert_eq!(tree.render(), "Files\n  src/\n    main.rs\n  Cargo.toml\n");
    }
}
