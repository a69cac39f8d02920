use serde::{Deserialize, Serialize};

use super::layer::LayerId;

/// Handle to a node of a `LayerTree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A borrowed view of one tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeNode<'a> {
    Root,
    Group(&'a str),
    Layer(&'a LayerId),
}

#[derive(Debug, Clone)]
enum NodeData {
    Root,
    Group { name: String },
    Layer { layer_id: LayerId },
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The project's legend: nested groups with layer nodes as leaves.
///
/// Nodes live in an arena and are addressed by `NodeId`. Every node except
/// the root has exactly one parent. Removed slots are left empty so that
/// outstanding ids never point at a different node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<NodeDef>", into = "Vec<NodeDef>")]
pub struct LayerTree {
    nodes: Vec<Option<Node>>,
}

impl Default for LayerTree {
    fn default() -> Self {
        LayerTree::new()
    }
}

impl LayerTree {
    pub fn new() -> Self {
        LayerTree {
            nodes: vec![Some(Node {
                data: NodeData::Root,
                parent: None,
                children: Vec::new(),
            })],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn get(&self, id: NodeId) -> Option<TreeNode<'_>> {
        self.node(id).map(|node| match &node.data {
            NodeData::Root => TreeNode::Root,
            NodeData::Group { name } => TreeNode::Group(name),
            NodeData::Layer { layer_id } => TreeNode::Layer(layer_id),
        })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Name of the group node `id`, or `None` for any other node.
    pub fn group_name(&self, id: NodeId) -> Option<&str> {
        match self.get(id)? {
            TreeNode::Group(name) => Some(name),
            _ => None,
        }
    }

    pub fn add_group(&mut self, parent: NodeId, name: &str) -> NodeId {
        let index = self.children(parent).len();
        self.insert(
            parent,
            index,
            NodeData::Group {
                name: name.to_owned(),
            },
        )
    }

    pub fn add_layer(&mut self, parent: NodeId, layer_id: LayerId) -> NodeId {
        let index = self.children(parent).len();
        self.insert(parent, index, NodeData::Layer { layer_id })
    }

    /// Inserts a layer node at `index` among the children of `parent`. An
    /// index past the end appends.
    pub fn insert_layer(&mut self, parent: NodeId, index: usize, layer_id: LayerId) -> NodeId {
        self.insert(parent, index, NodeData::Layer { layer_id })
    }

    fn insert(&mut self, parent: NodeId, index: usize, data: NodeData) -> NodeId {
        let parent = if self.node(parent).is_some() {
            parent
        } else {
            self.root()
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node {
            data,
            parent: Some(parent),
            children: Vec::new(),
        }));

        if let Some(Some(node)) = self.nodes.get_mut(parent.0) {
            let index = index.min(node.children.len());
            node.children.insert(index, id);
        }

        id
    }

    /// Removes every node showing `layer_id`. Returns how many were removed.
    pub fn remove_layer(&mut self, layer_id: &LayerId) -> usize {
        let doomed: Vec<NodeId> = self
            .descendants(self.root())
            .filter(|&id| self.get(id) == Some(TreeNode::Layer(layer_id)))
            .collect();

        for &id in &doomed {
            if let Some(parent) = self.parent(id) {
                if let Some(Some(node)) = self.nodes.get_mut(parent.0) {
                    node.children.retain(|&child| child != id);
                }
            }
            self.nodes[id.0] = None;
        }

        doomed.len()
    }

    /// First node showing `layer_id`, in depth-first order.
    pub fn find_layer(&self, layer_id: &LayerId) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&id| self.get(id) == Some(TreeNode::Layer(layer_id)))
    }

    /// First group called `name`, in depth-first order.
    pub fn find_group(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .find(|&id| self.group_name(id) == Some(name))
    }

    /// Layer ids below `id` in depth-first order. Returns `None` if the node
    /// does not exist.
    pub fn layers_under(&self, id: NodeId) -> Option<Vec<LayerId>> {
        self.node(id)?;

        let layers = self
            .descendants(id)
            .filter_map(|node| match self.get(node) {
                Some(TreeNode::Layer(layer_id)) => Some(layer_id.clone()),
                _ => None,
            })
            .collect();

        Some(layers)
    }

    /// Iterates over all nodes below `id` (excluding `id`) in depth-first,
    /// top-to-bottom order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }
}

pub struct Descendants<'a> {
    tree: &'a LayerTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// On-disk form of a tree node. The root is implicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeDef {
    Group {
        name: String,
        #[serde(default)]
        children: Vec<NodeDef>,
    },
    Layer {
        #[serde(rename = "layerId")]
        layer_id: LayerId,
    },
}

impl From<Vec<NodeDef>> for LayerTree {
    fn from(defs: Vec<NodeDef>) -> Self {
        fn build(tree: &mut LayerTree, parent: NodeId, defs: Vec<NodeDef>) {
            for def in defs {
                match def {
                    NodeDef::Group { name, children } => {
                        let group = tree.add_group(parent, &name);
                        build(tree, group, children);
                    }
                    NodeDef::Layer { layer_id } => {
                        tree.add_layer(parent, layer_id);
                    }
                }
            }
        }

        let mut tree = LayerTree::new();
        let root = tree.root();
        build(&mut tree, root, defs);
        tree
    }
}

impl From<LayerTree> for Vec<NodeDef> {
    fn from(tree: LayerTree) -> Self {
        fn collect(tree: &LayerTree, id: NodeId) -> Vec<NodeDef> {
            tree.children(id)
                .iter()
                .filter_map(|&child| match tree.get(child)? {
                    TreeNode::Group(name) => Some(NodeDef::Group {
                        name: name.to_owned(),
                        children: collect(tree, child),
                    }),
                    TreeNode::Layer(layer_id) => Some(NodeDef::Layer {
                        layer_id: layer_id.clone(),
                    }),
                    TreeNode::Root => None,
                })
                .collect()
        }

        collect(&tree, tree.root())
    }
}
