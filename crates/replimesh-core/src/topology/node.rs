//! Structure-node arena.
//!
//! Each topology strategy owns one [`NodeArena`]: an id-indexed arena of
//! structural nodes decoupled from the mirrors themselves. Parent and
//! child references are [`NodeId`] handles, never owning references, so
//! the graph can be cyclic in intent (rings) without being cyclic in
//! ownership.
//!
//! The root is not known at strategy construction; it is written once by
//! the first build and cleared again by [`NodeArena::clear`] on restart.

use std::collections::BTreeMap;

use replimesh_types::{MirrorId, NodeId, StructureType};

use crate::error::{Result, TopologyError};

/// One structural node.
#[derive(Debug, Clone)]
pub struct StructureNode {
    id: NodeId,
    structure: StructureType,
    head: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    mirror: Option<MirrorId>,
}

impl StructureNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn structure(&self) -> StructureType {
        self.structure
    }

    pub fn is_head(&self) -> bool {
        self.head
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered children. For ring structures the single "child" is the
    /// successor in the cycle.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn mirror(&self) -> Option<MirrorId> {
        self.mirror
    }
}

/// Arena of structure nodes owned by one strategy.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: BTreeMap<NodeId, StructureNode>,
    root: Option<NodeId>,
    next: u64,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&StructureNode> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &StructureNode> {
        self.nodes.values()
    }

    /// Allocates a node bound to `mirror`.
    pub fn alloc(&mut self, structure: StructureType, mirror: MirrorId) -> NodeId {
        let id = NodeId::new(self.next);
        self.next += 1;
        self.nodes.insert(
            id,
            StructureNode {
                id,
                structure,
                head: false,
                parent: None,
                children: Vec::new(),
                mirror: Some(mirror),
            },
        );
        id
    }

    /// One-shot root assignment; also marks the node as head.
    pub fn set_root(&mut self, id: NodeId) -> Result<()> {
        if let Some(existing) = self.root {
            return Err(TopologyError::InvariantViolation {
                structure: self
                    .nodes
                    .get(&existing)
                    .map_or(StructureType::Generic, StructureNode::structure),
                detail: format!("structure root already assigned to node {existing}"),
            });
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.head = true;
            self.root = Some(id);
            Ok(())
        } else {
            Err(TopologyError::InvariantViolation {
                structure: StructureType::Generic,
                detail: format!("cannot root unknown node {id}"),
            })
        }
    }

    /// Appends `child` to `parent`'s ordered children.
    pub fn adopt(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    /// Removes a node, splicing its children up to its parent so the
    /// bookkeeping stays connected even after a crash removal.
    pub fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.remove(&id) else {
            return;
        };
        if let Some(parent) = node.parent {
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children.retain(|&c| c != id);
                p.children.extend(node.children.iter().copied());
            }
        }
        for child in node.children {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.parent = node.parent;
            }
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    pub fn find_by_mirror(&self, mirror: MirrorId) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.mirror() == Some(mirror))
            .map(StructureNode::id)
    }

    /// Drops every node and the root binding (topology restart).
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
    }

    /// Children count of a node; 0 for unknown ids.
    pub fn child_count(&self, id: NodeId) -> usize {
        self.nodes.get(&id).map_or(0, |n| n.children.len())
    }

    /// Breadth-first traversal order starting at the root.
    pub fn bfs_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let Some(root) = self.root else {
            return out;
        };
        let mut queue = std::collections::VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.children.iter().copied());
            }
        }
        out
    }
}
