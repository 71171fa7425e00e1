//! Rule Index
//!
//! A byte-keyed prefix tree over the literal patterns of all network rules.
//! Walking the tree from the root while reading a URL from some offset finds
//! every rule whose pattern occurs at that offset, so a single left-to-right
//! scan of the URL replaces one substring search per rule.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`]. Dropping the
//! index drops every node at once.

use smallvec::SmallVec;

use crate::types::RuleId;

/// Pattern byte matching any run of characters.
pub const WILDCARD: u8 = b'*';
/// Pattern byte matching one separator character or the end of the URL.
pub const SEPARATOR: u8 = b'^';

/// Index of a node inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single trie node.
#[derive(Debug, Clone, Default)]
pub struct Node {
    /// The pattern byte this node represents (0 for the root)
    pub character: u8,
    /// Children keyed by the next pattern byte
    children: SmallVec<[(u8, NodeId); 4]>,
    /// Rules whose pattern ends at this node
    rules: SmallVec<[RuleId; 1]>,
}

impl Node {
    fn new(character: u8) -> Self {
        Self {
            character,
            ..Self::default()
        }
    }

    /// Rules terminating at this node.
    #[inline]
    pub fn rules(&self) -> &[RuleId] {
        &self.rules
    }

    /// Child entries as `(byte, node)` pairs.
    #[inline]
    pub fn children(&self) -> &[(u8, NodeId)] {
        &self.children
    }

    #[inline]
    fn child(&self, character: u8) -> Option<NodeId> {
        self.children
            .iter()
            .find(|(c, _)| *c == character)
            .map(|(_, id)| *id)
    }
}

/// Arena-backed trie over rule patterns.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    nodes: Vec<Node>,
    rule_count: usize,
}

impl Default for RuleIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleIndex {
    /// The root node id.
    pub const ROOT: NodeId = NodeId(0);

    /// Create an index holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(0)],
            rule_count: 0,
        }
    }

    /// Insert `pattern` byte by byte and attach `rule` to its terminal node.
    ///
    /// Rules sharing a literal pattern share the terminal node; earlier rules
    /// are kept.
    pub fn add_rule(&mut self, rule: RuleId, pattern: &str) {
        let mut node = Self::ROOT;
        for &byte in pattern.as_bytes() {
            node = match self.nodes[node.index()].child(byte) {
                Some(child) => child,
                None => {
                    let child = NodeId(self.nodes.len() as u32);
                    self.nodes.push(Node::new(byte));
                    self.nodes[node.index()].children.push((byte, child));
                    child
                }
            };
        }
        self.nodes[node.index()].rules.push(rule);
        self.rule_count += 1;
    }

    /// Get a node by id.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Follow the edge labelled `character` from `node`.
    #[inline]
    pub fn child(&self, node: NodeId, character: u8) -> Option<NodeId> {
        self.node(node).child(character)
    }

    /// Find the node reached by walking `pattern` literally from the root.
    pub fn find(&self, pattern: &str) -> Option<NodeId> {
        pattern
            .as_bytes()
            .iter()
            .try_fold(Self::ROOT, |node, &byte| self.child(node, byte))
    }

    /// Total number of nodes, including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of rules attached to the index.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}
