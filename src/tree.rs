//! Arena representation of parsed phylogenetic trees.
//!
//! # Overview
//! Nodes live in a flat `Vec<Node>` and refer to each other by [`NodeId`].
//! Children are owned index lists, the parent is a plain index. Node 0 is
//! always the root.
//!
//! Traversals never recurse: [`PostorderWalk`] is an explicit two-state
//! machine (descending from a parent, ascending from a child), so trees with
//! thousands of taxa in a caterpillar shape cannot overflow the call stack.
//!
//! ```text
//!        root            Postorder steps:
//!       /    \             Leaf(A), Leaf(B), Internal(n1),
//!      n1     C            Leaf(C), Internal(root)
//!     /  \
//!    A    B
//! ```

/// Index of a node inside its [`Tree`] arena.
pub type NodeId = usize;

/// A node of a parsed tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Leaf label or internal label, already sanitized by the parser.
    pub name: Option<String>,
    /// Length of the branch leading to this node from its parent.
    pub length: f64,
    /// Parent index, `None` only for the root.
    pub parent: Option<NodeId>,
    /// Children in the order they appeared in the newick string.
    pub children: Vec<NodeId>,
}

impl Node {
    fn new(parent: Option<NodeId>, length: f64) -> Self {
        Self {
            name: None,
            length,
            parent,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A rooted tree stored as an arena of [`Node`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Creates a tree consisting of a lone root.
    pub(crate) fn with_root(length: f64) -> Self {
        Self {
            nodes: vec![Node::new(None, length)],
        }
    }

    /// Appends a new child under `parent` and returns its id.
    pub(crate) fn add_child(&mut self, parent: NodeId, length: f64) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node::new(Some(parent), length));
        self.nodes[parent].children.push(id);
        id
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    /// Number of nodes, internal ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Leaf names in postorder visitation order; unnamed leaves are skipped.
    pub fn leaf_names(&self) -> Vec<&str> {
        self.postorder()
            .filter_map(|step| match step {
                Step::Leaf(id) => self.nodes[id].name.as_deref(),
                Step::Internal(_) => None,
            })
            .collect()
    }

    pub fn postorder(&self) -> PostorderWalk<'_> {
        PostorderWalk::new(self, self.root())
    }

    /// Postorder over the tree seen as unrooted, hanging from `start`.
    ///
    /// Parent links are followed like child links, so the walk reaches every
    /// node from `start` and reports `start` last. The stored root becomes an
    /// ordinary node of the walk.
    pub fn postorder_from(&self, start: NodeId) -> PostorderWalk<'_> {
        PostorderWalk::new(self, start)
    }
}

/// A node whose subtree has been fully visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Leaf(NodeId),
    Internal(NodeId),
}

impl Step {
    pub fn id(&self) -> NodeId {
        match *self {
            Step::Leaf(id) | Step::Internal(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Arriving at the node from the node the walk came from.
    Descending,
    /// Returning to the node from one of its walk children.
    Ascending,
}

/// Iterative postorder traversal driven by parent/child links.
///
/// The neighbours of a node are its children followed by its parent; the
/// walk descends into every neighbour except the one it arrived from. From
/// the root this is the ordinary rooted postorder.
///
/// Each node keeps a transient explored-neighbour position and the node the
/// walk came from, both living only as long as the walk.
pub struct PostorderWalk<'a> {
    tree: &'a Tree,
    current: Option<NodeId>,
    direction: Direction,
    explored: Vec<usize>,
    came_from: Vec<Option<NodeId>>,
}

impl<'a> PostorderWalk<'a> {
    fn new(tree: &'a Tree, start: NodeId) -> Self {
        Self {
            tree,
            current: (start < tree.len()).then_some(start),
            direction: Direction::Descending,
            explored: vec![0; tree.len()],
            came_from: vec![None; tree.len()],
        }
    }

    /// The node `id` hangs from in this walk, `None` for the start node.
    ///
    /// Valid once the walk has reached `id`.
    pub fn towards(&self, id: NodeId) -> Option<NodeId> {
        self.came_from[id]
    }

    /// First neighbour of `id` at position `from` or later that is not the
    /// node the walk arrived from.
    fn next_neighbour(&self, id: NodeId, from: usize) -> Option<(usize, NodeId)> {
        let node = self.tree.get(id);
        (from..=node.children.len()).find_map(|k| {
            let neighbour = match node.children.get(k) {
                Some(&child) => child,
                None => node.parent?,
            };
            (Some(neighbour) != self.came_from[id]).then_some((k, neighbour))
        })
    }
}

impl Iterator for PostorderWalk<'_> {
    type Item = Step;

    fn next(&mut self) -> Option<Step> {
        loop {
            let id = self.current?;
            let from = match self.direction {
                Direction::Descending => 0,
                Direction::Ascending => self.explored[id] + 1,
            };
            match self.next_neighbour(id, from) {
                Some((k, neighbour)) => {
                    self.explored[id] = k;
                    self.came_from[neighbour] = Some(id);
                    self.current = Some(neighbour);
                    self.direction = Direction::Descending;
                }
                None => {
                    self.current = self.came_from[id];
                    self.direction = Direction::Ascending;
                    return Some(if self.tree.get(id).is_leaf() {
                        Step::Leaf(id)
                    } else {
                        Step::Internal(id)
                    });
                }
            }
        }
    }
}

/// Leaf-index interval covered by a subtree, plus its number of leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub min: usize,
    pub max: usize,
    pub descendants: usize,
}

impl Span {
    pub const EMPTY: Span = Span {
        min: usize::MAX,
        max: 0,
        descendants: 0,
    };

    pub fn leaf(index: usize) -> Self {
        Span {
            min: index,
            max: index,
            descendants: 1,
        }
    }

    fn absorb(&mut self, child: Span) {
        self.min = self.min.min(child.min);
        self.max = self.max.max(child.max);
        self.descendants += child.descendants;
    }

    /// True when the covered leaves form a gap-free run of indices.
    pub fn is_contiguous(&self) -> bool {
        self.descendants > 0 && self.max + 1 - self.min == self.descendants
    }
}

/// Running spans of every internal node during one walk.
///
/// Completed nodes are folded into the node they hang from as soon as they
/// are reported, so a node's span is final when the walk reports it.
pub(crate) struct SpanTracker {
    spans: Vec<Span>,
}

impl SpanTracker {
    pub(crate) fn new(tree: &Tree) -> Self {
        Self {
            spans: vec![Span::EMPTY; tree.len()],
        }
    }

    pub(crate) fn leaf(&mut self, up: Option<NodeId>, index: usize) -> Span {
        let span = Span::leaf(index);
        self.propagate(up, span);
        span
    }

    pub(crate) fn complete(&mut self, up: Option<NodeId>, id: NodeId) -> Span {
        let span = self.spans[id];
        self.propagate(up, span);
        span
    }

    fn propagate(&mut self, up: Option<NodeId>, span: Span) {
        if let Some(up) = up {
            self.spans[up].absorb(span);
        }
    }
}
