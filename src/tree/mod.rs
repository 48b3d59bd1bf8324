pub mod op;

use crate::trail::TrailMap;
use op::OpType;
use rand::Rng;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;
use thiserror::Error;

/// A regrown subtree may always reach at least this many levels below the
/// node it replaces, even when that node already sits past the depth limit.
pub const MINIMUM_TREE_INCREASE: usize = 3;

#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("Node selection exhausted the tree with {remaining} matching node(s) left to skip")]
    TraversalExhausted { remaining: usize },
    #[error("Invalid child index {index} for a node with {arity} children")]
    InvalidChildIndex { index: usize, arity: usize },
    #[error("No node with id {0} in the tree")]
    NodeNotFound(usize),
    #[error("{op:?} expects {expected} children but {found} were given")]
    ArityMismatch {
        op: OpType,
        expected: usize,
        found: usize,
    },
    #[error("Sequence with {0} children (expected 2 or 3)")]
    InvalidSequence(usize),
    #[error("Unexpected character '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("Unexpected end of tree text")]
    UnexpectedEnd,
}

/// Node of a program tree.
///
/// A node exclusively owns its children. The parent link is the pre-order
/// `id` of the parent node, a plain index that never participates in
/// ownership. `id`, `parent` and `depth` are stamps: they are consistent
/// with the tree shape only after [`Node::correct_structure`] has run on the
/// whole tree, which every structural edit through
/// [`crate::evolution::individual::Individual`] does.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    op: OpType,
    children: Vec<Node>,
    parent: Option<usize>,
    id: usize,
    depth: usize,
}

impl Node {
    /// Builds a node from an operator and its children, then stamps the
    /// resulting tree as a standalone root.
    pub fn new(op: OpType, children: Vec<Node>) -> Result<Self, TreeError> {
        if children.len() != op.arity() {
            return Err(TreeError::ArityMismatch {
                op,
                expected: op.arity(),
                found: children.len(),
            });
        }
        let mut node = Self {
            op,
            children,
            parent: None,
            id: 0,
            depth: 0,
        };
        node.correct_structure(None, 0);
        Ok(node)
    }

    /// Grows a random tree.
    ///
    /// Below `max_depth` the operator is drawn uniformly from every operator,
    /// or from the nonterminals only when `force_full` is set. At or past
    /// `max_depth` only terminals are eligible, so growth always stops.
    ///
    /// # Arguments
    /// * `current_depth` - Depth of the node being created
    /// * `max_depth` - Depth at which only terminals may be drawn
    /// * `parent` - Id of the node that will own this one, `None` for a root
    /// * `force_full` - Produce a full tree whose leaves all sit at `max_depth`
    /// * `rng` - Random source
    ///
    /// # Returns
    /// * `Node` - The new subtree. Ids are pre-order only when grown from the root.
    pub fn generate<R: Rng>(
        current_depth: usize,
        max_depth: usize,
        parent: Option<usize>,
        force_full: bool,
        rng: &mut R,
    ) -> Self {
        let mut next_id = parent.map_or(0, |p| p + 1);
        Self::grow(current_depth, max_depth, parent, force_full, &mut next_id, rng)
    }

    fn grow<R: Rng>(
        current_depth: usize,
        max_depth: usize,
        parent: Option<usize>,
        force_full: bool,
        next_id: &mut usize,
        rng: &mut R,
    ) -> Self {
        let eligible: &[OpType] = if current_depth >= max_depth {
            &OpType::TERMINALS
        } else if force_full {
            &OpType::NONTERMINALS
        } else {
            &OpType::ALL
        };
        let op = eligible[rng.random_range(0..eligible.len())];
        let id = *next_id;
        *next_id += 1;

        let children = (0..op.arity())
            .map(|_| Self::grow(current_depth + 1, max_depth, Some(id), force_full, next_id, rng))
            .collect();

        Self {
            op,
            children,
            parent,
            id,
            depth: current_depth,
        }
    }

    /// Point mutation with subtree regrowth.
    ///
    /// Each node is selected independently with probability `rate`. A
    /// selected terminal becomes a random terminal. A selected nonterminal
    /// becomes a random nonterminal whose children are regrown as sparse
    /// subtrees with a depth limit of `max(max_depth, depth + MINIMUM_TREE_INCREASE)`.
    /// Unselected nodes pass the mutation on to their children.
    ///
    /// Stamps below a regrown node are stale afterwards.
    pub fn mutate<R: Rng>(&mut self, rate: f64, max_depth: usize, rng: &mut R) {
        if rng.random::<f64>() < rate {
            if self.op.is_terminal() {
                self.op = OpType::TERMINALS[rng.random_range(0..OpType::TERMINALS.len())];
            } else {
                self.op = OpType::NONTERMINALS[rng.random_range(0..OpType::NONTERMINALS.len())];
                let limit = max_depth.max(self.depth + MINIMUM_TREE_INCREASE);
                let (depth, id) = (self.depth, self.id);
                self.children = (0..self.op.arity())
                    .map(|_| Self::generate(depth + 1, limit, Some(id), false, rng))
                    .collect();
            }
        } else {
            for child in &mut self.children {
                child.mutate(rate, max_depth, rng);
            }
        }
    }

    /// Finds the `skip`-th node of the requested kind.
    ///
    /// The walk is a stack-based pre-order: the root first, then each node's
    /// children pushed left to right so the rightmost child is visited next.
    /// Only nodes whose kind matches `want_nonterminal` are counted.
    ///
    /// # Returns
    /// * `Ok((node, index))` - The node and its position among its parent's children (0 for the root)
    /// * `Err(TreeError::TraversalExhausted)` - Fewer than `skip + 1` matching nodes exist
    pub fn select_node(&self, skip: usize, want_nonterminal: bool) -> Result<(&Node, usize), TreeError> {
        let mut remaining = skip;
        let mut stack: Vec<(&Node, usize)> = vec![(self, 0)];

        while let Some((node, index)) = stack.pop() {
            if node.is_nonterminal() == want_nonterminal {
                if remaining == 0 {
                    return Ok((node, index));
                }
                remaining -= 1;
            }
            stack.extend(node.children.iter().enumerate().map(|(i, c)| (c, i)));
        }

        Err(TreeError::TraversalExhausted {
            remaining: remaining + 1,
        })
    }

    /// Returns `(terminal_count, nonterminal_count)` for the subtree.
    pub fn count_nodes(&self) -> (usize, usize) {
        if self.op.is_terminal() {
            return (1, 0);
        }
        self.children
            .iter()
            .map(Node::count_nodes)
            .fold((0, 1), |(t, n), (ct, cn)| (t + ct, n + cn))
    }

    /// Re-stamps ids, parent links and depths over the whole subtree.
    ///
    /// Ids are assigned in left-to-right pre-order starting right after
    /// `parent` (0 for a root).
    pub fn correct_structure(&mut self, parent: Option<usize>, depth: usize) {
        let mut next_id = parent.map_or(0, |p| p + 1);
        self.restamp(parent, depth, &mut next_id);
    }

    fn restamp(&mut self, parent: Option<usize>, depth: usize, next_id: &mut usize) {
        self.parent = parent;
        self.depth = depth;
        self.id = *next_id;
        *next_id += 1;
        let id = self.id;
        for child in &mut self.children {
            child.restamp(Some(id), depth + 1, next_id);
        }
    }

    /// Runs one pass of the program against `map`.
    ///
    /// Branches not taken cost nothing, so a pass consumes between one and
    /// the number of leaves worth of actions while the budget lasts.
    pub fn evaluate(&self, map: &mut TrailMap) {
        match self.op {
            OpType::Prog2 | OpType::Prog3 => {
                for child in &self.children {
                    child.evaluate(map);
                }
            }
            OpType::IfFoodAhead => {
                let branch = if map.is_food_ahead() { 0 } else { 1 };
                self.children[branch].evaluate(map);
            }
            OpType::MoveForward => map.move_forward(),
            OpType::TurnLeft => map.turn_left(),
            OpType::TurnRight => map.turn_right(),
        }
    }

    /// Mutable lookup by pre-order id. Relies on the stamps being current.
    pub fn find_mut(&mut self, id: usize) -> Option<&mut Node> {
        if self.id == id {
            return Some(self);
        }
        let next = self.children.iter().rposition(|c| c.id <= id)?;
        self.children[next].find_mut(id)
    }

    /// Swaps `subtree` into child slot `index` and hands back the old child.
    pub fn replace_child(&mut self, index: usize, mut subtree: Node) -> Result<Node, TreeError> {
        let arity = self.children.len();
        let slot = self
            .children
            .get_mut(index)
            .ok_or(TreeError::InvalidChildIndex { index, arity })?;
        subtree.parent = Some(self.id);
        Ok(std::mem::replace(slot, subtree))
    }

    pub fn op(&self) -> OpType {
        self.op
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_terminal(&self) -> bool {
        self.op.is_terminal()
    }

    pub fn is_nonterminal(&self) -> bool {
        self.op.is_nonterminal()
    }

    /// Total number of nodes in the subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Node::size).sum::<usize>()
    }

    /// Number of edges on the longest root-to-leaf path of the subtree.
    pub fn height(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.height() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Text form of the subtree, optionally wrapped in `\texttt{}`.
    pub fn render(&self, latex: bool) -> String {
        if latex {
            format!("\\texttt{{{}}}", self)
        } else {
            self.to_string()
        }
    }

    /// GraphViz description of the subtree: one uniquely named vertex per
    /// node labeled by operator, one edge per parent-child relation.
    pub fn to_graphviz(&self, graph_name: &str) -> String {
        let mut out = format!("digraph {} {{\n", graph_name);
        let mut counter = 0;
        self.write_graphviz(&mut out, &mut counter);
        out.push_str("}\n");
        out
    }

    fn write_graphviz(&self, out: &mut String, counter: &mut usize) -> usize {
        let name = *counter;
        *counter += 1;
        let shape = if self.is_terminal() { "ellipse" } else { "box" };
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "    node{} [label=\"{}\", shape={}];",
            name,
            self.op.label(),
            shape
        );
        for child in &self.children {
            let child_name = child.write_graphviz(out, counter);
            let _ = writeln!(out, "    node{} -> node{};", name, child_name);
        }
        name
    }
}

impl fmt::Display for Node {
    /// `M`, `L`, `R` for the actions, `(a b)` / `(a b c)` for the sequences
    /// and `[then else]` for the food test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = self.op.symbol() {
            return write!(f, "{}", symbol);
        }
        let (open, close) = match self.op {
            OpType::IfFoodAhead => ('[', ']'),
            _ => ('(', ')'),
        };
        write!(f, "{}", open)?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", child)?;
        }
        write!(f, "{}", close)
    }
}

impl FromStr for Node {
    type Err = TreeError;

    /// Parses the text form produced by `Display` into a stamped tree.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TreeParser {
            chars: s.chars().collect(),
            pos: 0,
        };
        let mut root = parser.parse_node()?;
        parser.skip_whitespace();
        if let Some(&found) = parser.chars.get(parser.pos) {
            return Err(TreeError::UnexpectedChar {
                found,
                position: parser.pos,
            });
        }
        root.correct_structure(None, 0);
        Ok(root)
    }
}

struct TreeParser {
    chars: Vec<char>,
    pos: usize,
}

impl TreeParser {
    fn skip_whitespace(&mut self) {
        while self.chars.get(self.pos).is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_node(&mut self) -> Result<Node, TreeError> {
        self.skip_whitespace();
        let c = *self.chars.get(self.pos).ok_or(TreeError::UnexpectedEnd)?;
        let position = self.pos;
        self.pos += 1;

        if let Some(op) = OpType::from_symbol(c) {
            return Node::new(op, Vec::new());
        }
        match c {
            '(' => {
                let children = self.parse_children(')')?;
                let op = match children.len() {
                    2 => OpType::Prog2,
                    3 => OpType::Prog3,
                    n => return Err(TreeError::InvalidSequence(n)),
                };
                Node::new(op, children)
            }
            '[' => {
                let children = self.parse_children(']')?;
                Node::new(OpType::IfFoodAhead, children)
            }
            found => Err(TreeError::UnexpectedChar { found, position }),
        }
    }

    fn parse_children(&mut self, close: char) -> Result<Vec<Node>, TreeError> {
        let mut children = Vec::new();
        loop {
            self.skip_whitespace();
            match self.chars.get(self.pos) {
                None => return Err(TreeError::UnexpectedEnd),
                Some(&c) if c == close => {
                    self.pos += 1;
                    return Ok(children);
                }
                Some(_) => children.push(self.parse_node()?),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trail::{Direction, TrailMap};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tree(text: &str) -> Node {
        text.parse().unwrap()
    }

    /// Walks the tree and checks arity, depth and parent stamps.
    fn assert_consistent(node: &Node, parent: Option<usize>, depth: usize) {
        assert_eq!(node.children().len(), node.op().arity());
        assert_eq!(node.parent(), parent);
        assert_eq!(node.depth(), depth);
        for child in node.children() {
            assert_consistent(child, Some(node.id()), depth + 1);
        }
    }

    fn all_leaves_at(node: &Node, depth: usize) -> bool {
        if node.is_terminal() {
            node.depth() == depth
        } else {
            node.children().iter().all(|c| all_leaves_at(c, depth))
        }
    }

    #[test]
    fn test_generated_trees_respect_arity_and_depth() {
        let mut rng = StdRng::seed_from_u64(7);
        for max_depth in 0..7 {
            for full in [false, true] {
                let root = Node::generate(0, max_depth, None, full, &mut rng);
                assert_consistent(&root, None, 0);
                assert!(root.height() <= max_depth);
            }
        }
    }

    #[test]
    fn test_full_trees_have_uniform_depth() {
        let mut rng = StdRng::seed_from_u64(11);
        for max_depth in 1..6 {
            let root = Node::generate(0, max_depth, None, true, &mut rng);
            assert!(all_leaves_at(&root, max_depth));
        }
    }

    #[test]
    fn test_depth_zero_yields_single_terminal() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let root = Node::generate(0, 0, None, true, &mut rng);
            assert!(root.is_terminal());
            assert_eq!(root.count_nodes(), (1, 0));
        }
    }

    #[test]
    fn test_generated_ids_are_preorder() {
        let mut rng = StdRng::seed_from_u64(5);
        let root = Node::generate(0, 5, None, false, &mut rng);
        let mut restamped = root.clone();
        restamped.correct_structure(None, 0);
        assert_eq!(root, restamped);
    }

    #[test]
    fn test_count_nodes_matches_independent_traversal() {
        let mut rng = StdRng::seed_from_u64(13);
        for _ in 0..25 {
            let root = Node::generate(0, 5, None, false, &mut rng);
            let (terminals, nonterminals) = root.count_nodes();
            assert_eq!(terminals + nonterminals, root.size());

            let mut stack = vec![&root];
            let (mut t, mut n) = (0, 0);
            while let Some(node) = stack.pop() {
                if node.is_terminal() {
                    t += 1;
                } else {
                    n += 1;
                }
                stack.extend(node.children());
            }
            assert_eq!((t, n), (terminals, nonterminals));
        }
    }

    #[test]
    fn test_count_nodes_hand_built() {
        assert_eq!(tree("(M [L R] (M M M))").count_nodes(), (6, 3));
        assert_eq!(tree("R").count_nodes(), (1, 0));
    }

    #[test]
    fn test_select_node_order() {
        // Visit order: root, right subtree first, then left.
        let root = tree("(M [L R])");
        let order: Vec<String> = (0..3)
            .map(|i| root.select_node(i, false).unwrap().0.to_string())
            .collect();
        assert_eq!(order, vec!["R", "L", "M"]);

        let (node, index) = root.select_node(0, false).unwrap();
        assert_eq!((node.op(), index), (OpType::TurnRight, 1));
        let (node, index) = root.select_node(2, false).unwrap();
        assert_eq!((node.op(), index), (OpType::MoveForward, 0));

        let (node, index) = root.select_node(0, true).unwrap();
        assert_eq!((node.op(), index), (OpType::Prog2, 0));
        let (node, index) = root.select_node(1, true).unwrap();
        assert_eq!((node.op(), index), (OpType::IfFoodAhead, 1));
    }

    #[test]
    fn test_select_node_exhaustion_is_an_error() {
        let root = tree("(M L)");
        assert_eq!(
            root.select_node(2, false),
            Err(TreeError::TraversalExhausted { remaining: 1 })
        );
        assert!(matches!(
            root.select_node(1, true),
            Err(TreeError::TraversalExhausted { .. })
        ));
    }

    #[test]
    fn test_clone_then_correct_is_identical_and_independent() {
        let mut rng = StdRng::seed_from_u64(17);
        let source = Node::generate(0, 5, None, false, &mut rng);
        let source_text = source.to_string();
        let mut copy = source.clone();
        copy.correct_structure(None, 0);
        assert_eq!(copy.to_string(), source_text);
        if let (Some(a), Some(b)) = (copy.child(0), source.child(0)) {
            assert!(!std::ptr::eq(a, b));
        }

        copy.mutate(1.0, 5, &mut rng);
        copy.correct_structure(None, 0);
        // edits to the copy never reach the source
        assert_eq!(source.to_string(), source_text);
        assert_consistent(&source, None, 0);
    }

    #[test]
    fn test_mutation_preserves_kind_and_arity() {
        let mut rng = StdRng::seed_from_u64(19);
        for _ in 0..30 {
            let mut root = Node::generate(0, 4, None, false, &mut rng);
            let was_terminal = root.is_terminal();
            root.mutate(1.0, 4, &mut rng);
            root.correct_structure(None, 0);
            assert_eq!(root.is_terminal(), was_terminal);
            assert_consistent(&root, None, 0);
            assert!(root.height() <= 4);
        }
    }

    #[test]
    fn test_mutation_rate_zero_is_identity() {
        let mut rng = StdRng::seed_from_u64(23);
        let root = Node::generate(0, 5, None, false, &mut rng);
        let mut mutated = root.clone();
        mutated.mutate(0.0, 5, &mut rng);
        assert_eq!(mutated, root);
    }

    #[test]
    fn test_deep_regrowth_gets_minimum_room() {
        let mut rng = StdRng::seed_from_u64(29);
        // a nonterminal at depth 4 with a depth limit of 2
        let mut root = tree("(M (M (M (M (L R)))))");
        let deep_id = root.select_node(4, true).unwrap().0.id();
        let deep = root.find_mut(deep_id).unwrap();
        assert_eq!(deep.depth(), 4);
        deep.mutate(1.0, 2, &mut rng);
        root.correct_structure(None, 0);
        assert_consistent(&root, None, 0);
        assert!(root.height() <= 4 + MINIMUM_TREE_INCREASE);
    }

    #[test]
    fn test_evaluate_scenario_single_row() {
        let mut map = TrailMap::new(&["X_A_X"], 10).unwrap();
        let program = tree("(M M)");
        while map.has_actions_remaining() {
            program.evaluate(&mut map);
        }
        // ten moves over five columns visit column 4 and column 0 once each
        assert_eq!(map.actions_taken(), 10);
        assert_eq!(map.consumed_food_count(), 2);
        assert_eq!(map.total_food_count(), 2);
        assert_eq!(map.ant().column, 0);
        assert_eq!(map.to_string(), "*+++*");
    }

    #[test]
    fn test_evaluate_sequences_run_left_to_right() {
        // run right to left, (M L) would turn first and step onto row 1
        let mut map = TrailMap::new(&["_X_", "__X"], 2).unwrap();
        tree("(M L)").evaluate(&mut map);
        assert_eq!((map.ant().row, map.ant().column), (0, 1));
        assert_eq!(map.ant().direction, Direction::North);
        assert_eq!(map.consumed_food_count(), 1);

        let mut map = TrailMap::new(&["_X_", "__X"], 3).unwrap();
        tree("(M M L)").evaluate(&mut map);
        assert_eq!((map.ant().row, map.ant().column), (0, 2));
        assert_eq!(map.ant().direction, Direction::North);
        assert_eq!(map.consumed_food_count(), 1);
        assert_eq!(map.actions_taken(), 3);
        assert_eq!(map.to_string(), "_*+\n__X");
    }

    #[test]
    fn test_evaluate_nested_sequence_order() {
        let mut map = TrailMap::new(&["_X_", "__X"], 10).unwrap();
        tree("(L (M R M) M)").evaluate(&mut map);
        // north wraps to row 1, east to column 1, then on to column 2
        assert_eq!((map.ant().row, map.ant().column), (1, 2));
        assert_eq!(map.ant().direction, Direction::East);
        assert_eq!(map.consumed_food_count(), 1);
        assert_eq!(map.actions_taken(), 5);
    }

    #[test]
    fn test_evaluate_if_food_ahead_takes_one_branch() {
        let mut map = TrailMap::new(&["_X__"], 100).unwrap();
        let program = tree("[M R]");
        program.evaluate(&mut map);
        assert_eq!(map.ant().column, 1);
        assert_eq!(map.actions_taken(), 1);

        program.evaluate(&mut map);
        assert_eq!(map.ant().column, 1);
        assert_eq!(map.actions_taken(), 2);
    }

    #[test]
    fn test_find_mut_and_replace_child() {
        let mut root = tree("(M [L R] M)");
        let node = root.find_mut(3).unwrap();
        assert_eq!(node.op(), OpType::TurnLeft);

        let sequence = root.find_mut(2).unwrap();
        let old = sequence.replace_child(1, tree("(M M)")).unwrap();
        assert_eq!(old.to_string(), "R");
        assert_eq!(
            sequence.replace_child(2, tree("M")),
            Err(TreeError::InvalidChildIndex { index: 2, arity: 2 })
        );
        root.correct_structure(None, 0);
        assert_eq!(root.to_string(), "(M [L (M M)] M)");
        assert_consistent(&root, None, 0);
        assert!(root.find_mut(99).is_none());
    }

    #[test]
    fn test_text_round_trip() {
        let mut rng = StdRng::seed_from_u64(31);
        for _ in 0..20 {
            let root = Node::generate(0, 5, None, false, &mut rng);
            let parsed: Node = root.to_string().parse().unwrap();
            assert_eq!(parsed, root);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Node>(), Err(TreeError::UnexpectedEnd));
        assert_eq!("(M M".parse::<Node>(), Err(TreeError::UnexpectedEnd));
        assert_eq!("(M)".parse::<Node>(), Err(TreeError::InvalidSequence(1)));
        assert_eq!(
            "[M L R]".parse::<Node>(),
            Err(TreeError::ArityMismatch {
                op: OpType::IfFoodAhead,
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            "M M".parse::<Node>(),
            Err(TreeError::UnexpectedChar {
                found: 'M',
                position: 2
            })
        );
        assert_eq!(
            "(M Q)".parse::<Node>(),
            Err(TreeError::UnexpectedChar {
                found: 'Q',
                position: 3
            })
        );
    }

    #[test]
    fn test_render_latex() {
        assert_eq!(tree("[M R]").render(true), "\\texttt{[M R]}");
        assert_eq!(tree("[M R]").render(false), "[M R]");
    }

    #[test]
    fn test_graphviz_has_one_vertex_per_node_and_one_edge_per_link() {
        let root = tree("(M [L R] M)");
        let dot = root.to_graphviz("best");
        assert!(dot.starts_with("digraph best {\n"));
        assert!(dot.ends_with("}\n"));
        assert_eq!(dot.matches("[label=").count(), root.size());
        assert_eq!(dot.matches("->").count(), root.size() - 1);
        assert!(dot.contains("node0 [label=\"prog3\", shape=box];"));
        assert!(dot.contains("node2 [label=\"if_food_ahead\", shape=box];"));
        assert!(dot.contains("node0 -> node2;"));
    }

    #[test]
    fn test_new_rejects_wrong_arity() {
        let leaf = Node::new(OpType::MoveForward, Vec::new()).unwrap();
        assert!(leaf.is_terminal());
        assert!(matches!(
            Node::new(OpType::Prog3, vec![leaf]),
            Err(TreeError::ArityMismatch { expected: 3, found: 1, .. })
        ));
        assert_eq!(
            Node::new(OpType::IfFoodAhead, Vec::new()),
            Err(TreeError::ArityMismatch {
                op: OpType::IfFoodAhead,
                expected: 2,
                found: 0
            })
        );
        assert!(matches!(
            Node::new(OpType::TurnLeft, vec![tree("M"), tree("R")]),
            Err(TreeError::ArityMismatch { expected: 0, found: 2, .. })
        ));
    }
}
