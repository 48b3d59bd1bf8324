use crate::trail::TrailMap;
use crate::tree::{Node, TreeError};
use log::debug;
use rand::Rng;
use std::fmt;

/// Fitness carried by an individual whose tree changed since its last evaluation.
pub const UNEVALUATED: f64 = f64::NEG_INFINITY;

/// Food eaten on one map during one simulation episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub consumed: usize,
    pub total: usize,
}

/// A candidate program together with its cached size and fitness.
///
/// The node counts are refreshed by every method that edits the tree. The
/// fitness is reset to [`UNEVALUATED`] by those same methods and only
/// becomes meaningful again after [`Individual::evaluate`].
#[derive(Debug, Clone)]
pub struct Individual {
    root: Node,
    scores: Vec<Score>,
    fitness: f64,
    /// Depth limit the tree was generated with, reused when regrowing subtrees
    original_max_depth: usize,
    terminal_count: usize,
    nonterminal_count: usize,
}

impl Individual {
    /// Generates a random program tree.
    ///
    /// # Arguments
    /// * `max_depth` - Depth limit of the tree
    /// * `force_full` - Generate a full tree instead of a sparse one
    /// * `rng` - Random source
    pub fn generate<R: Rng>(max_depth: usize, force_full: bool, rng: &mut R) -> Self {
        let root = Node::generate(0, max_depth, None, force_full, rng);
        Self::from_tree(root, max_depth)
    }

    /// Wraps an existing tree, e.g. one parsed from text.
    pub fn from_tree(root: Node, max_depth: usize) -> Self {
        let mut individual = Self {
            root,
            scores: Vec::new(),
            fitness: UNEVALUATED,
            original_max_depth: max_depth,
            terminal_count: 0,
            nonterminal_count: 0,
        };
        individual.correct_tree();
        individual
    }

    /// Fully independent copy with freshly stamped structure and counts.
    /// Fitness and scores are carried over.
    pub fn deep_copy(&self) -> Self {
        let mut copy = self.clone();
        copy.correct_tree();
        copy
    }

    /// Re-stamps the tree and recounts its nodes.
    pub fn correct_tree(&mut self) {
        self.root.correct_structure(None, 0);
        self.calculate_tree_size();
    }

    fn calculate_tree_size(&mut self) {
        let (terminals, nonterminals) = self.root.count_nodes();
        self.terminal_count = terminals;
        self.nonterminal_count = nonterminals;
    }

    /// Per-node mutation using the tree's original depth limit for regrowth.
    pub fn mutate<R: Rng>(&mut self, rate: f64, rng: &mut R) {
        self.root.mutate(rate, self.original_max_depth, rng);
        self.correct_tree();
        self.invalidate();
    }

    /// Marks the cached fitness as stale.
    pub fn invalidate(&mut self) {
        self.fitness = UNEVALUATED;
        self.scores.clear();
    }

    /// Draws a uniformly random node of the requested kind.
    ///
    /// A tree without nonterminals is a single terminal root, which is
    /// returned whatever kind was asked for.
    ///
    /// # Returns
    /// * `Ok((node, index))` - The node and its index among its parent's children
    /// * `Err(TreeError)` - The cached counts disagree with the tree
    pub fn pick_random_node<R: Rng>(
        &self,
        want_nonterminal: bool,
        rng: &mut R,
    ) -> Result<(&Node, usize), TreeError> {
        if self.nonterminal_count == 0 {
            return Ok((&self.root, 0));
        }
        let candidates = if want_nonterminal {
            self.nonterminal_count
        } else {
            self.terminal_count
        };
        let skip = rng.random_range(0..candidates);
        self.root.select_node(skip, want_nonterminal)
    }

    /// Puts `subtree` where the node with id `parent`'s child `child_index`
    /// was, or makes it the whole tree when `parent` is `None`.
    ///
    /// The displaced subtree is dropped.
    pub fn graft(
        &mut self,
        parent: Option<usize>,
        child_index: usize,
        subtree: Node,
    ) -> Result<(), TreeError> {
        match parent {
            None => self.root = subtree,
            Some(id) => {
                let parent = self.root.find_mut(id).ok_or(TreeError::NodeNotFound(id))?;
                parent.replace_child(child_index, subtree)?;
            }
        }
        self.correct_tree();
        self.invalidate();
        Ok(())
    }

    /// Runs the program on one map until the action budget is spent.
    pub fn run_simulation(&self, map: &mut TrailMap) -> Score {
        map.reset();
        // every pass reaches at least one action, so the budget drains
        while map.has_actions_remaining() {
            self.root.evaluate(map);
        }
        Score {
            consumed: map.consumed_food_count(),
            total: map.total_food_count(),
        }
    }

    /// Runs the program once on every map.
    pub fn run_simulations(&self, maps: &mut [TrailMap]) -> Vec<Score> {
        maps.iter_mut().map(|map| self.run_simulation(map)).collect()
    }

    /// Mean fraction of food eaten across maps.
    ///
    /// Maps where either count is zero are left out of the mean; when every
    /// map is left out the fitness is `0.0`.
    pub fn compute_fitness(scores: &[Score]) -> f64 {
        let ratios: Vec<f64> = scores
            .iter()
            .filter(|s| s.consumed > 0 && s.total > 0)
            .map(|s| s.consumed as f64 / s.total as f64)
            .collect();
        if ratios.is_empty() {
            return 0.0;
        }
        ratios.iter().sum::<f64>() / ratios.len() as f64
    }

    /// Simulates every map, caches the scores and fitness, and returns the fitness.
    pub fn evaluate(&mut self, maps: &mut [TrailMap]) -> f64 {
        self.scores = self.run_simulations(maps);
        self.fitness = Self::compute_fitness(&self.scores);
        debug!(
            "Evaluated tree of size {}: fitness={:.4} scores={:?}",
            self.tree_size(),
            self.fitness,
            self.scores
        );
        self.fitness
    }

    /// Re-runs each map and returns its rendering with the visited path.
    pub fn render_solution(&self, maps: &mut [TrailMap], latex: bool) -> Vec<String> {
        maps.iter_mut()
            .map(|map| {
                self.run_simulation(map);
                map.render(latex)
            })
            .collect()
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness != UNEVALUATED
    }

    pub fn fitness(&self) -> f64 {
        self.fitness
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn tree_size(&self) -> usize {
        self.terminal_count + self.nonterminal_count
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal_count
    }

    pub fn nonterminal_count(&self) -> usize {
        self.nonterminal_count
    }

    pub fn original_max_depth(&self) -> usize {
        self.original_max_depth
    }

    pub fn render(&self, latex: bool) -> String {
        self.root.render(latex)
    }

    pub fn to_graphviz(&self, graph_name: &str) -> String {
        self.root.to_graphviz(graph_name)
    }
}

impl fmt::Display for Individual {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
