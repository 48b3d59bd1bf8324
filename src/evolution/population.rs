use crate::config::GaConfig;
use crate::evolution::individual::Individual;
use crate::evolution::GenerationStats;
use crate::trail::TrailMap;
use crate::tree::TreeError;
use log::{debug, warn};
use rand::Rng;
use rayon::prelude::*;
use std::cmp::Ordering;

/// Attempts at drawing a second parent different from the first before
/// falling back to a uniform draw.
const MAX_PARENT_DRAWS: usize = 32;

/// Summary of the current generation, refreshed after every evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Statistics {
    best_index: usize,
    best_fitness: f64,
    worst_fitness: f64,
    average_fitness: f64,
    largest_tree: usize,
    smallest_tree: usize,
    average_tree: f64,
    total_nodes: usize,
}

/// A fixed-size generation of individuals and the maps they are scored on.
#[derive(Debug, Clone)]
pub struct Population {
    individuals: Vec<Individual>,
    maps: Vec<TrailMap>,
    config: GaConfig,
    stats: Statistics,
}

impl Population {
    /// Creates and evaluates the initial generation.
    ///
    /// Uses ramped half-and-half: depth limits cycle through
    /// `tree_depth_min..=tree_depth_max` while odd slots get full trees and
    /// even slots sparse ones. An inverted depth range is swapped.
    ///
    /// # Arguments
    /// * `config` - Evolution parameters; `population_size` individuals are created
    /// * `maps` - Maps used to score every individual
    /// * `rng` - Random source
    pub fn new<R: Rng>(config: &GaConfig, maps: Vec<TrailMap>, rng: &mut R) -> Self {
        let mut config = config.clone();
        if config.tree_depth_min > config.tree_depth_max {
            warn!(
                "tree_depth_min ({}) exceeds tree_depth_max ({}); swapping them",
                config.tree_depth_min, config.tree_depth_max
            );
            std::mem::swap(&mut config.tree_depth_min, &mut config.tree_depth_max);
        }
        let individuals = Self::ramped_half_and_half(
            config.population_size,
            config.tree_depth_min,
            config.tree_depth_max,
            rng,
        );
        let mut population = Self {
            individuals,
            maps,
            config,
            stats: Statistics::default(),
        };
        population.evaluate();
        population
    }

    fn ramped_half_and_half<R: Rng>(
        size: usize,
        depth_min: usize,
        depth_max: usize,
        rng: &mut R,
    ) -> Vec<Individual> {
        let gradations = depth_max - depth_min + 1;
        (0..size)
            .map(|i| Individual::generate(depth_min + i % gradations, i % 2 == 1, rng))
            .collect()
    }

    /// Copy of this population scored on a different set of maps.
    pub fn with_maps(&self, maps: Vec<TrailMap>) -> Self {
        let mut population = Self {
            individuals: self.individuals.iter().map(Individual::deep_copy).collect(),
            maps,
            config: self.config.clone(),
            stats: Statistics::default(),
        };
        population
            .individuals
            .iter_mut()
            .for_each(Individual::invalidate);
        population.evaluate();
        population
    }

    /// Replaces the population with the next generation.
    ///
    /// The `elitism_count` best individuals are carried over unchanged, best
    /// first. Every other slot is filled by crossing two distinct tournament
    /// winners and mutating the child.
    ///
    /// # Returns
    /// * `Err(TreeError)` - Tree bookkeeping was found corrupted during crossover
    pub fn evolve<R: Rng>(&mut self, rng: &mut R) -> Result<(), TreeError> {
        let size = self.individuals.len();
        let mut next_generation: Vec<Individual> = self
            .elite_indices()
            .into_iter()
            .map(|i| self.individuals[i].deep_copy())
            .collect();

        while next_generation.len() < size {
            let (p1, p2) = self.select_parents(rng);
            let mut child = self.individuals[p1].deep_copy();
            self.crossover(&mut child, &self.individuals[p2], rng)?;
            child.mutate(self.config.mutation_rate, rng);
            next_generation.push(child);
        }

        self.individuals = next_generation;
        self.evaluate();
        Ok(())
    }

    /// Indices of the best `elitism_count` individuals, best first.
    fn elite_indices(&self) -> Vec<usize> {
        let count = self.config.elitism_count.clamp(1, self.individuals.len());
        let mut order: Vec<usize> = (0..self.individuals.len()).collect();
        // stable sort keeps the lowest index first among equals
        order.sort_by(|&a, &b| {
            self.individuals[b]
                .fitness()
                .partial_cmp(&self.individuals[a].fitness())
                .unwrap_or(Ordering::Equal)
        });
        order.truncate(count);
        order
    }

    /// Runs two tournaments, retrying the second until it yields a different winner.
    fn select_parents<R: Rng>(&self, rng: &mut R) -> (usize, usize) {
        let p1 = self.select_individual(rng);
        for _ in 0..MAX_PARENT_DRAWS {
            let p2 = self.select_individual(rng);
            if p2 != p1 {
                return (p1, p2);
            }
        }
        debug!(
            "Tournament kept returning individual {}; drawing the second parent uniformly",
            p1
        );
        (p1, self.random_other(p1, rng))
    }

    /// Tournament selection.
    ///
    /// A random starting winner faces `tournament_size` challengers. With
    /// probability `proportional_tournament_rate` the tournament is decided by
    /// higher fitness, otherwise by smaller tree size.
    pub fn select_individual<R: Rng>(&self, rng: &mut R) -> usize {
        let fitness_based = rng.random::<f64>() < self.config.proportional_tournament_rate;
        let mut winner = rng.random_range(0..self.individuals.len());

        for _ in 0..self.config.tournament_size {
            let challenger = self.random_other(winner, rng);
            let (c, w) = (&self.individuals[challenger], &self.individuals[winner]);
            let better = if fitness_based {
                c.fitness() > w.fitness()
            } else {
                c.tree_size() < w.tree_size()
            };
            if better {
                winner = challenger;
            }
        }
        winner
    }

    /// Uniform index different from `exclude` (or `exclude` itself in a
    /// population of one).
    fn random_other<R: Rng>(&self, exclude: usize, rng: &mut R) -> usize {
        let len = self.individuals.len();
        if len < 2 {
            return exclude;
        }
        let pick = rng.random_range(0..len - 1);
        if pick >= exclude {
            pick + 1
        } else {
            pick
        }
    }

    /// Subtree crossover.
    ///
    /// One crossover point is drawn in each parent, a nonterminal with
    /// probability `nonterminal_crossover_rate`. A copy of `donor`'s subtree
    /// replaces the subtree at `receiver`'s point; when that point is the
    /// root, the donor subtree becomes the whole tree.
    pub fn crossover<R: Rng>(
        &self,
        receiver: &mut Individual,
        donor: &Individual,
        rng: &mut R,
    ) -> Result<(), TreeError> {
        let receiver_nonterminal = rng.random::<f64>() < self.config.nonterminal_crossover_rate;
        let donor_nonterminal = rng.random::<f64>() < self.config.nonterminal_crossover_rate;

        let (target, child_index) = receiver.pick_random_node(receiver_nonterminal, rng)?;
        let target_parent = target.parent();
        let (subtree, _) = donor.pick_random_node(donor_nonterminal, rng)?;
        let subtree = subtree.clone();

        receiver.graft(target_parent, child_index, subtree)
    }

    /// Scores every individual whose fitness is stale, then refreshes the statistics.
    ///
    /// In parallel mode each worker gets its own copy of the maps.
    pub fn evaluate(&mut self) {
        let Population {
            individuals,
            maps,
            config,
            ..
        } = self;

        if config.parallel {
            let shared: &[TrailMap] = maps;
            individuals
                .par_iter_mut()
                .filter(|ind| !ind.is_evaluated())
                .for_each_init(
                    || shared.to_vec(),
                    |local, ind| {
                        ind.evaluate(local);
                    },
                );
        } else {
            for ind in individuals.iter_mut().filter(|ind| !ind.is_evaluated()) {
                ind.evaluate(maps);
            }
        }
        self.update_statistics();
    }

    fn update_statistics(&mut self) {
        let count = self.individuals.len().max(1);
        let mut stats = Statistics {
            best_index: 0,
            best_fitness: f64::NEG_INFINITY,
            worst_fitness: f64::INFINITY,
            average_fitness: 0.0,
            largest_tree: 0,
            smallest_tree: usize::MAX,
            average_tree: 0.0,
            total_nodes: 0,
        };

        for (i, ind) in self.individuals.iter().enumerate() {
            let fitness = ind.fitness();
            if fitness > stats.best_fitness {
                stats.best_fitness = fitness;
                stats.best_index = i;
            }
            stats.worst_fitness = stats.worst_fitness.min(fitness);
            stats.average_fitness += fitness;

            let size = ind.tree_size();
            stats.largest_tree = stats.largest_tree.max(size);
            stats.smallest_tree = stats.smallest_tree.min(size);
            stats.total_nodes += size;
        }
        stats.average_fitness /= count as f64;
        stats.average_tree = stats.total_nodes as f64 / count as f64;
        self.stats = stats;
    }

    /// Statistics of the current generation as a record.
    pub fn snapshot(&self, generation: usize) -> GenerationStats {
        GenerationStats {
            generation,
            best_fitness: self.best_fitness(),
            worst_fitness: self.worst_fitness(),
            average_fitness: self.average_fitness(),
            best_tree_size: self.best_tree_size(),
            largest_tree_size: self.largest_tree_size(),
            smallest_tree_size: self.smallest_tree_size(),
            average_tree_size: self.average_tree_size(),
            total_nodes: self.total_node_count(),
        }
    }

    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    pub fn maps(&self) -> &[TrailMap] {
        &self.maps
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Index of the current elite individual.
    pub fn best_index(&self) -> usize {
        self.stats.best_index
    }

    pub fn best(&self) -> &Individual {
        &self.individuals[self.stats.best_index]
    }

    pub fn best_fitness(&self) -> f64 {
        self.stats.best_fitness
    }

    pub fn worst_fitness(&self) -> f64 {
        self.stats.worst_fitness
    }

    pub fn average_fitness(&self) -> f64 {
        self.stats.average_fitness
    }

    pub fn best_tree_size(&self) -> usize {
        self.best().tree_size()
    }

    pub fn largest_tree_size(&self) -> usize {
        self.stats.largest_tree
    }

    pub fn smallest_tree_size(&self) -> usize {
        self.stats.smallest_tree
    }

    pub fn average_tree_size(&self) -> f64 {
        self.stats.average_tree
    }

    pub fn total_node_count(&self) -> usize {
        self.stats.total_nodes
    }

    /// One line per individual, optionally prefixed with its fitness.
    pub fn render(&self, include_fitness: bool, latex: bool) -> String {
        self.individuals
            .iter()
            .map(|ind| Self::describe(ind, include_fitness, latex))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn best_to_string(&self, include_fitness: bool, latex: bool) -> String {
        Self::describe(self.best(), include_fitness, latex)
    }

    fn describe(ind: &Individual, include_fitness: bool, latex: bool) -> String {
        if include_fitness {
            format!("{} ==> {}", ind.fitness(), ind.render(latex))
        } else {
            ind.render(latex)
        }
    }

    /// Renders each map after the best individual has run on it.
    pub fn best_solution_maps(&mut self, latex: bool) -> Vec<String> {
        let best = &self.individuals[self.stats.best_index];
        best.render_solution(&mut self.maps, latex)
    }

    pub fn best_graphviz(&self, graph_name: &str) -> String {
        self.best().to_graphviz(graph_name)
    }
}
