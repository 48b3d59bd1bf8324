pub mod individual;
pub mod population;

use crate::config::GaConfig;
use crate::evolution::population::Population;
use crate::trail::TrailMap;
use crate::tree::TreeError;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("Tree bookkeeping corrupted: {0}")]
    Tree(#[from] TreeError),
    #[error("At least one map is required to evaluate fitness")]
    NoMaps,
}

/// Summary statistics of one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationStats {
    pub generation: usize,
    pub best_fitness: f64,
    pub worst_fitness: f64,
    pub average_fitness: f64,
    pub best_tree_size: usize,
    pub largest_tree_size: usize,
    pub smallest_tree_size: usize,
    pub average_tree_size: f64,
    pub total_nodes: usize,
}

impl GenerationStats {
    pub const CSV_HEADER: &'static str = "generation,best_fitness,worst_fitness,average_fitness,\
best_tree_size,largest_tree_size,smallest_tree_size,average_tree_size,total_nodes";

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{}",
            self.generation,
            self.best_fitness,
            self.worst_fitness,
            self.average_fitness,
            self.best_tree_size,
            self.largest_tree_size,
            self.smallest_tree_size,
            self.average_tree_size,
            self.total_nodes
        )
    }
}

/// Everything recorded while running the generational loop.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Seed the run's random source was created with
    pub seed: u64,
    /// Statistics on the selection maps, generation 0 being the initial population
    pub history: Vec<GenerationStats>,
    /// Statistics on the secondary maps, empty when none are configured
    pub secondary_history: Vec<GenerationStats>,
}

/// Drives a population through the configured number of generations.
///
/// Owns the only random source of the run, so a run is fully determined by
/// its seed and configuration.
pub struct EvolutionEngine {
    config: GaConfig,
    seed: u64,
    rng: StdRng,
    population: Population,
    secondary_maps: Vec<TrailMap>,
}

impl EvolutionEngine {
    /// Creates the engine and its initial, evaluated population.
    ///
    /// # Arguments
    /// * `config` - Evolution parameters; a missing `seed` is drawn from the OS and logged
    /// * `maps` - Maps that drive selection
    /// * `secondary_maps` - Maps tracked every generation without affecting selection
    ///
    /// # Returns
    /// * `Err(EvolutionError::NoMaps)` - `maps` is empty
    pub fn new(
        config: &GaConfig,
        maps: Vec<TrailMap>,
        secondary_maps: Vec<TrailMap>,
    ) -> Result<Self, EvolutionError> {
        if maps.is_empty() {
            return Err(EvolutionError::NoMaps);
        }
        warn_foodless_maps("selection", &maps);
        warn_foodless_maps("secondary", &secondary_maps);

        let seed = config.seed.unwrap_or_else(rand::random);
        info!("Random seed: {}", seed);
        let mut rng = StdRng::seed_from_u64(seed);

        info!("Initializing population of size {}...", config.population_size);
        let population = Population::new(config, maps, &mut rng);
        info!(
            "Initial population ready (depth {}..={})",
            population.config().tree_depth_min,
            population.config().tree_depth_max
        );

        Ok(Self {
            config: config.clone(),
            seed,
            rng,
            population,
            secondary_maps,
        })
    }

    /// Runs `num_generations` generations.
    ///
    /// The initial population is recorded as generation 0. Calling this again
    /// continues from the current population.
    pub fn run(&mut self) -> Result<RunReport, EvolutionError> {
        let generations = self.config.num_generations;
        let mut report = RunReport {
            seed: self.seed,
            history: Vec::with_capacity(generations + 1),
            secondary_history: Vec::new(),
        };

        self.record(0, &mut report);
        for generation in 1..=generations {
            self.population.evolve(&mut self.rng)?;
            self.record(generation, &mut report);
        }

        info!(
            "Evolution complete. Best fitness={:.4} with {} nodes",
            self.population.best_fitness(),
            self.population.best_tree_size()
        );
        Ok(report)
    }

    fn record(&self, generation: usize, report: &mut RunReport) {
        let stats = self.population.snapshot(generation);
        info!(
            "Gen {}/{}: Best Fitness={:.4} | Avg Fitness={:.4} | Worst Fitness={:.4} | Best Size={} | Avg Size={:.1}",
            generation,
            self.config.num_generations,
            stats.best_fitness,
            stats.average_fitness,
            stats.worst_fitness,
            stats.best_tree_size,
            stats.average_tree_size
        );
        report.history.push(stats);

        if !self.secondary_maps.is_empty() {
            let secondary = self
                .population
                .with_maps(self.secondary_maps.clone())
                .snapshot(generation);
            info!(
                "Gen {}: Secondary Best Fitness={:.4} | Avg Fitness={:.4}",
                generation, secondary.best_fitness, secondary.average_fitness
            );
            report.secondary_history.push(secondary);
        }
    }

    /// Scores a copy of the current population on withheld maps.
    ///
    /// # Returns
    /// * `Err(EvolutionError::NoMaps)` - `maps` is empty
    pub fn verify(&self, maps: Vec<TrailMap>) -> Result<Population, EvolutionError> {
        if maps.is_empty() {
            return Err(EvolutionError::NoMaps);
        }
        let verified = self.population.with_maps(maps);
        info!(
            "Verification: Best Fitness={:.4} | Avg Fitness={:.4}",
            verified.best_fitness(),
            verified.average_fitness()
        );
        Ok(verified)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn population_mut(&mut self) -> &mut Population {
        &mut self.population
    }
}

/// Logs every map of `maps` without food and returns their indices.
fn warn_foodless_maps(label: &str, maps: &[TrailMap]) -> Vec<usize> {
    let foodless: Vec<usize> = maps
        .iter()
        .enumerate()
        .filter(|(_, map)| map.total_food_count() == 0)
        .map(|(i, _)| i)
        .collect();
    for i in &foodless {
        warn!(
            "{} map #{} has no food and is left out of every fitness average",
            label, i
        );
    }
    foodless
}
