use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration, one section per concern.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub ga: GaConfig,
    pub trail: TrailConfig,
    pub output: OutputConfig,
}

/// Parameters of the evolutionary run.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub num_generations: usize,
    /// Number of best individuals copied unchanged into the next generation
    pub elitism_count: usize,
    /// Number of challengers each tournament winner has to beat
    pub tournament_size: usize,
    /// Probability that a tournament compares fitness rather than tree size
    pub proportional_tournament_rate: f64,
    /// Per-node mutation probability
    pub mutation_rate: f64,
    /// Probability that a crossover point is a nonterminal
    pub nonterminal_crossover_rate: f64,
    pub tree_depth_min: usize,
    pub tree_depth_max: usize,
    /// Fixed seed for a reproducible run, drawn at startup when absent
    pub seed: Option<u64>,
    /// Evaluate the population on worker threads
    pub parallel: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 200,
            num_generations: 20,
            elitism_count: 1,
            tournament_size: 5,
            proportional_tournament_rate: 0.65,
            mutation_rate: 0.03,
            nonterminal_crossover_rate: 0.90,
            tree_depth_min: 3,
            tree_depth_max: 6,
            seed: None,
            parallel: false,
        }
    }
}

/// Maps the ant is evaluated on.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct TrailConfig {
    /// Primitive actions allowed per simulation episode
    pub action_limit: usize,
    /// Maps that drive selection
    pub map_files: Vec<String>,
    /// Maps tracked every generation but never used for selection
    pub secondary_map_files: Vec<String>,
    /// Maps the final population is checked against once evolution ends
    pub verification_map_files: Vec<String>,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            action_limit: 500,
            map_files: Vec::new(),
            secondary_map_files: Vec::new(),
            verification_map_files: Vec::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub stats_file: String,
    pub secondary_stats_file: String,
    pub verification_stats_file: String,
    pub graphviz_file: Option<String>,
    pub champion_file: Option<String>,
    /// Number of top individuals written to `champion_file`
    pub champion_count: usize,
    /// Wrap textual renderings for TeX documents
    pub latex: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            stats_file: "sf_output.csv".to_string(),
            secondary_stats_file: "sf_secondary_output.csv".to_string(),
            verification_stats_file: "sf_verification_output.csv".to_string(),
            graphviz_file: None,
            champion_file: None,
            champion_count: 5,
            latex: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Checks the parameters that cannot be corrected on the fly.
    ///
    /// An inverted depth range is not an error: the population swaps it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ga = &self.ga;
        if ga.population_size < 2 {
            return Err(ConfigError::Invalid(format!(
                "population_size must be at least 2, got {}",
                ga.population_size
            )));
        }
        if ga.elitism_count == 0 || ga.elitism_count >= ga.population_size {
            return Err(ConfigError::Invalid(format!(
                "elitism_count must be in 1..{}, got {}",
                ga.population_size, ga.elitism_count
            )));
        }
        if ga.tournament_size == 0 {
            return Err(ConfigError::Invalid(
                "tournament_size must be greater than 0".to_string(),
            ));
        }
        for (name, rate) in [
            ("proportional_tournament_rate", ga.proportional_tournament_rate),
            ("mutation_rate", ga.mutation_rate),
            ("nonterminal_crossover_rate", ga.nonterminal_crossover_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within [0, 1], got {}",
                    name, rate
                )));
            }
        }
        if self.trail.action_limit == 0 {
            return Err(ConfigError::Invalid(
                "action_limit must be greater than 0".to_string(),
            ));
        }
        if self.trail.map_files.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one entry in map_files is required".to_string(),
            ));
        }
        Ok(())
    }
}
