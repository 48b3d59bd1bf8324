//! Persistence of run results.
//!
//! Per-generation statistics go to CSV files, the best tree can be written as
//! a GraphViz graph, and the top individuals of the final population are
//! exported to JSON together with the configuration and seed that produced
//! them, so a champion can be reloaded and replayed later.

use crate::config::{GaConfig, TrailConfig};
use crate::evolution::population::Population;
use crate::evolution::GenerationStats;
use crate::trail::TrailMap;
use crate::tree::{Node, TreeError};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write or read export file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to (de)serialize champion export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Export of the best individuals of a run with the metadata needed to replay it.
#[derive(Serialize, Deserialize, Debug)]
pub struct ChampionExport {
    /// Schema version for forward/backward compatibility
    pub schema_version: String,
    /// Unix timestamp when export was generated
    pub generated_at: u64,
    /// Seed of the run's random source
    pub seed: u64,
    /// Snapshot of the configuration the run used
    pub evolution_config: ExportConfig,
    /// Hash of the selection maps the champions were scored on
    pub map_hash: String,
    /// Best individuals, best first
    pub champions: Vec<ChampionData>,
}

/// Subset of configuration relevant for reproducibility
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExportConfig {
    pub ga: GaConfig,
    pub trail: TrailConfig,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChampionData {
    /// Rank within the population (1 = best)
    pub rank: usize,
    pub fitness: f64,
    pub tree_size: usize,
    /// Food eaten on each selection map
    pub food_eaten: Vec<usize>,
    /// Program in its text form
    pub tree: String,
}

impl ChampionData {
    /// Parses the stored program back into a tree.
    pub fn parse_tree(&self) -> Result<Node, TreeError> {
        self.tree.parse()
    }
}

impl ChampionExport {
    /// Creates an export of the `count` fittest individuals of `population`.
    ///
    /// # Arguments
    /// * `population` - Evaluated population, usually the final generation
    /// * `count` - Number of champions to keep
    /// * `evolution_config` - Configuration the run used
    /// * `seed` - Seed the run's random source was created with
    ///
    /// # Returns
    /// A new `ChampionExport` instance ready for serialization.
    pub fn new(
        population: &Population,
        count: usize,
        evolution_config: ExportConfig,
        seed: u64,
    ) -> Self {
        let mut ranked: Vec<_> = population.individuals().iter().collect();
        ranked.sort_by(|a, b| {
            b.fitness()
                .partial_cmp(&a.fitness())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let champions = ranked
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, ind)| ChampionData {
                rank: i + 1,
                fitness: ind.fitness(),
                tree_size: ind.tree_size(),
                food_eaten: ind.scores().iter().map(|s| s.consumed).collect(),
                tree: ind.to_string(),
            })
            .collect();

        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            generated_at: chrono::Utc::now().timestamp() as u64,
            seed,
            evolution_config,
            map_hash: compute_map_hash(population.maps()),
            champions,
        }
    }

    /// Checks that `maps` are the maps the champions were scored on.
    pub fn validate_map_hash(&self, maps: &[TrailMap]) -> bool {
        compute_map_hash(maps) == self.map_hash
    }
}

/// Hashes the pristine layout of every map, in order.
fn compute_map_hash(maps: &[TrailMap]) -> String {
    let mut hasher = DefaultHasher::new();
    for map in maps {
        let mut pristine = map.clone();
        pristine.reset();
        pristine.to_string().hash(&mut hasher);
        pristine.action_limit().hash(&mut hasher);
    }
    format!("{:x}", hasher.finish())
}

/// Writes champion export to a JSON file.
pub fn write_export_to_json(export: &ChampionExport, output_path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(export)?;
    std::fs::write(output_path, json)?;
    Ok(())
}

/// Reads champion export from a JSON file.
pub fn read_export_from_json(input_path: &Path) -> Result<ChampionExport, ExportError> {
    let content = std::fs::read_to_string(input_path)?;
    let export: ChampionExport = serde_json::from_str(&content)?;
    Ok(export)
}

/// Writes one CSV row per generation under a header line.
pub fn write_stats_csv(stats: &[GenerationStats], output_path: &Path) -> Result<(), ExportError> {
    let mut writer = BufWriter::new(File::create(output_path)?);
    writeln!(writer, "{}", GenerationStats::CSV_HEADER)?;
    for row in stats {
        writeln!(writer, "{}", row.to_csv_row())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a text rendering (GraphViz source, solved maps) to a file.
pub fn write_text(contents: &str, output_path: &Path) -> Result<(), ExportError> {
    std::fs::write(output_path, contents)?;
    Ok(())
}
