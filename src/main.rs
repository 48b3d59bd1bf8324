use santa_fe_gp::config::Config;
use santa_fe_gp::evolution::EvolutionEngine;
use santa_fe_gp::export::{
    write_export_to_json, write_stats_csv, write_text, ChampionExport, ExportConfig,
};
use santa_fe_gp::trail::{load_maps, TrailMap};
use std::env;
use std::path::Path;
use std::process;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Loads a list of map files, exiting the process if any of them cannot be read.
///
/// # Arguments
/// * `label` - Name of the map set, used in log messages
/// * `files` - Paths of the map files
/// * `action_limit` - Action budget of every map
fn load_map_set(label: &str, files: &[String], action_limit: usize) -> Vec<TrailMap> {
    if files.is_empty() {
        return Vec::new();
    }
    log::info!("Loading {} {} map(s)...", files.len(), label);
    match load_maps(files, action_limit) {
        Ok(maps) => maps,
        Err(e) => {
            log::error!("Failed to load {} maps: {}", label, e);
            process::exit(1);
        }
    }
}

fn write_stats(label: &str, path: &str, stats: &[santa_fe_gp::evolution::GenerationStats]) {
    if stats.is_empty() {
        return;
    }
    match write_stats_csv(stats, Path::new(path)) {
        Ok(()) => log::info!("Wrote {} statistics to '{}'.", label, path),
        Err(e) => log::error!("Failed to write {} statistics: {}", label, e),
    }
}

fn main() {
    env_logger::init();
    log::info!("Booting Santa Fe Trail GP...");

    // 1. Load and Validate Configuration
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match Config::load(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Failed to load configuration '{}': {}", config_path, e);
            process::exit(1);
        }
    };

    if let Err(e) = config.validate() {
        log::error!("Invalid configuration: {}", e);
        process::exit(1);
    }
    log::info!("Configuration '{}' loaded and validated.", config_path);

    // 2. Load Maps
    let action_limit = config.trail.action_limit;
    let maps = load_map_set("selection", &config.trail.map_files, action_limit);
    let secondary_maps = load_map_set(
        "secondary",
        &config.trail.secondary_map_files,
        action_limit,
    );
    let verification_maps = load_map_set(
        "verification",
        &config.trail.verification_map_files,
        action_limit,
    );

    // 3. Run the Evolution
    log::info!("--- Starting Evolution ---");
    let mut engine = match EvolutionEngine::new(&config.ga, maps, secondary_maps) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Failed to initialize evolution: {}", e);
            process::exit(1);
        }
    };
    let report = match engine.run() {
        Ok(report) => report,
        Err(e) => {
            log::error!("Evolution aborted: {}", e);
            process::exit(1);
        }
    };

    let output = &config.output;
    write_stats("selection", &output.stats_file, &report.history);
    write_stats(
        "secondary",
        &output.secondary_stats_file,
        &report.secondary_history,
    );

    // 4. Verification on withheld maps
    if !verification_maps.is_empty() {
        log::info!("--- Verifying Final Population ---");
        match engine.verify(verification_maps) {
            Ok(verified) => {
                let stats = [verified.snapshot(config.ga.num_generations)];
                write_stats("verification", &output.verification_stats_file, &stats);
            }
            Err(e) => log::error!("Verification failed: {}", e),
        }
    }

    // 5. Report the Champion
    let population = engine.population_mut();
    println!(
        "\n[Best] Fitness: {:.4} | Size: {}",
        population.best_fitness(),
        population.best_tree_size()
    );
    println!("{}", population.best_to_string(false, output.latex));
    for (i, solved) in population
        .best_solution_maps(output.latex)
        .iter()
        .enumerate()
    {
        println!("\n[Map {}]\n{}", i + 1, solved);
    }

    if let Some(path) = &output.graphviz_file {
        match write_text(&population.best_graphviz("best"), Path::new(path)) {
            Ok(()) => log::info!("Wrote GraphViz graph of the best tree to '{}'.", path),
            Err(e) => log::error!("Failed to write GraphViz graph: {}", e),
        }
    }

    if let Some(path) = &output.champion_file {
        let export = ChampionExport::new(
            population,
            output.champion_count,
            ExportConfig {
                ga: config.ga.clone(),
                trail: config.trail.clone(),
            },
            report.seed,
        );
        match write_export_to_json(&export, Path::new(path)) {
            Ok(()) => log::info!(
                "Exported {} champion(s) to '{}'.",
                export.champions.len(),
                path
            ),
            Err(e) => log::error!("Failed to export champions: {}", e),
        }
    }

    log::info!("Run complete (seed {}).", report.seed);
}
