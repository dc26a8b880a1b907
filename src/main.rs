//! A thin demo entry point: wires up a small evolutionary run and prints
//! the champion it settles on. No CLI argument parsing -- out of scope per
//! the design; a real front end would construct `EvolutionConfig` itself
//! and call into the library directly.

use anyhow::Result;
use hexwar::evolution::{EvolutionConfig, EvolutionDriver};

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = EvolutionConfig {
        population_size: 8,
        elite_count: 3,
        min_evals: 8,
        ucb_c: 0.3,
        games_per_matchup: 4,
        base_depth: 3,
        reduced_tournament: true,
        max_generations: 5,
        worker_count: None,
        seed: 42,
        fixed_side: None,
    };

    let mut driver = EvolutionDriver::new(config);
    let champion = driver.run();
    driver.shutdown();

    println!("champion: {} ({})", champion.name, champion.signature);
    println!(
        "  generation {}, n_evals {}, mean fitness {:.3} (range {:.3}..{:.3}), ucb {:.3}",
        champion.generation_reached,
        champion.n_evals,
        champion.mean_fitness,
        champion.min_fitness,
        champion.max_fitness,
        champion.ucb_score,
    );
    println!("{}", serde_json::to_string_pretty(&champion.ruleset)?);

    Ok(())
}
