use anyhow::{bail, Context, Result};
use clap::Parser;
use itemrando::errors::RandoError;
use itemrando::randomize::{Randomization, Randomizer};
use itemrando::settings::{Difficulty, Goal, LogicMode, RulesetConfig};
use itemrando_game::GameData;
use log::info;
use rand::{RngCore, SeedableRng};
use std::path::PathBuf;

#[derive(Parser)]
struct Args {
    #[arg(long, default_value = "worlds/sample.json")]
    world: PathBuf,

    #[arg(long)]
    settings: Option<PathBuf>,

    // Overrides for the settings file (or the defaults):
    #[arg(long)]
    logic: Option<LogicMode>,

    #[arg(long)]
    goal: Option<Goal>,

    #[arg(long)]
    difficulty: Option<Difficulty>,

    #[arg(long)]
    random_seed: Option<usize>,

    #[arg(long)]
    item_placement_seed: Option<usize>,

    #[arg(long, default_value_t = 100)]
    max_attempts: usize,

    #[arg(long)]
    output_spoiler_log: Option<PathBuf>,

    #[arg(long)]
    output_placements: Option<PathBuf>,
}

fn get_settings(args: &Args) -> Result<RulesetConfig> {
    let mut settings = match &args.settings {
        Some(path) => RulesetConfig::load(path)?,
        None => RulesetConfig::default(),
    };
    if let Some(logic) = args.logic {
        settings.logic = logic;
    }
    if let Some(goal) = args.goal {
        settings.goal = goal;
    }
    if let Some(difficulty) = args.difficulty {
        settings.difficulty = difficulty;
    }
    Ok(settings)
}

fn get_randomization(
    args: &Args,
    game_data: &GameData,
    settings: &RulesetConfig,
) -> Result<Randomization> {
    let root_seed = match args.random_seed {
        Some(s) => s,
        None => (rand::rngs::StdRng::from_entropy().next_u64() & 0xFFFFFFFF) as usize,
    };
    let mut rng_seed = [0u8; 32];
    rng_seed[..8].copy_from_slice(&root_seed.to_le_bytes());
    let mut rng = rand::rngs::StdRng::from_seed(rng_seed);
    let max_attempts = if args.item_placement_seed.is_some() {
        1
    } else {
        args.max_attempts
    };

    let randomizer = Randomizer::new(game_data, settings);
    for attempt_num in 1..=max_attempts {
        let item_seed = match args.item_placement_seed {
            Some(s) => s,
            None => (rng.next_u64() & 0xFFFFFFFF) as usize,
        };
        info!("Attempt {attempt_num}/{max_attempts}: Item placement seed={item_seed}");
        match randomizer.randomize(attempt_num, item_seed) {
            Ok(randomization) => {
                return Ok(randomization);
            }
            Err(e) => {
                match e.downcast_ref::<RandoError>() {
                    Some(rando_err) if rando_err.is_retryable() => {}
                    _ => return Err(e),
                }
                info!(
                    "Attempt {attempt_num}/{max_attempts}: Randomization failed: {:#}",
                    e
                );
            }
        }
    }
    bail!("Exhausted randomization attempts");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    let game_data = GameData::load(&args.world)?;
    let settings = get_settings(&args)?;
    info!(
        "Ruleset: logic={}, goal={}, difficulty={}",
        settings.logic, settings.goal, settings.difficulty
    );

    let randomization = get_randomization(&args, &game_data, &settings)?;
    info!(
        "Generated seed {} with {} placements",
        randomization.seed,
        randomization.item_placement.len()
    );

    if let Some(output_spoiler_log_path) = &args.output_spoiler_log {
        println!(
            "Writing spoiler log to {}",
            output_spoiler_log_path.display()
        );
        let spoiler_str = serde_json::to_string_pretty(&randomization.spoiler_log)?;
        std::fs::write(output_spoiler_log_path, spoiler_str).with_context(|| {
            format!("Unable to write {}", output_spoiler_log_path.display())
        })?;
    }

    if let Some(output_placements_path) = &args.output_placements {
        println!(
            "Writing item placements to {}",
            output_placements_path.display()
        );
        let placements_str = serde_json::to_string_pretty(&randomization.item_placement)?;
        std::fs::write(output_placements_path, placements_str).with_context(|| {
            format!("Unable to write {}", output_placements_path.display())
        })?;
    }

    Ok(())
}
