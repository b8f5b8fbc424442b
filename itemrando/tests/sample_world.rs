use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use hashbrown::HashMap;
use itemrando::errors::RandoError;
use itemrando::randomize::{Randomization, Randomizer};
use itemrando::settings::{parse_ruleset_config, Goal, RulesetConfig};
use itemrando::traverse::{collect, spheres};
use itemrando::world::World;
use itemrando_game::{GameData, LocationKind};
use itemrando_logic::ItemMultiset;

fn sample_world_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../worlds/sample.json")
}

fn load_sample() -> Result<GameData> {
    GameData::load(&sample_world_path())
}

// The first seed from `start` that generates successfully, as the CLI's retry loop would find it.
fn first_success(
    randomizer: &Randomizer,
    start: usize,
    max_attempts: usize,
) -> Result<(usize, World)> {
    for seed in start..start + max_attempts {
        if let Ok(world) = randomizer.fill_world(1, seed) {
            return Ok((seed, world));
        }
    }
    bail!("no successful seed in {} attempts", max_attempts)
}

#[test]
fn load_sample_world() -> Result<()> {
    let game_data = load_sample()?;
    assert_eq!(game_data.regions.len(), 7);
    assert_eq!(game_data.item_pool.dungeon.len(), 8);
    assert_eq!(game_data.item_pool.required.len(), 16);
    let goals: Vec<&str> = game_data
        .win_conditions
        .iter()
        .map(|(goal, _)| goal.as_str())
        .collect();
    for goal in ["ganon", "dungeons", "pedestal", "triforce-hunt"] {
        assert!(goals.contains(&goal), "missing goal {}", goal);
    }
    Ok(())
}

#[test]
fn every_location_reachable_with_full_pool() -> Result<()> {
    let game_data = load_sample()?;
    let world = World::new(&game_data, RulesetConfig::default())?;
    let pool = &game_data.item_pool;
    let all_items = ItemMultiset::from_names(
        &[&pool.dungeon[..], &pool.required[..], &pool.nice[..], &pool.extra[..]].concat(),
    );
    let everything = collect(&world, &all_items)?;
    for loc in world.collectable_locations() {
        assert!(
            world.can_access(loc.id, &everything)?,
            "{} unreachable",
            loc.name
        );
    }
    Ok(())
}

#[test]
fn filled_sample_world_is_complete_and_beatable() -> Result<()> {
    let game_data = load_sample()?;
    let settings = RulesetConfig::default();
    let randomizer = Randomizer::new(&game_data, &settings);
    let mut successes = 0;
    let mut start = 0;
    while successes < 5 {
        let (seed, world) = first_success(&randomizer, start, 50)?;
        start = seed + 1;
        successes += 1;

        assert!(world.empty_locations().is_empty());
        let items = collect(&world, &ItemMultiset::new())?;
        assert!(world.check_win_condition(&items)?);

        // Every pool item was placed exactly as often as the pool lists it.
        let mut placed: HashMap<String, usize> = HashMap::new();
        for loc in world.collectable_locations() {
            if game_data.locations[loc.id].placed_item.is_some() {
                continue;
            }
            if let Some(item) = &loc.item {
                *placed.entry(item.name.clone()).or_insert(0) += 1;
            }
        }
        let pool = &game_data.item_pool;
        let mut expected: HashMap<String, usize> = HashMap::new();
        for name in [&pool.dungeon, &pool.required, &pool.nice, &pool.extra]
            .into_iter()
            .flatten()
        {
            *expected.entry(name.clone()).or_insert(0) += 1;
        }
        let filler_count = placed.remove("Nothing").unwrap_or(0);
        assert_eq!(placed, expected);
        assert_eq!(filler_count, 52 - 42);

        for (name, region) in [("KeyP3", "Tower of Hera"), ("BigKeyA2", "Ganons Tower")] {
            let regions = world.regions_with_item(name);
            assert_eq!(regions.len(), 1);
            assert_eq!(world.regions[regions[0]].name, region);
        }
    }
    Ok(())
}

#[test]
fn spheres_cover_filled_world() -> Result<()> {
    let game_data = load_sample()?;
    let settings = RulesetConfig::default();
    let randomizer = Randomizer::new(&game_data, &settings);
    let (_, world) = first_success(&randomizer, 100, 50)?;
    let layers = spheres(&world)?;
    let mut seen = vec![false; world.locations.len()];
    for sphere in &layers {
        for &id in sphere {
            assert!(!seen[id]);
            seen[id] = true;
        }
    }
    for loc in &world.locations {
        assert_eq!(seen[loc.id], loc.kind != LocationKind::Event, "{}", loc.name);
    }
    Ok(())
}

fn spoiler_json(randomization: &Randomization) -> Result<String> {
    Ok(serde_json::to_string(&randomization.spoiler_log)?)
}

#[test]
fn same_seed_same_result() -> Result<()> {
    let game_data = load_sample()?;
    let settings = RulesetConfig::default();
    let randomizer = Randomizer::new(&game_data, &settings);
    let (seed, _) = first_success(&randomizer, 0, 50)?;

    let first = randomizer.randomize(1, seed)?;
    let second = randomizer.randomize(7, seed)?;
    assert_eq!(first.item_placement, second.item_placement);
    assert_eq!(spoiler_json(&first)?, spoiler_json(&second)?);

    // A fresh load of the world definition changes nothing either.
    let reloaded = load_sample()?;
    let third = Randomizer::new(&reloaded, &settings).randomize(1, seed)?;
    assert_eq!(first.item_placement, third.item_placement);
    assert_eq!(spoiler_json(&first)?, spoiler_json(&third)?);
    Ok(())
}

#[test]
fn different_seeds_differ() -> Result<()> {
    let game_data = load_sample()?;
    let settings = RulesetConfig::default();
    let randomizer = Randomizer::new(&game_data, &settings);
    let (a, _) = first_success(&randomizer, 0, 50)?;
    let (b, _) = first_success(&randomizer, a + 1, 50)?;
    let first = randomizer.randomize(1, a)?;
    let second = randomizer.randomize(1, b)?;
    assert_ne!(first.item_placement, second.item_placement);
    Ok(())
}

#[test]
fn playthrough_is_sufficient() -> Result<()> {
    let game_data = load_sample()?;
    let settings = RulesetConfig::default();
    let randomizer = Randomizer::new(&game_data, &settings);
    let (seed, world) = first_success(&randomizer, 200, 50)?;
    let randomization = randomizer.randomize(1, seed)?;
    let playthrough = &randomization.spoiler_log.playthrough;

    let required = playthrough.required_location_ids();
    assert!(!required.is_empty());
    assert_eq!(playthrough.longest_item_chain, playthrough.rounds.len());
    let medallion = world.location_by_name("Misery Mire Medallion").unwrap();
    assert!(!required.contains(&medallion));
    for x in &playthrough.required {
        assert!(!x.item.starts_with("Map ("));
        assert!(!x.item.starts_with("Compass ("));
    }

    // Sufficiency only: an item that opens a deeper required location is kept even when
    // another path to the goal exists, so the set is not always minimal on this world.
    let mut scratch = world.copy()?;
    for loc in &world.locations {
        if loc.kind.is_collectable() && !required.contains(&loc.id) {
            scratch.take_item(loc.id);
        }
    }
    let items = collect(&scratch, &ItemMultiset::new())?;
    assert!(scratch.check_win_condition(&items)?);
    Ok(())
}

#[test]
fn alternative_goals() -> Result<()> {
    let game_data = load_sample()?;
    for goal in [Goal::Dungeons, Goal::Pedestal, Goal::TriforceHunt] {
        let mut settings = RulesetConfig {
            goal,
            ..RulesetConfig::default()
        };
        settings.values.insert("goalRequired".to_string(), 3);
        let randomizer = Randomizer::new(&game_data, &settings);
        let (seed, _) = first_success(&randomizer, 0, 50)?;
        let randomization = randomizer.randomize(1, seed)?;
        assert_eq!(randomization.spoiler_log.goal, goal.to_string());
        assert!(!randomization.spoiler_log.playthrough.required.is_empty());
    }
    Ok(())
}

#[test]
fn unreachable_goal_count_never_succeeds() -> Result<()> {
    let game_data = load_sample()?;
    // Only three triforce pieces exist in the pool, and the loaded settings fall back to the
    // default piece count.
    let settings = parse_ruleset_config(
        r#"{"difficulty": "normal", "logic": "NoMajorGlitches", "goal": "triforce-hunt"}"#,
    )?;
    let randomizer = Randomizer::new(&game_data, &settings);
    for seed in 0..10 {
        let err = match randomizer.randomize(1, seed) {
            Ok(_) => bail!("seed {} beaten with three pieces", seed),
            Err(e) => e,
        };
        match err.downcast_ref::<RandoError>() {
            Some(e) if e.is_retryable() => {}
            other => bail!("unexpected error {:?}", other),
        }
    }
    Ok(())
}
