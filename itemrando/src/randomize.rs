use std::collections::VecDeque;

use anyhow::{Context, Result};
use itemrando_game::{GameData, Item, ItemPool, LocationId};
use itemrando_logic::ItemMultiset;
use log::{debug, error, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde_derive::{Deserialize, Serialize};

use crate::errors::RandoError;
use crate::settings::RulesetConfig;
use crate::spoiler_log::{get_spoiler_log, SpoilerLog};
use crate::traverse::{collect, reachable_empty_locations};
use crate::world::World;

/// The item pool split into placement tiers, in the order they are placed.
#[derive(Clone, Debug, Default)]
pub struct ItemBuckets {
    pub dungeon: Vec<Item>,
    pub required: Vec<Item>,
    pub nice: Vec<Item>,
    pub extra: Vec<Item>,
}

impl ItemBuckets {
    pub fn from_pool(world: &World, pool: &ItemPool) -> Result<ItemBuckets, RandoError> {
        let resolve = |names: &[String]| -> Result<Vec<Item>, RandoError> {
            names.iter().map(|name| world.item(name)).collect()
        };
        Ok(ItemBuckets {
            dungeon: resolve(&pool.dungeon)?,
            required: resolve(&pool.required)?,
            nice: resolve(&pool.nice)?,
            extra: resolve(&pool.extra)?,
        })
    }

    pub fn len(&self) -> usize {
        self.dungeon.len() + self.required.len() + self.nice.len() + self.extra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct Filler {
    pub attempt_num_rando: usize,
}

impl Filler {
    fn unsatisfiable(&self, world: &World, item: &Item) -> RandoError {
        let empty_locations: Vec<String> = world
            .empty_locations()
            .into_iter()
            .map(|id| world.locations[id].name.clone())
            .collect();
        for name in &empty_locations {
            error!(
                "[attempt {}] Soft lock location: {}",
                self.attempt_num_rando, name
            );
        }
        RandoError::UnsatisfiableFill {
            item: item.nice_name().to_string(),
            empty_locations,
        }
    }

    /// Places every bucket into `world`, leaving no collectable location empty.
    pub fn fill<R: Rng>(
        &self,
        world: &mut World,
        buckets: &ItemBuckets,
        rng: &mut R,
    ) -> Result<(), RandoError> {
        self.fill_dungeon_items(world, &buckets.dungeon, &buckets.required, rng)?;
        self.fill_required_items(world, &buckets.required, rng)?;

        // Every remaining empty location is reachable once progression is placed.
        let mut nice = buckets.nice.clone();
        nice.shuffle(rng);
        let mut extra = buckets.extra.clone();
        extra.shuffle(rng);
        let mut locations = world.empty_locations();
        locations.shuffle(rng);
        self.fast_fill(world, &nice, &mut locations)?;
        self.fast_fill(world, &extra, &mut locations)?;

        let filler_item = world.filler_item()?;
        let remaining = world.empty_locations();
        if !remaining.is_empty() {
            debug!(
                "[attempt {}] Placing {} into {} remaining locations",
                self.attempt_num_rando,
                filler_item.name,
                remaining.len()
            );
        }
        for location_id in remaining {
            world.set_item(location_id, Some(filler_item.clone()));
        }
        Ok(())
    }

    /// Assumed fill: each item is placed as if every other unplaced item of the bucket, and the
    /// whole required bucket, were already collected. Region restrictions keep dungeon items
    /// inside their own dungeon.
    pub fn fill_dungeon_items<R: Rng>(
        &self,
        world: &mut World,
        dungeon: &[Item],
        required: &[Item],
        rng: &mut R,
    ) -> Result<(), RandoError> {
        let mut items = dungeon.to_vec();
        items.shuffle(rng);
        let mut locations = world.empty_locations();
        locations.shuffle(rng);

        let base_assumed = ItemMultiset::from_items(required);
        let mut remaining = ItemMultiset::from_items(&items);
        for item in &items {
            remaining.remove_one(&item.name);
            let assumed = collect(world, &remaining.merge(&base_assumed))?;
            let mut placed = false;
            for &location_id in &locations {
                if world.fill(location_id, item, &assumed)? {
                    debug!(
                        "[attempt {}] Placing dungeon item {} in {}",
                        self.attempt_num_rando, item.name, world.locations[location_id].name
                    );
                    placed = true;
                    break;
                }
            }
            if !placed {
                return Err(self.unsatisfiable(world, item));
            }
        }
        Ok(())
    }

    /// Places the progression bucket using only what is actually obtainable so far.
    ///
    /// Items that would not open up new locations are moved to the back of the queue. Once a
    /// full pass makes no progress the current item is placed anyway. Early placements go to
    /// the first fillable location in shuffle order, the last third to the last one.
    pub fn fill_required_items<R: Rng>(
        &self,
        world: &mut World,
        required: &[Item],
        rng: &mut R,
    ) -> Result<(), RandoError> {
        let mut shuffled = required.to_vec();
        shuffled.shuffle(rng);
        let total_items = shuffled.len();
        let mut queue: VecDeque<Item> = shuffled.into();
        let mut locations = world.empty_locations();
        locations.shuffle(rng);

        // Items looked at since the last placement, and how many of them had nowhere to go.
        let mut tried = 0;
        let mut without_candidates = 0;
        let mut forcing = false;
        let empty_items = ItemMultiset::new();

        while let Some(item) = queue.front().cloned() {
            let collected = collect(world, &empty_items)?;
            let mut fillable: Vec<LocationId> = Vec::new();
            for &location_id in &locations {
                if world.item_at(location_id).is_none()
                    && world.can_fill(location_id, &item, &collected)?
                {
                    fillable.push(location_id);
                }
            }

            if fillable.is_empty() {
                tried += 1;
                without_candidates += 1;
                if tried < queue.len() {
                    queue.rotate_left(1);
                    continue;
                }
                if without_candidates < queue.len() {
                    // Some item in this pass can be placed; go around once more and force it.
                    forcing = true;
                    tried = 0;
                    without_candidates = 0;
                    queue.rotate_left(1);
                    continue;
                }
                return Err(self.unsatisfiable(world, &item));
            }

            if !forcing {
                let available = reachable_empty_locations(world, &collected)?;
                let available_after =
                    reachable_empty_locations(world, &collected.with_added(&item))?;
                debug!(
                    "[attempt {}] {}: before {} after {}",
                    self.attempt_num_rando,
                    item.name,
                    available.len(),
                    available_after.len()
                );
                if available_after.len() <= available.len() {
                    tried += 1;
                    if tried < queue.len() {
                        debug!(
                            "[attempt {}] Skipping {}",
                            self.attempt_num_rando, item.name
                        );
                        queue.rotate_left(1);
                        continue;
                    }
                }
            }

            let location_id = if queue.len() * 3 > total_items {
                fillable[0]
            } else {
                fillable[fillable.len() - 1]
            };
            debug!(
                "[attempt {}] Placing {} in {}",
                self.attempt_num_rando, item.name, world.locations[location_id].name
            );
            world.set_item(location_id, Some(item));
            queue.pop_front();
            tried = 0;
            without_candidates = 0;
            forcing = false;
        }
        Ok(())
    }

    /// Places items without any reachability check. Items with no accepting location left are
    /// dropped.
    pub fn fast_fill(
        &self,
        world: &mut World,
        items: &[Item],
        locations: &mut Vec<LocationId>,
    ) -> Result<(), RandoError> {
        let all_items = collect(world, &ItemMultiset::new())?;
        let mut dropped: Vec<&str> = Vec::new();
        for item in items {
            let mut chosen: Option<usize> = None;
            for (i, &location_id) in locations.iter().enumerate() {
                if world.item_at(location_id).is_none()
                    && world.accepts_fill(location_id, item, &all_items)?
                {
                    chosen = Some(i);
                    break;
                }
            }
            match chosen {
                Some(i) => {
                    let location_id = locations.remove(i);
                    world.set_item(location_id, Some(item.clone()));
                }
                None => dropped.push(&item.name),
            }
        }
        if !dropped.is_empty() {
            warn!(
                "[attempt {}] No room for {} items: {:?}",
                self.attempt_num_rando,
                dropped.len(),
                dropped
            );
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemPlacement {
    pub location_id: LocationId,
    pub location: String,
    pub item: String,
}

#[derive(Clone, Debug)]
pub struct Randomization {
    pub seed: usize,
    pub item_placement: Vec<ItemPlacement>,
    pub spoiler_log: SpoilerLog,
}

pub struct Randomizer<'a> {
    pub game_data: &'a GameData,
    pub settings: &'a RulesetConfig,
}

impl<'a> Randomizer<'a> {
    pub fn new(game_data: &'a GameData, settings: &'a RulesetConfig) -> Randomizer<'a> {
        Randomizer {
            game_data,
            settings,
        }
    }

    pub fn build_world(&self) -> Result<World> {
        let world = World::new(self.game_data, self.settings.clone())?;
        Ok(world)
    }

    /// Builds a world and fills it, checking that the result can be completed.
    pub fn fill_world(&self, attempt_num_rando: usize, seed: usize) -> Result<World> {
        let mut rng_seed = [0u8; 32];
        rng_seed[..8].copy_from_slice(&seed.to_le_bytes());
        let mut rng = rand::rngs::StdRng::from_seed(rng_seed);

        let mut world = self.build_world()?;
        let buckets = ItemBuckets::from_pool(&world, &self.game_data.item_pool)?;
        info!(
            "[attempt {attempt_num_rando}] Placing {} dungeon, {} required, {} nice, {} extra items into {} locations",
            buckets.dungeon.len(),
            buckets.required.len(),
            buckets.nice.len(),
            buckets.extra.len(),
            world.empty_locations().len()
        );
        let filler = Filler { attempt_num_rando };
        filler
            .fill(&mut world, &buckets, &mut rng)
            .with_context(|| format!("[attempt {attempt_num_rando}] Item placement failed"))?;

        let items = collect(&world, &ItemMultiset::new())?;
        if !world.check_win_condition(&items)? {
            return Err(RandoError::NotBeatable)
                .with_context(|| format!("[attempt {attempt_num_rando}] Seed not beatable"));
        }
        Ok(world)
    }

    pub fn randomize(&self, attempt_num_rando: usize, seed: usize) -> Result<Randomization> {
        let world = self.fill_world(attempt_num_rando, seed)?;
        let spoiler_log = get_spoiler_log(&world, seed)?;
        info!(
            "[attempt {attempt_num_rando}] Playthrough: {} required locations in {} rounds",
            spoiler_log.playthrough.required.len(),
            spoiler_log.playthrough.longest_item_chain
        );
        let item_placement: Vec<ItemPlacement> = world
            .placements()
            .into_iter()
            .map(|(location_id, item)| ItemPlacement {
                location_id,
                location: world.locations[location_id].name.clone(),
                item: item.name,
            })
            .collect();
        Ok(Randomization {
            seed,
            item_placement,
            spoiler_log,
        })
    }
}
