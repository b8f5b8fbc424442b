use std::collections::BTreeMap;

use itemrando_game::{LocationId, RegionId};
use itemrando_logic::ItemMultiset;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::RandoError;
use crate::traverse::{collect, spheres};
use crate::world::World;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerLocation {
    pub location_id: LocationId,
    pub location: String,
    pub item: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerRegion {
    pub region: String,
    pub locations: Vec<SpoilerLocation>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerRound {
    pub round: usize,
    pub regions: Vec<SpoilerRegion>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Playthrough {
    // In collection order.
    pub required: Vec<SpoilerLocation>,
    pub rounds: Vec<SpoilerRound>,
    pub longest_item_chain: usize,
    pub regions_visited: usize,
}

impl Playthrough {
    pub fn required_location_ids(&self) -> Vec<LocationId> {
        self.required.iter().map(|x| x.location_id).collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SpoilerLog {
    pub seed: usize,
    pub logic: String,
    pub goal: String,
    pub difficulty: String,
    pub variation: String,
    pub regions: Vec<SpoilerRegion>,
    pub playthrough: Playthrough,
}

fn spoiler_location(world: &World, location_id: LocationId) -> SpoilerLocation {
    let location = &world.locations[location_id];
    SpoilerLocation {
        location_id,
        location: location.name.clone(),
        item: location
            .item
            .as_ref()
            .map(|x| x.nice_name().to_string())
            .unwrap_or_default(),
    }
}

// Groups locations by region, keeping regions in the order they first appear.
fn group_by_region(world: &World, location_ids: &[LocationId]) -> Vec<SpoilerRegion> {
    let mut order: Vec<RegionId> = Vec::new();
    let mut grouped: Vec<Vec<SpoilerLocation>> = Vec::new();
    for &location_id in location_ids {
        let region_id = world.locations[location_id].region_id;
        let idx = match order.iter().position(|&r| r == region_id) {
            Some(idx) => idx,
            None => {
                order.push(region_id);
                grouped.push(Vec::new());
                order.len() - 1
            }
        };
        grouped[idx].push(spoiler_location(world, location_id));
    }
    order
        .into_iter()
        .zip(grouped)
        .map(|(region_id, locations)| SpoilerRegion {
            region: world.regions[region_id].name.clone(),
            locations,
        })
        .collect()
}

/// Reduces a filled world to the placements needed to win and the order to collect them in.
///
/// Works on a copy: walking spheres from deepest to shallowest, each item is removed and kept
/// out if the goal stays reachable and every required location found so far in a deeper
/// sphere can still be reached without the items of that sphere and beyond. The surviving
/// placements are then collected round by round from nothing.
pub fn get_playthrough(world: &World) -> Result<Playthrough, RandoError> {
    let mut shadow = world.copy()?;
    let spheres = spheres(&shadow)?;
    let no_items = ItemMultiset::new();
    let mut required_by_sphere: BTreeMap<usize, Vec<LocationId>> = BTreeMap::new();

    for (level, sphere) in spheres.iter().enumerate().rev() {
        for &location_id in sphere {
            let Some(item) = shadow.take_item(location_id) else {
                continue;
            };
            if item.category.is_never_required() {
                continue;
            }
            let items = collect(&shadow, &no_items)?;
            let mut required = !shadow.check_win_condition(&items)?;

            if !required {
                for (&deeper, deeper_required) in required_by_sphere.range(level + 1..).rev() {
                    let mut removed = Vec::new();
                    for locs in required_by_sphere.range(deeper..).map(|(_, locs)| locs) {
                        for &l in locs {
                            if let Some(x) = shadow.take_item(l) {
                                removed.push((l, x));
                            }
                        }
                    }
                    let items = collect(&shadow, &no_items)?;
                    let mut reachable = true;
                    for &l in deeper_required {
                        if !shadow.can_access(l, &items)? {
                            reachable = false;
                            break;
                        }
                    }
                    for (l, x) in removed {
                        shadow.set_item(l, Some(x));
                    }
                    if !reachable {
                        debug!(
                            "{} in sphere {} needed to reach sphere {}",
                            item.name,
                            level + 1,
                            deeper + 1
                        );
                        required = true;
                        break;
                    }
                }
            }

            if required {
                shadow.set_item(location_id, Some(item));
                required_by_sphere.entry(level).or_default().push(location_id);
            }
        }
    }

    // Only required placements are left in the shadow world; collect them round by round.
    let mut my_items = ItemMultiset::new();
    let mut visited = vec![false; shadow.locations.len()];
    let mut round_locations: Vec<Vec<LocationId>> = Vec::new();
    loop {
        let mut found = my_items.clone();
        let mut round: Vec<LocationId> = Vec::new();
        for loc in shadow.collectable_locations() {
            if visited[loc.id] || loc.item.is_none() {
                continue;
            }
            if shadow.can_access(loc.id, &my_items)? {
                round.push(loc.id);
            }
        }
        for &location_id in &round {
            visited[location_id] = true;
            if let Some(item) = shadow.item_at(location_id) {
                found.add(item);
            }
        }
        if found.diff(&my_items).is_empty() {
            break;
        }
        round_locations.push(round);
        my_items = found;
    }

    let mut rounds: Vec<SpoilerRound> = Vec::new();
    let mut required: Vec<SpoilerLocation> = Vec::new();
    let mut regions_visited = 0;
    for (i, round) in round_locations.iter().enumerate() {
        let regions = group_by_region(&shadow, round);
        regions_visited += regions.len();
        required.extend(round.iter().map(|&l| spoiler_location(&shadow, l)));
        rounds.push(SpoilerRound {
            round: i + 1,
            regions,
        });
    }
    Ok(Playthrough {
        required,
        longest_item_chain: rounds.len(),
        rounds,
        regions_visited,
    })
}

pub fn get_spoiler_log(world: &World, seed: usize) -> Result<SpoilerLog, RandoError> {
    let playthrough = get_playthrough(world)?;
    let placed: Vec<LocationId> = world
        .locations
        .iter()
        .filter(|loc| loc.item.is_some())
        .map(|loc| loc.id)
        .collect();
    Ok(SpoilerLog {
        seed,
        logic: world.config.logic.to_string(),
        goal: world.config.goal.to_string(),
        difficulty: world.config.difficulty.to_string(),
        variation: world.config.variation.clone(),
        regions: group_by_region(world, &placed),
        playthrough,
    })
}
