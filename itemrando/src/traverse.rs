use itemrando_game::LocationId;
use itemrando_logic::ItemMultiset;
use log::debug;

use crate::errors::RandoError;
use crate::world::World;

/// Everything obtainable starting from `seed_items`: repeatedly folds in the items of every
/// accessible, not yet collected location until a pass finds nothing new.
pub fn collect(world: &World, seed_items: &ItemMultiset) -> Result<ItemMultiset, RandoError> {
    Ok(collect_with_rounds(world, seed_items)?.0)
}

/// Same as `collect`, also returning the number of passes that found new items.
pub fn collect_with_rounds(
    world: &World,
    seed_items: &ItemMultiset,
) -> Result<(ItemMultiset, usize), RandoError> {
    let mut items = seed_items.clone();
    let mut collected = vec![false; world.locations.len()];
    let mut rounds = 0;
    loop {
        let mut found: Vec<LocationId> = Vec::new();
        for loc in world.collectable_locations() {
            if collected[loc.id] || loc.item.is_none() {
                continue;
            }
            if world.can_access(loc.id, &items)? {
                found.push(loc.id);
            }
        }
        if found.is_empty() {
            break;
        }
        rounds += 1;
        for location_id in found {
            collected[location_id] = true;
            if let Some(item) = world.item_at(location_id) {
                items.add(item);
            }
        }
    }
    Ok((items, rounds))
}

/// Layers every reachable location by the number of collection passes needed to reach it.
/// Spheres are disjoint and together cover exactly the locations `collect` can reach.
pub fn spheres(world: &World) -> Result<Vec<Vec<LocationId>>, RandoError> {
    let mut items = ItemMultiset::new();
    let mut assigned = vec![false; world.locations.len()];
    let mut out: Vec<Vec<LocationId>> = Vec::new();
    loop {
        let mut sphere: Vec<LocationId> = Vec::new();
        for loc in world.collectable_locations() {
            if !assigned[loc.id] && world.can_access(loc.id, &items)? {
                sphere.push(loc.id);
            }
        }
        if sphere.is_empty() {
            break;
        }
        for &location_id in &sphere {
            assigned[location_id] = true;
            if let Some(item) = world.item_at(location_id) {
                items.add(item);
            }
        }
        debug!("Sphere {}: {} locations", out.len() + 1, sphere.len());
        out.push(sphere);
    }
    Ok(out)
}

pub fn reachable_locations(
    world: &World,
    items: &ItemMultiset,
) -> Result<Vec<LocationId>, RandoError> {
    let mut out: Vec<LocationId> = Vec::new();
    for loc in world.collectable_locations() {
        if world.can_access(loc.id, items)? {
            out.push(loc.id);
        }
    }
    Ok(out)
}

pub fn reachable_empty_locations(
    world: &World,
    items: &ItemMultiset,
) -> Result<Vec<LocationId>, RandoError> {
    let mut out: Vec<LocationId> = Vec::new();
    for loc in world.collectable_locations() {
        if loc.item.is_none() && world.can_access(loc.id, items)? {
            out.push(loc.id);
        }
    }
    Ok(out)
}
