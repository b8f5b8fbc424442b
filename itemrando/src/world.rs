use hashbrown::HashMap;
use itemrando_game::{
    FillRule, GameData, Item, LocationId, LocationKind, RegionId, Requirement,
};
use itemrando_logic::ItemMultiset;
use log::debug;

use crate::errors::RandoError;
use crate::settings::RulesetConfig;

// Reference chains (canAccess -> canEnter -> ...) deeper than this are treated as cycles.
pub const MAX_PREDICATE_DEPTH: usize = 64;

#[derive(Clone, Debug)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub region_id: RegionId,
    pub kind: LocationKind,
    pub requirement: Requirement,
    pub fill_rule: FillRule,
    pub item: Option<Item>,
}

#[derive(Clone, Debug)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub location_ids: Vec<LocationId>,
    pub enter: Requirement,
    // Regions without a completion requirement are complete as soon as they are entered.
    pub complete: Option<Requirement>,
    pub region_items: Vec<String>,
}

/// One generation's world: all regions and locations in id-indexed arenas, plus the goal and
/// ruleset they are evaluated under. Requirements refer to other locations and regions by id
/// and are always evaluated against the `World` they are called on, so a clone never reads
/// its source's state.
#[derive(Clone, Debug)]
pub struct World {
    pub regions: Vec<Region>,
    pub locations: Vec<Location>,
    pub win_condition: Requirement,
    pub config: RulesetConfig,
    location_by_name: HashMap<String, LocationId>,
    item_catalogue: HashMap<String, Item>,
    restricted_items: HashMap<String, RegionId>,
}

struct EvalContext<'a> {
    world: &'a World,
    items: &'a ItemMultiset,
}

impl World {
    pub fn new(game_data: &GameData, config: RulesetConfig) -> Result<World, RandoError> {
        let goal = config.goal.to_string();
        let win_condition = game_data
            .win_conditions
            .iter()
            .find(|(g, _)| *g == goal)
            .map(|(_, req)| req.clone())
            .ok_or_else(|| RandoError::UnknownName {
                kind: "goal",
                name: goal.clone(),
            })?;

        let item_catalogue: HashMap<String, Item> = game_data
            .items
            .iter()
            .map(|item| (item.name.clone(), item.clone()))
            .collect();
        if !item_catalogue.contains_key(&config.filler_item) {
            return Err(RandoError::UnknownName {
                kind: "item",
                name: config.filler_item.clone(),
            });
        }

        let mut restricted_items: HashMap<String, RegionId> = HashMap::new();
        let mut regions: Vec<Region> = Vec::with_capacity(game_data.regions.len());
        for (region_id, region_data) in game_data.regions.iter().enumerate() {
            for item_name in &region_data.region_items {
                restricted_items.insert(item_name.clone(), region_id);
            }
            regions.push(Region {
                id: region_id,
                name: region_data.name.clone(),
                location_ids: region_data.location_ids.clone(),
                enter: region_data.enter.clone(),
                complete: region_data.complete.clone(),
                region_items: region_data.region_items.clone(),
            });
        }

        let mut locations: Vec<Location> = Vec::with_capacity(game_data.locations.len());
        let mut location_by_name: HashMap<String, LocationId> = HashMap::new();
        for (location_id, location_data) in game_data.locations.iter().enumerate() {
            let item = match &location_data.placed_item {
                Some(name) => Some(item_catalogue.get(name).cloned().ok_or_else(|| {
                    RandoError::UnknownName {
                        kind: "item",
                        name: name.clone(),
                    }
                })?),
                None => None,
            };
            location_by_name.insert(location_data.name.clone(), location_id);
            locations.push(Location {
                id: location_id,
                name: location_data.name.clone(),
                region_id: location_data.region_id,
                kind: location_data.kind,
                requirement: location_data.requirement.clone(),
                fill_rule: location_data.fill_rule.clone(),
                item,
            });
        }

        Ok(World {
            regions,
            locations,
            win_condition,
            config,
            location_by_name,
            item_catalogue,
            restricted_items,
        })
    }

    /// Independent scratch copy for analysis that must not disturb this world.
    ///
    /// Requirements address locations and regions by arena index, so the copy is checked for
    /// every location still sitting at its own index, inside a region that lists it, and under
    /// its own name.
    pub fn copy(&self) -> Result<World, RandoError> {
        let out = self.clone();
        for (idx, loc) in out.locations.iter().enumerate() {
            let in_region = out
                .regions
                .get(loc.region_id)
                .map_or(false, |r| r.location_ids.contains(&idx));
            if loc.id != idx
                || !in_region
                || out.location_by_name.get(&loc.name) != Some(&idx)
            {
                return Err(RandoError::CloneConsistency { location: idx });
            }
        }
        Ok(out)
    }

    pub fn item(&self, name: &str) -> Result<Item, RandoError> {
        self.item_catalogue
            .get(name)
            .cloned()
            .ok_or_else(|| RandoError::UnknownName {
                kind: "item",
                name: name.to_string(),
            })
    }

    pub fn filler_item(&self) -> Result<Item, RandoError> {
        self.item(&self.config.filler_item)
    }

    pub fn location_by_name(&self, name: &str) -> Option<LocationId> {
        self.location_by_name.get(name).copied()
    }

    pub fn item_at(&self, location_id: LocationId) -> Option<&Item> {
        self.locations[location_id].item.as_ref()
    }

    pub fn set_item(&mut self, location_id: LocationId, item: Option<Item>) {
        self.locations[location_id].item = item;
    }

    pub fn take_item(&mut self, location_id: LocationId) -> Option<Item> {
        self.locations[location_id].item.take()
    }

    /// Locations whose items count as collected progress (everything except event slots).
    pub fn collectable_locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|loc| loc.kind.is_collectable())
    }

    pub fn empty_locations(&self) -> Vec<LocationId> {
        self.collectable_locations()
            .filter(|loc| loc.item.is_none())
            .map(|loc| loc.id)
            .collect()
    }

    pub fn locations_with_item(&self, item_name: &str) -> Vec<LocationId> {
        self.locations
            .iter()
            .filter(|loc| loc.item.as_ref().map(|x| x.name.as_str()) == Some(item_name))
            .map(|loc| loc.id)
            .collect()
    }

    pub fn regions_with_item(&self, item_name: &str) -> Vec<RegionId> {
        let mut out: Vec<RegionId> = Vec::new();
        for location_id in self.locations_with_item(item_name) {
            let region_id = self.locations[location_id].region_id;
            if !out.contains(&region_id) {
                out.push(region_id);
            }
        }
        out
    }

    /// Final (location, item) list in location id order, for the patch writer.
    pub fn placements(&self) -> Vec<(LocationId, Item)> {
        self.locations
            .iter()
            .filter_map(|loc| loc.item.clone().map(|item| (loc.id, item)))
            .collect()
    }

    pub fn can_enter(&self, region_id: RegionId, items: &ItemMultiset) -> Result<bool, RandoError> {
        let cx = EvalContext { world: self, items };
        cx.region_enter(region_id, 0)
    }

    pub fn can_complete(
        &self,
        region_id: RegionId,
        items: &ItemMultiset,
    ) -> Result<bool, RandoError> {
        let cx = EvalContext { world: self, items };
        cx.region_complete(region_id, 0)
    }

    pub fn can_access(
        &self,
        location_id: LocationId,
        items: &ItemMultiset,
    ) -> Result<bool, RandoError> {
        let cx = EvalContext { world: self, items };
        cx.location_access(location_id, 0)
    }

    /// Region restriction and fill rule only; reachability is not considered.
    pub fn accepts_fill(
        &self,
        location_id: LocationId,
        item: &Item,
        items: &ItemMultiset,
    ) -> Result<bool, RandoError> {
        let location = &self.locations[location_id];
        if !location.kind.is_collectable() {
            return Ok(false);
        }
        if let Some(&region_id) = self.restricted_items.get(&item.name) {
            if region_id != location.region_id {
                return Ok(false);
            }
        }
        let cx = EvalContext { world: self, items };
        cx.fill_rule(&location.fill_rule, item, &location.name)
    }

    pub fn can_fill(
        &self,
        location_id: LocationId,
        item: &Item,
        items: &ItemMultiset,
    ) -> Result<bool, RandoError> {
        Ok(self.accepts_fill(location_id, item, items)? && self.can_access(location_id, items)?)
    }

    /// Places `item` into an empty location if `can_fill` allows it.
    pub fn fill(
        &mut self,
        location_id: LocationId,
        item: &Item,
        items: &ItemMultiset,
    ) -> Result<bool, RandoError> {
        if self.locations[location_id].item.is_some() || !self.can_fill(location_id, item, items)? {
            return Ok(false);
        }
        debug!(
            "Placing {} at {}",
            item.name, self.locations[location_id].name
        );
        self.locations[location_id].item = Some(item.clone());
        Ok(true)
    }

    pub fn check_win_condition(&self, items: &ItemMultiset) -> Result<bool, RandoError> {
        let cx = EvalContext { world: self, items };
        cx.requirement(&self.win_condition, "win condition", 0)
    }
}

impl<'a> EvalContext<'a> {
    fn invalid(context: &str, reason: String) -> RandoError {
        RandoError::InvalidPredicate {
            context: context.to_string(),
            reason,
        }
    }

    fn check_depth(depth: usize, context: &str) -> Result<(), RandoError> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(Self::invalid(
                context,
                format!("reference chain deeper than {}", MAX_PREDICATE_DEPTH),
            ));
        }
        Ok(())
    }

    fn region_enter(&self, region_id: RegionId, depth: usize) -> Result<bool, RandoError> {
        let Some(region) = self.world.regions.get(region_id) else {
            return Err(Self::invalid(
                "region reference",
                format!("no region with id {}", region_id),
            ));
        };
        Self::check_depth(depth, &region.name)?;
        self.requirement(&region.enter, &region.name, depth + 1)
    }

    fn region_complete(&self, region_id: RegionId, depth: usize) -> Result<bool, RandoError> {
        if !self.region_enter(region_id, depth)? {
            return Ok(false);
        }
        let region = &self.world.regions[region_id];
        match &region.complete {
            Some(req) => self.requirement(req, &region.name, depth + 1),
            None => Ok(true),
        }
    }

    fn location_access(&self, location_id: LocationId, depth: usize) -> Result<bool, RandoError> {
        let Some(location) = self.world.locations.get(location_id) else {
            return Err(Self::invalid(
                "location reference",
                format!("no location with id {}", location_id),
            ));
        };
        Self::check_depth(depth, &location.name)?;
        if !self.region_enter(location.region_id, depth + 1)? {
            return Ok(false);
        }
        if !self.requirement(&location.requirement, &location.name, depth + 1)? {
            return Ok(false);
        }
        if location.kind == LocationKind::Prize {
            return self.region_complete(location.region_id, depth + 1);
        }
        Ok(true)
    }

    fn requirement(
        &self,
        req: &Requirement,
        context: &str,
        depth: usize,
    ) -> Result<bool, RandoError> {
        let items = self.items;
        match req {
            Requirement::Free => Ok(true),
            Requirement::Never => Ok(false),
            Requirement::Item { name, count } => Ok(items.has_count(name, *count)),
            Requirement::Capability(capability) => Ok(items.can(*capability)),
            Requirement::Setting(name) => Ok(self.world.config.has_setting(name)),
            Requirement::NotSetting(name) => Ok(!self.world.config.has_setting(name)),
            Requirement::ItemCountSetting { item, key } => {
                let Some(required) = self.world.config.value(key) else {
                    return Err(Self::invalid(
                        context,
                        format!("missing ruleset value {}", key),
                    ));
                };
                Ok(items.count(item) as i64 >= required)
            }
            Requirement::ItemAt {
                location,
                items: candidates,
            } => {
                let Some(loc) = self.world.locations.get(*location) else {
                    return Err(Self::invalid(
                        context,
                        format!("no location with id {}", location),
                    ));
                };
                Ok(loc
                    .item
                    .as_ref()
                    .is_some_and(|item| candidates.contains(&item.name)))
            }
            Requirement::CanAccess(location_id) => self.location_access(*location_id, depth),
            Requirement::CanEnter(region_id) => self.region_enter(*region_id, depth),
            Requirement::CanComplete(region_id) => self.region_complete(*region_id, depth),
            Requirement::And(reqs) => {
                for r in reqs {
                    if !self.requirement(r, context, depth)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Requirement::Or(reqs) => {
                for r in reqs {
                    if self.requirement(r, context, depth)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    fn fill_rule(&self, rule: &FillRule, item: &Item, context: &str) -> Result<bool, RandoError> {
        match rule {
            FillRule::Any => Ok(true),
            FillRule::ForbidItems(names) => Ok(!names.contains(&item.name)),
            FillRule::ForbidCategories(categories) => Ok(!categories.contains(&item.category)),
            FillRule::AllowOnly(names) => Ok(names.contains(&item.name)),
            FillRule::Conditional { items, requirement } => {
                if items.contains(&item.name) {
                    self.requirement(requirement, context, 0)
                } else {
                    Ok(true)
                }
            }
            FillRule::And(rules) => {
                for r in rules {
                    if !self.fill_rule(r, item, context)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }
}
