use crate::{
    Capability, FillRule, IndexedVec, Item, ItemCategory, LocationId, LocationKind, RegionId,
    Requirement, DEFAULT_FILLER_ITEM,
};
use anyhow::{bail, ensure, Context, Result};
use json::{self, JsonValue};
use log::info;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct LocationData {
    pub name: String,
    pub region_id: RegionId,
    pub kind: LocationKind,
    pub requirement: Requirement,
    pub fill_rule: FillRule,
    pub placed_item: Option<String>, // Fixed item (prizes, events); never moved by the filler
}

#[derive(Clone, Debug)]
pub struct RegionData {
    pub name: String,
    pub enter: Requirement,
    pub complete: Option<Requirement>,
    pub region_items: Vec<String>, // Items that may only be placed inside this region
    pub location_ids: Vec<LocationId>,
}

#[derive(Default, Clone, Debug)]
pub struct ItemPool {
    pub dungeon: Vec<String>,
    pub required: Vec<String>,
    pub nice: Vec<String>,
    pub extra: Vec<String>,
}

// Parsed world definition: item catalogue, regions, locations, goals and the item pool.
// Names are resolved to ids while loading, so a World built from this never looks names up
// again except for items.
#[derive(Default, Clone, Debug)]
pub struct GameData {
    pub item_isv: IndexedVec<String>,
    pub items: Vec<Item>, // Corresponds to item_isv.keys
    pub region_isv: IndexedVec<String>,
    pub regions: Vec<RegionData>, // Corresponds to region_isv.keys
    pub location_isv: IndexedVec<String>,
    pub locations: Vec<LocationData>, // Corresponds to location_isv.keys
    pub win_conditions: Vec<(String, Requirement)>,
    pub item_pool: ItemPool,
}

fn read_json(path: &Path) -> Result<JsonValue> {
    let file = File::open(path).with_context(|| format!("unable to open {}", path.display()))?;
    let json_str = std::io::read_to_string(file)
        .with_context(|| format!("unable to read {}", path.display()))?;
    let json_data =
        json::parse(&json_str).with_context(|| format!("unable to parse {}", path.display()))?;
    Ok(json_data)
}

fn parse_name_list(json_value: &JsonValue) -> Result<Vec<String>> {
    if json_value.is_null() {
        return Ok(vec![]);
    }
    ensure!(json_value.is_array(), "expected a list of names: {}", json_value);
    let mut out: Vec<String> = Vec::new();
    for x in json_value.members() {
        let name = x
            .as_str()
            .with_context(|| format!("expected a name: {}", x))?;
        out.push(name.to_string());
    }
    Ok(out)
}

impl GameData {
    pub fn load(path: &Path) -> Result<GameData> {
        let world_json = read_json(path)?;
        let game_data = GameData::from_json(&world_json)
            .with_context(|| format!("unable to load world definition {}", path.display()))?;
        info!(
            "Loaded world definition {}: {} regions, {} locations, {} items",
            path.display(),
            game_data.regions.len(),
            game_data.locations.len(),
            game_data.items.len()
        );
        Ok(game_data)
    }

    pub fn parse(json_str: &str) -> Result<GameData> {
        let world_json = json::parse(json_str).context("unable to parse world definition")?;
        GameData::from_json(&world_json)
    }

    fn from_json(world_json: &JsonValue) -> Result<GameData> {
        let mut game_data = GameData::default();
        game_data.load_items(&world_json["items"])?;
        game_data.register_regions(&world_json["regions"])?;
        game_data.load_regions(&world_json["regions"])?;
        game_data.load_win_conditions(&world_json["winConditions"])?;
        game_data.load_item_pool(&world_json["itemPool"])?;
        Ok(game_data)
    }

    pub fn get_item(&self, name: &str) -> Option<&Item> {
        self.item_isv
            .index_by_key
            .get(name)
            .map(|&idx| &self.items[idx])
    }

    fn load_items(&mut self, items_json: &JsonValue) -> Result<()> {
        ensure!(items_json.is_array(), "\"items\" must be a list");
        for item_json in items_json.members() {
            let name = item_json["name"]
                .as_str()
                .with_context(|| format!("item without a name: {}", item_json))?;
            let category_str = item_json["category"].as_str().unwrap_or("Unique");
            let category = ItemCategory::from_str(category_str)
                .with_context(|| format!("unknown category {} for item {}", category_str, name))?;
            if self.item_isv.index_by_key.contains_key(name) {
                bail!("duplicate item {}", name);
            }
            self.item_isv.add(name);
            self.items.push(Item {
                name: name.to_string(),
                category,
                tier: item_json["tier"].as_u8(),
                nice_name: item_json["niceName"].as_str().map(|x| x.to_string()),
            });
        }
        if !self.item_isv.index_by_key.contains_key(DEFAULT_FILLER_ITEM) {
            self.item_isv.add(DEFAULT_FILLER_ITEM);
            self.items
                .push(Item::new(DEFAULT_FILLER_ITEM, ItemCategory::Junk));
        }
        Ok(())
    }

    // Location and region names are registered up front so that requirements can refer to
    // locations defined later in the file.
    fn register_regions(&mut self, regions_json: &JsonValue) -> Result<()> {
        ensure!(regions_json.is_array(), "\"regions\" must be a list");
        for region_json in regions_json.members() {
            let region_name = region_json["name"]
                .as_str()
                .with_context(|| format!("region without a name: {}", region_json))?;
            if self.region_isv.index_by_key.contains_key(region_name) {
                bail!("duplicate region {}", region_name);
            }
            self.region_isv.add(region_name);
            for location_json in region_json["locations"].members() {
                let location_name = location_json["name"].as_str().with_context(|| {
                    format!("location without a name in region {}", region_name)
                })?;
                if self.location_isv.index_by_key.contains_key(location_name) {
                    bail!("duplicate location {}", location_name);
                }
                self.location_isv.add(location_name);
            }
        }
        Ok(())
    }

    fn load_regions(&mut self, regions_json: &JsonValue) -> Result<()> {
        for (region_id, region_json) in regions_json.members().enumerate() {
            let region_name = self.region_isv.keys[region_id].clone();
            let enter = self
                .parse_optional_requirement(&region_json["enter"])
                .with_context(|| format!("entry requirement of region {}", region_name))?;
            let complete = if region_json["complete"].is_null() {
                None
            } else {
                Some(
                    self.parse_requirement(&region_json["complete"])
                        .with_context(|| {
                            format!("completion requirement of region {}", region_name)
                        })?,
                )
            };
            let region_items = parse_name_list(&region_json["regionItems"])?;
            for item_name in &region_items {
                self.check_item_name(item_name)?;
            }

            let mut location_ids: Vec<LocationId> = Vec::new();
            for location_json in region_json["locations"].members() {
                let location_name = location_json["name"].as_str().unwrap_or_default();
                let location = self
                    .parse_location(location_json, region_id)
                    .with_context(|| format!("location {}", location_name))?;
                location_ids.push(self.locations.len());
                self.locations.push(location);
            }
            self.regions.push(RegionData {
                name: region_name,
                enter,
                complete,
                region_items,
                location_ids,
            });
        }
        Ok(())
    }

    fn parse_location(&self, location_json: &JsonValue, region_id: RegionId) -> Result<LocationData> {
        let name = location_json["name"].as_str().unwrap_or_default().to_string();
        let kind = match location_json["kind"].as_str() {
            Some(s) => LocationKind::from_str(s)
                .with_context(|| format!("unknown location kind {}", s))?,
            None => LocationKind::Standard,
        };
        let requirement = self.parse_optional_requirement(&location_json["requires"])?;
        let fill_rule = if location_json["fillRules"].is_null() {
            FillRule::Any
        } else {
            self.parse_fill_rule(&location_json["fillRules"])?
        };
        let placed_item = match location_json["item"].as_str() {
            Some(item_name) => {
                self.check_item_name(item_name)?;
                Some(item_name.to_string())
            }
            None => None,
        };
        if kind == LocationKind::Event && placed_item.is_none() {
            bail!("event location {} must have a fixed item", name);
        }
        Ok(LocationData {
            name,
            region_id,
            kind,
            requirement,
            fill_rule,
            placed_item,
        })
    }

    fn check_item_name(&self, item_name: &str) -> Result<()> {
        if !self.item_isv.index_by_key.contains_key(item_name) {
            bail!("unknown item {}", item_name);
        }
        Ok(())
    }

    fn location_id(&self, name: &str) -> Result<LocationId> {
        self.location_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("unknown location {}", name))
    }

    fn region_id(&self, name: &str) -> Result<RegionId> {
        self.region_isv
            .index_by_key
            .get(name)
            .copied()
            .with_context(|| format!("unknown region {}", name))
    }

    fn parse_optional_requirement(&self, req_json: &JsonValue) -> Result<Requirement> {
        if req_json.is_null() {
            Ok(Requirement::Free)
        } else {
            self.parse_requirement(req_json)
        }
    }

    fn parse_requirement_list(&self, req_json: &JsonValue) -> Result<Vec<Requirement>> {
        ensure!(req_json.is_array(), "expected a list of requirements: {}", req_json);
        let mut reqs: Vec<Requirement> = Vec::new();
        for r in req_json.members() {
            reqs.push(self.parse_requirement(r)?);
        }
        Ok(reqs)
    }

    pub fn parse_requirement(&self, req_json: &JsonValue) -> Result<Requirement> {
        if let Some(value) = req_json.as_str() {
            if value == "free" {
                return Ok(Requirement::Free);
            } else if value == "never" {
                return Ok(Requirement::Never);
            }
            self.check_item_name(value)?;
            return Ok(Requirement::item(value));
        }
        if req_json.is_array() {
            // A bare list is shorthand for "and".
            return Ok(Requirement::make_and(self.parse_requirement_list(req_json)?));
        }
        ensure!(
            req_json.is_object() && req_json.len() == 1,
            "unrecognized requirement: {}",
            req_json
        );
        let (key, value) = req_json
            .entries()
            .next()
            .context("empty requirement object")?;
        match key {
            "and" => Ok(Requirement::make_and(self.parse_requirement_list(value)?)),
            "or" => Ok(Requirement::make_or(self.parse_requirement_list(value)?)),
            "has" => {
                let name = value["item"]
                    .as_str()
                    .with_context(|| format!("\"has\" without an item: {}", value))?;
                self.check_item_name(name)?;
                Ok(Requirement::Item {
                    name: name.to_string(),
                    count: value["count"].as_usize().unwrap_or(1),
                })
            }
            "can" => {
                let capability_str = value
                    .as_str()
                    .with_context(|| format!("\"can\" expects a capability name: {}", value))?;
                let capability = Capability::from_str(capability_str)
                    .with_context(|| format!("unknown capability {}", capability_str))?;
                Ok(Requirement::Capability(capability))
            }
            "setting" => Ok(Requirement::Setting(
                value
                    .as_str()
                    .with_context(|| format!("\"setting\" expects a name: {}", value))?
                    .to_string(),
            )),
            "notSetting" => Ok(Requirement::NotSetting(
                value
                    .as_str()
                    .with_context(|| format!("\"notSetting\" expects a name: {}", value))?
                    .to_string(),
            )),
            "itemCountSetting" => {
                let item = value["item"]
                    .as_str()
                    .with_context(|| format!("\"itemCountSetting\" without an item: {}", value))?;
                self.check_item_name(item)?;
                let setting_key = value["key"]
                    .as_str()
                    .with_context(|| format!("\"itemCountSetting\" without a key: {}", value))?;
                Ok(Requirement::ItemCountSetting {
                    item: item.to_string(),
                    key: setting_key.to_string(),
                })
            }
            "itemAt" => {
                let location_name = value["location"]
                    .as_str()
                    .with_context(|| format!("\"itemAt\" without a location: {}", value))?;
                let items = parse_name_list(&value["items"])?;
                for item_name in &items {
                    self.check_item_name(item_name)?;
                }
                Ok(Requirement::ItemAt {
                    location: self.location_id(location_name)?,
                    items,
                })
            }
            "canAccess" => Ok(Requirement::CanAccess(self.location_id(
                value
                    .as_str()
                    .with_context(|| format!("\"canAccess\" expects a location: {}", value))?,
            )?)),
            "canEnter" => Ok(Requirement::CanEnter(self.region_id(
                value
                    .as_str()
                    .with_context(|| format!("\"canEnter\" expects a region: {}", value))?,
            )?)),
            "canComplete" => Ok(Requirement::CanComplete(self.region_id(
                value
                    .as_str()
                    .with_context(|| format!("\"canComplete\" expects a region: {}", value))?,
            )?)),
            _ => bail!("unrecognized requirement key {}", key),
        }
    }

    pub fn parse_fill_rule(&self, rule_json: &JsonValue) -> Result<FillRule> {
        if rule_json.is_array() {
            let mut rules: Vec<FillRule> = Vec::new();
            for r in rule_json.members() {
                rules.push(self.parse_fill_rule(r)?);
            }
            return Ok(FillRule::And(rules));
        }
        ensure!(
            rule_json.is_object() && rule_json.len() == 1,
            "unrecognized fill rule: {}",
            rule_json
        );
        let (key, value) = rule_json
            .entries()
            .next()
            .context("empty fill rule object")?;
        match key {
            "forbid" => {
                let items = parse_name_list(value)?;
                for item_name in &items {
                    self.check_item_name(item_name)?;
                }
                Ok(FillRule::ForbidItems(items))
            }
            "forbidCategories" => {
                let mut categories: Vec<ItemCategory> = Vec::new();
                for category_str in parse_name_list(value)? {
                    categories.push(
                        ItemCategory::from_str(&category_str)
                            .with_context(|| format!("unknown category {}", category_str))?,
                    );
                }
                Ok(FillRule::ForbidCategories(categories))
            }
            "allowOnly" => {
                let items = parse_name_list(value)?;
                for item_name in &items {
                    self.check_item_name(item_name)?;
                }
                Ok(FillRule::AllowOnly(items))
            }
            "when" => {
                let items = parse_name_list(&value["items"])?;
                for item_name in &items {
                    self.check_item_name(item_name)?;
                }
                Ok(FillRule::Conditional {
                    items,
                    requirement: self.parse_requirement(&value["requires"])?,
                })
            }
            _ => bail!("unrecognized fill rule key {}", key),
        }
    }

    fn load_win_conditions(&mut self, win_json: &JsonValue) -> Result<()> {
        ensure!(win_json.is_object(), "\"winConditions\" must be an object");
        for (goal, req_json) in win_json.entries() {
            let req = self
                .parse_requirement(req_json)
                .with_context(|| format!("win condition for goal {}", goal))?;
            self.win_conditions.push((goal.to_string(), req));
        }
        Ok(())
    }

    fn parse_pool_bucket(&self, bucket_json: &JsonValue) -> Result<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for entry in bucket_json.members() {
            let (name, count) = if let Some(name) = entry.as_str() {
                (name, 1)
            } else {
                let name = entry["item"]
                    .as_str()
                    .with_context(|| format!("pool entry without an item: {}", entry))?;
                (name, entry["count"].as_usize().unwrap_or(1))
            };
            self.check_item_name(name)?;
            for _ in 0..count {
                out.push(name.to_string());
            }
        }
        Ok(out)
    }

    fn load_item_pool(&mut self, pool_json: &JsonValue) -> Result<()> {
        self.item_pool = ItemPool {
            dungeon: self
                .parse_pool_bucket(&pool_json["dungeon"])
                .context("dungeon item pool")?,
            required: self
                .parse_pool_bucket(&pool_json["required"])
                .context("required item pool")?,
            nice: self
                .parse_pool_bucket(&pool_json["nice"])
                .context("nice item pool")?,
            extra: self
                .parse_pool_bucket(&pool_json["extra"])
                .context("extra item pool")?,
        };
        Ok(())
    }
}
