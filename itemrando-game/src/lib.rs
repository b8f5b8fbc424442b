
pub mod definition;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::borrow::ToOwned;
use std::hash::{Hash, Hasher};
use strum_macros::{Display, EnumString, VariantNames};

pub use definition::{GameData, ItemPool, LocationData, RegionData};

pub type LocationId = usize; // Index into GameData.locations (and World.locations)
pub type RegionId = usize; // Index into GameData.regions (and World.regions)

// Item placed into any location still empty once every bucket has been placed.
pub const DEFAULT_FILLER_ITEM: &str = "Nothing";

#[derive(Default, Clone, Debug)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    Display,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
pub enum ItemCategory {
    Unique,
    Progressive,
    Key,
    BigKey,
    Map,
    Compass,
    Consumable,
    Junk,
}

impl ItemCategory {
    /// Items of these categories are never considered part of a playthrough.
    pub fn is_never_required(self) -> bool {
        matches!(
            self,
            ItemCategory::Map
                | ItemCategory::Compass
                | ItemCategory::Consumable
                | ItemCategory::Junk
        )
    }
}

/// An item value. Two items are the same item when their names match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub category: ItemCategory,
    pub tier: Option<u8>,
    pub nice_name: Option<String>,
}

impl Item {
    pub fn new(name: &str, category: ItemCategory) -> Self {
        Item {
            name: name.to_string(),
            category,
            tier: None,
            nice_name: None,
        }
    }

    pub fn nice_name(&self) -> &str {
        self.nice_name.as_deref().unwrap_or(&self.name)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Display, Serialize, Deserialize,
)]
pub enum LocationKind {
    Standard,
    // Access additionally requires completing the owning region (boss prizes).
    Prize,
    // Fixed configuration slot inspected by other requirements; never collected or filled.
    Event,
}

impl LocationKind {
    pub fn is_collectable(self) -> bool {
        self != LocationKind::Event
    }
}

/// Named capability queries answered from item counts.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, EnumString, VariantNames, Display, Serialize, Deserialize,
)]
pub enum Capability {
    LiftRocks,
    LiftDarkRocks,
    LightTorches,
    MeltThings,
    Fly,
    SpinSpeed,
    ShootArrows,
    HasSword,
    HasUpgradedSword,
    HasABottle,
    ExtendMagic,
    BlockLasers,
}

// Requirements only ever ask for more items, never fewer, so access is monotonic in the
// collected items. Settings are fixed for the lifetime of a world, so NotSetting is safe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Requirement {
    Free,
    Never,
    Item { name: String, count: usize },
    Capability(Capability),
    Setting(String),
    NotSetting(String),
    ItemCountSetting { item: String, key: String },
    ItemAt { location: LocationId, items: Vec<String> },
    CanAccess(LocationId),
    CanEnter(RegionId),
    CanComplete(RegionId),
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn item(name: &str) -> Requirement {
        Requirement::Item {
            name: name.to_string(),
            count: 1,
        }
    }

    pub fn make_and(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                return Requirement::Never;
            } else if let Requirement::Free = req {
                continue;
            } else if let Requirement::And(and_reqs) = req {
                out_reqs.extend(and_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        match out_reqs.len() {
            0 => Requirement::Free,
            1 => out_reqs.remove(0),
            _ => Requirement::And(out_reqs),
        }
    }

    pub fn make_or(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                continue;
            } else if let Requirement::Free = req {
                return Requirement::Free;
            } else if let Requirement::Or(or_reqs) = req {
                out_reqs.extend(or_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        match out_reqs.len() {
            0 => Requirement::Never,
            1 => out_reqs.remove(0),
            _ => Requirement::Or(out_reqs),
        }
    }
}

/// Restrictions on which items a location accepts, independent of whether it can be reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FillRule {
    Any,
    ForbidItems(Vec<String>),
    ForbidCategories(Vec<ItemCategory>),
    AllowOnly(Vec<String>),
    // Placing one of `items` here is only allowed while `requirement` holds.
    Conditional {
        items: Vec<String>,
        requirement: Requirement,
    },
    And(Vec<FillRule>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_and_flattens() {
        let req = Requirement::make_and(vec![
            Requirement::Free,
            Requirement::And(vec![Requirement::item("A"), Requirement::item("B")]),
        ]);
        assert_eq!(
            req,
            Requirement::And(vec![Requirement::item("A"), Requirement::item("B")])
        );
        assert_eq!(
            Requirement::make_or(vec![Requirement::Never, Requirement::Free]),
            Requirement::Free
        );
    }
}
