use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use itemrando_game::DEFAULT_FILLER_ITEM;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, VariantNames};

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, EnumString, VariantNames, Display,
)]
pub enum LogicMode {
    NoMajorGlitches,
    OverworldGlitches,
    MajorGlitches,
}

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, EnumString, VariantNames, Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Goal {
    Ganon,
    Dungeons,
    Pedestal,
    TriforceHunt,
}

#[derive(
    Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq, EnumString, VariantNames, Display,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Expert,
}

/// The ruleset a world is built for. Consulted by every requirement evaluation through the
/// world, never through global state.
///
/// Flags and values use ordered maps so serialized settings are stable.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RulesetConfig {
    pub difficulty: Difficulty,
    pub logic: LogicMode,
    pub goal: Goal,
    #[serde(default = "default_variation")]
    pub variation: String,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default = "default_values")]
    pub values: BTreeMap<String, i64>,
    #[serde(default = "default_filler_item")]
    pub filler_item: String,
}

fn default_variation() -> String {
    "none".to_string()
}

fn default_filler_item() -> String {
    DEFAULT_FILLER_ITEM.to_string()
}

// Triforce hunt reads its piece count from here.
fn default_values() -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();
    values.insert("goalRequired".to_string(), 20);
    values
}

impl Default for RulesetConfig {
    fn default() -> Self {
        RulesetConfig {
            difficulty: Difficulty::Normal,
            logic: LogicMode::NoMajorGlitches,
            goal: Goal::Ganon,
            variation: default_variation(),
            flags: BTreeMap::new(),
            values: default_values(),
            filler_item: default_filler_item(),
        }
    }
}

impl RulesetConfig {
    pub fn load(path: &Path) -> Result<RulesetConfig> {
        let settings_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        parse_ruleset_config(&settings_str)
            .with_context(|| format!("unable to parse settings {}", path.display()))
    }

    /// True for an enabled flag, or when `name` matches the logic mode, difficulty, goal or
    /// variation in effect.
    pub fn has_setting(&self, name: &str) -> bool {
        if let Some(&enabled) = self.flags.get(name) {
            return enabled;
        }
        name == self.logic.to_string()
            || name == self.difficulty.to_string()
            || name == self.goal.to_string()
            || name == self.variation
    }

    pub fn value(&self, key: &str) -> Option<i64> {
        self.values.get(key).copied()
    }
}

pub fn parse_ruleset_config(settings_json: &str) -> Result<RulesetConfig> {
    let settings: RulesetConfig = serde_json::from_str(settings_json)?;
    Ok(settings)
}
