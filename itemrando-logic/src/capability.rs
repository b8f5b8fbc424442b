use crate::ItemMultiset;
use itemrando_game::Capability;

impl ItemMultiset {
    fn has_any(&self, names: &[&str]) -> bool {
        names.iter().any(|name| self.has(name))
    }

    pub fn can(&self, capability: Capability) -> bool {
        match capability {
            Capability::LiftRocks => {
                self.has_any(&["PowerGlove", "ProgressiveGlove", "TitansMitt"])
            }
            Capability::LiftDarkRocks => {
                self.has("TitansMitt") || self.has_count("ProgressiveGlove", 2)
            }
            Capability::LightTorches => self.has_any(&["FireRod", "Lamp"]),
            Capability::MeltThings => {
                self.has("FireRod") || (self.has("Bombos") && self.can(Capability::HasSword))
            }
            Capability::Fly => self.has_any(&["OcarinaActive", "OcarinaInactive"]),
            Capability::SpinSpeed => {
                self.has("PegasusBoots")
                    && (self.can(Capability::HasSword) || self.has("Hookshot"))
            }
            Capability::ShootArrows => self.has_any(&[
                "Bow",
                "BowAndArrows",
                "BowAndSilverArrows",
                "ProgressiveBow",
            ]),
            Capability::HasSword => {
                self.has_any(&["L1Sword", "L1SwordAndShield", "ProgressiveSword"])
                    || self.can(Capability::HasUpgradedSword)
            }
            Capability::HasUpgradedSword => {
                self.has_any(&["L2Sword", "MasterSword", "L3Sword", "L4Sword"])
                    || self.has_count("ProgressiveSword", 2)
            }
            // Every bottle variant counts.
            Capability::HasABottle => self.iter().any(|(name, _)| name.starts_with("Bottle")),
            Capability::ExtendMagic => {
                self.has_any(&["HalfMagic", "QuarterMagic"]) || self.can(Capability::HasABottle)
            }
            Capability::BlockLasers => {
                self.has("MirrorShield") || self.has_count("ProgressiveShield", 3)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strum::VariantNames;

    const NAMES: &[&str] = &[
        "ProgressiveSword",
        "ProgressiveGlove",
        "ProgressiveShield",
        "PowerGlove",
        "TitansMitt",
        "FireRod",
        "Lamp",
        "Bombos",
        "PegasusBoots",
        "Hookshot",
        "Bow",
        "BottleWithBee",
        "HalfMagic",
        "MirrorShield",
        "OcarinaInactive",
        "MasterSword",
    ];

    fn all_capabilities() -> Vec<Capability> {
        Capability::VARIANTS
            .iter()
            .map(|name| name.parse::<Capability>().unwrap())
            .collect()
    }

    #[test]
    fn progressive_tiers() {
        let one = ItemMultiset::from_names(&["ProgressiveSword"]);
        let two = ItemMultiset::from_names(&["ProgressiveSword", "ProgressiveSword"]);
        assert!(one.can(Capability::HasSword));
        assert!(!one.can(Capability::HasUpgradedSword));
        assert!(two.can(Capability::HasUpgradedSword));

        let glove = ItemMultiset::from_names(&["ProgressiveGlove"]);
        assert!(glove.can(Capability::LiftRocks));
        assert!(!glove.can(Capability::LiftDarkRocks));
    }

    #[test]
    fn bottle_variants() {
        let items = ItemMultiset::from_names(&["BottleWithGoldBee"]);
        assert!(items.can(Capability::HasABottle));
        assert!(items.can(Capability::ExtendMagic));
        assert!(!ItemMultiset::new().can(Capability::HasABottle));
    }

    proptest! {
        #[test]
        fn capabilities_are_monotonic(
            base in prop::collection::vec(0..NAMES.len(), 0..8),
            extra in prop::collection::vec(0..NAMES.len(), 0..8),
        ) {
            let small = ItemMultiset::from_names(&base.iter().map(|&i| NAMES[i]).collect::<Vec<_>>());
            let large = small.merge(&ItemMultiset::from_names(
                &extra.iter().map(|&i| NAMES[i]).collect::<Vec<_>>(),
            ));
            for capability in all_capabilities() {
                if small.can(capability) {
                    prop_assert!(large.can(capability), "{} lost", capability);
                }
            }
        }
    }
}
