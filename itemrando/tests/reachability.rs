use itemrando::settings::RulesetConfig;
use itemrando::traverse::{collect, collect_with_rounds, reachable_locations, spheres};
use itemrando::world::World;
use itemrando_game::GameData;
use itemrando_logic::ItemMultiset;
use proptest::prelude::*;
use serde_json::{json, Value};

const NUM_ITEMS: usize = 5;

// Per location: items it requires, the item it holds, and whether it also requires access to
// the previous location.
type LocationShape = (Vec<usize>, Option<usize>, bool);

fn item_name(i: usize) -> String {
    format!("I{i}")
}

fn build_world(shape: &[LocationShape]) -> World {
    let items: Vec<Value> = (0..NUM_ITEMS)
        .map(|i| json!({"name": item_name(i)}))
        .collect();
    let locations: Vec<Value> = shape
        .iter()
        .enumerate()
        .map(|(i, (reqs, held, prev))| {
            let mut all: Vec<Value> = reqs.iter().map(|&r| json!(item_name(r))).collect();
            if *prev && i > 0 {
                all.push(json!({"canAccess": format!("L{}", i - 1)}));
            }
            let mut loc = json!({"name": format!("L{i}"), "requires": all});
            if let Some(h) = held {
                loc["item"] = json!(item_name(*h));
            }
            loc
        })
        .collect();
    let world_json = json!({
        "items": items,
        "regions": [{"name": "R", "locations": locations}],
        "winConditions": {"ganon": "free"},
        "itemPool": {}
    });
    let game_data = GameData::parse(&world_json.to_string()).unwrap();
    World::new(&game_data, RulesetConfig::default()).unwrap()
}

fn items(indices: &[usize]) -> ItemMultiset {
    let names: Vec<String> = indices.iter().map(|&i| item_name(i)).collect();
    ItemMultiset::from_names(&names)
}

fn world_shape() -> impl Strategy<Value = Vec<LocationShape>> {
    prop::collection::vec(
        (
            prop::collection::vec(0..NUM_ITEMS, 0..3),
            prop::option::of(0..NUM_ITEMS),
            any::<bool>(),
        ),
        1..10,
    )
}

fn item_set() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..NUM_ITEMS, 0..4)
}

proptest! {
    #[test]
    fn access_is_monotonic(shape in world_shape(), a in item_set(), extra in item_set()) {
        let world = build_world(&shape);
        let small = items(&a);
        let large = small.merge(&items(&extra));
        for loc in world.collectable_locations() {
            if world.can_access(loc.id, &small)? {
                prop_assert!(world.can_access(loc.id, &large)?);
            }
        }
        prop_assert!(collect(&world, &small)?.is_subset_of(&collect(&world, &large)?));
    }

    #[test]
    fn collect_is_idempotent(shape in world_shape(), seed in item_set()) {
        let world = build_world(&shape);
        let once = collect(&world, &items(&seed))?;
        let twice = collect(&world, &once)?;
        // Seed items count as extra copies, so compare what they unlock.
        prop_assert_eq!(once.names_sorted(), twice.names_sorted());
        prop_assert_eq!(
            reachable_locations(&world, &once)?,
            reachable_locations(&world, &twice)?
        );
    }

    #[test]
    fn fixpoints_terminate_within_bound(shape in world_shape()) {
        let world = build_world(&shape);
        let (_, rounds) = collect_with_rounds(&world, &ItemMultiset::new())?;
        prop_assert!(rounds <= world.locations.len());
        prop_assert!(spheres(&world)?.len() <= world.locations.len());
    }

    #[test]
    fn spheres_partition_reachable_set(shape in world_shape()) {
        let world = build_world(&shape);
        let layers = spheres(&world)?;
        let mut seen = vec![false; world.locations.len()];
        for sphere in &layers {
            prop_assert!(!sphere.is_empty());
            for &id in sphere {
                prop_assert!(!seen[id]);
                seen[id] = true;
            }
        }
        let mut union: Vec<usize> = layers.concat();
        union.sort();
        let all_items = collect(&world, &ItemMultiset::new())?;
        prop_assert_eq!(union, reachable_locations(&world, &all_items)?);
    }
}
