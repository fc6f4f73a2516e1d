//! Validation hash over a set of generated worlds.
//!
//! Two clients that claim to play "the same seed" compare these fingerprints;
//! any difference is an unrecoverable desync.

use crate::world::World;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-bit FNV-1a over the UTF-8 bytes of `input`.
pub fn fnv1a(input: &str) -> u32 {
    input.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Compute the validation hash of `worlds`.
///
/// Four strings are built, one per assignment kind (items at locations,
/// rewards, bosses, prerequisites). Entries are ordered by world id, then by
/// location id or region name, and joined with `,`. Each string is hashed
/// with [`fnv1a`] and the four hashes are concatenated as 8-digit lowercase
/// hex. The input order of `worlds` does not matter.
pub fn validation_hash(worlds: &[World]) -> String {
    let mut items: Vec<_> = worlds
        .iter()
        .flat_map(|world| world.locations().map(move |location| (world.id, location.id, location.item.item)))
        .collect();
    items.sort_by_key(|&(world, location, _)| (world, location));

    let mut rewards: Vec<_> = worlds
        .iter()
        .flat_map(|world| world.reward_regions().map(move |(name, reward)| (world.id, name, reward)))
        .collect();
    rewards.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut bosses: Vec<_> = worlds
        .iter()
        .flat_map(|world| world.boss_regions().map(move |(name, boss)| (world.id, name, boss)))
        .collect();
    bosses.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let mut prerequisites: Vec<_> = worlds
        .iter()
        .flat_map(|world| world.prerequisite_regions().map(move |(name, item)| (world.id, name, item)))
        .collect();
    prerequisites.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let parts = [
        join(items.iter().map(|(_, _, item)| item.to_string())),
        join(rewards.iter().map(|(_, _, reward)| reward.to_string())),
        join(bosses.iter().map(|(_, _, boss)| boss.to_string())),
        join(prerequisites.iter().map(|(_, _, item)| item.to_string())),
    ];
    parts.iter().map(|part| format!("{:08x}", fnv1a(part))).collect()
}

fn join(values: impl Iterator<Item = String>) -> String {
    values.collect::<Vec<_>>().join(",")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use multiworld_types::{BossType, ItemType, LocationId, WorldId};

    use super::*;
    use crate::location::{Location, PlacedItem};

    fn world(id: u32, item: ItemType, boss: BossType) -> World {
        let mut world = World::new(WorldId(id), format!("P{id}"), false);
        world
            .add_location(Location::new(LocationId(1), "A", PlacedItem::new(item, WorldId(id))))
            .unwrap();
        world.add_boss_region("Dungeon", boss);
        world
    }

    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
        assert_eq!(fnv1a("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn hash_is_four_hex_blocks() {
        let hash = validation_hash(&[world(0, ItemType::Bow, BossType::Kraid)]);
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn hash_ignores_input_order() {
        let a = world(0, ItemType::Bow, BossType::Kraid);
        let b = world(1, ItemType::Morph, BossType::Ridley);
        assert_eq!(
            validation_hash(&[a.clone(), b.clone()]),
            validation_hash(&[b, a])
        );
    }

    #[test]
    fn hash_changes_with_any_assignment() {
        let base = validation_hash(&[world(0, ItemType::Bow, BossType::Kraid)]);
        assert_ne!(base, validation_hash(&[world(0, ItemType::Hookshot, BossType::Kraid)]));
        assert_ne!(base, validation_hash(&[world(0, ItemType::Bow, BossType::Phantoon)]));
    }
}
