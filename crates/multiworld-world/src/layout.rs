//! Built-in world layout.
//!
//! Every world of a seed starts from this template: 28 item locations across
//! both games, 14 dungeons carrying a reward and a boss, and two regions
//! gated by a required item. The unshuffled ("vanilla") assignment places
//! [`ITEM_POOL`] in order, each item owned by the world itself.

use multiworld_types::{BossType, ItemType, LocationId, RewardType, WorldId};

use crate::error::WorldError;
use crate::location::{Location, PlacedItem};
use crate::world::World;

/// Location ids and names of the layout.
pub const LOCATIONS: [(u32, &str); 28] = [
    (1, "Link's House"),
    (2, "Sanctuary"),
    (3, "Kakariko Well"),
    (4, "Blind's Hideout"),
    (5, "Sahasrahla's Hut"),
    (6, "King Zora"),
    (7, "Lost Woods Hideout"),
    (8, "Lumberjack Tree"),
    (9, "Spectacle Rock"),
    (10, "Ether Tablet"),
    (11, "Bombos Tablet"),
    (12, "Pyramid"),
    (13, "Catfish"),
    (14, "Eastern Palace - Big Chest"),
    (15, "Desert Palace - Torch"),
    (16, "Tower of Hera - Big Chest"),
    (17, "Palace of Darkness - Big Chest"),
    (18, "Swamp Palace - Big Chest"),
    (19, "Morphing Ball"),
    (20, "Missile (Crateria gauntlet)"),
    (21, "Energy Tank, Brinstar Ceiling"),
    (22, "Charge Beam"),
    (23, "Varia Suit"),
    (24, "Wave Beam"),
    (25, "Gravity Suit"),
    (26, "Space Jump"),
    (27, "Screw Attack"),
    (28, "Speed Booster"),
];

/// Items distributed over [`LOCATIONS`], one per location.
pub const ITEM_POOL: [ItemType; 28] = [
    ItemType::Bow,
    ItemType::Hookshot,
    ItemType::Firerod,
    ItemType::Icerod,
    ItemType::Lamp,
    ItemType::Flippers,
    ItemType::Hammer,
    ItemType::Flute,
    ItemType::Mirror,
    ItemType::Boots,
    ItemType::ProgressiveGlove,
    ItemType::MoonPearl,
    ItemType::ProgressiveSword,
    ItemType::HeartPiece,
    ItemType::ThreeBombs,
    ItemType::TenArrows,
    ItemType::TwentyRupees,
    ItemType::FiftyRupees,
    ItemType::Morph,
    ItemType::Missile,
    ItemType::ETank,
    ItemType::Charge,
    ItemType::Varia,
    ItemType::Super,
    ItemType::Gravity,
    ItemType::SpaceJump,
    ItemType::PowerBomb,
    ItemType::Bombs,
];

/// A dungeon: both a reward region and a boss region.
#[derive(Debug, Clone, Copy)]
pub struct Dungeon {
    /// Region name.
    pub name: &'static str,
    /// Unshuffled reward.
    pub reward: RewardType,
    /// Unshuffled boss.
    pub boss: BossType,
    /// Whether the dungeon belongs to the Metroid half of the layout.
    pub metroid: bool,
}

const fn dungeon(name: &'static str, reward: RewardType, boss: BossType, metroid: bool) -> Dungeon {
    Dungeon {
        name,
        reward,
        boss,
        metroid,
    }
}

/// Dungeons of the layout.
pub const DUNGEONS: [Dungeon; 14] = [
    dungeon("Eastern Palace", RewardType::PendantGreen, BossType::ArmosKnights, false),
    dungeon("Desert Palace", RewardType::PendantBlue, BossType::Lanmolas, false),
    dungeon("Tower of Hera", RewardType::PendantRed, BossType::Moldorm, false),
    dungeon("Palace of Darkness", RewardType::CrystalBlue, BossType::HelmasaurKing, false),
    dungeon("Swamp Palace", RewardType::CrystalBlue, BossType::Arrghus, false),
    dungeon("Skull Woods", RewardType::CrystalBlue, BossType::Mothula, false),
    dungeon("Thieves' Town", RewardType::CrystalBlue, BossType::Blind, false),
    dungeon("Ice Palace", RewardType::CrystalRed, BossType::Kholdstare, false),
    dungeon("Misery Mire", RewardType::CrystalRed, BossType::Vitreous, false),
    dungeon("Turtle Rock", RewardType::CrystalBlue, BossType::Trinexx, false),
    dungeon("Kraid's Lair", RewardType::KraidToken, BossType::Kraid, true),
    dungeon("Wrecked Ship", RewardType::PhantoonToken, BossType::Phantoon, true),
    dungeon("Inner Maridia", RewardType::DraygonToken, BossType::Draygon, true),
    dungeon("Lower Norfair", RewardType::RidleyToken, BossType::Ridley, true),
];

/// Regions whose entry requires an item, with the unshuffled requirement.
pub const PREREQUISITE_REGIONS: [(&str, ItemType); 2] = [
    ("Misery Mire", ItemType::Firerod),
    ("Turtle Rock", ItemType::Icerod),
];

/// Items a prerequisite region may require.
pub const PREREQUISITE_CHOICES: [ItemType; 3] = [ItemType::Firerod, ItemType::Icerod, ItemType::Lamp];

/// Build the unshuffled layout for one world.
///
/// # Errors
///
/// Returns [`WorldError`] if the layout tables contain duplicate ids (should
/// not happen with the built-in tables).
pub fn build_world(id: WorldId, player_name: &str, is_local: bool) -> Result<World, WorldError> {
    let mut world = World::new(id, player_name, is_local);
    for (&(location_id, name), &item) in LOCATIONS.iter().zip(ITEM_POOL.iter()) {
        world.add_location(Location::new(LocationId(location_id), name, PlacedItem::new(item, id)))?;
    }
    for dungeon in &DUNGEONS {
        world.add_reward_region(dungeon.name, dungeon.reward);
        world.add_boss_region(dungeon.name, dungeon.boss);
    }
    for &(name, item) in &PREREQUISITE_REGIONS {
        world.add_prerequisite_region(name, item);
    }
    Ok(world)
}
