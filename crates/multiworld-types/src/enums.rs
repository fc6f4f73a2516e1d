//! Enumeration types for multiworld sessions.
//!
//! Item, boss and reward names double as the canonical strings fed to the
//! validation hasher, so variant names are part of the cross-client contract:
//! renaming a variant changes every validation hash.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item categories
// ---------------------------------------------------------------------------

/// A classification attached to item types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemCategory {
    /// Item from the Zelda half of the combined game.
    Zelda,
    /// Item from the Metroid half of the combined game.
    Metroid,
    /// Item that is never required to finish the game.
    Junk,
    /// Item shown with a misleading sprite in some settings.
    Scam,
    /// Item that appears many times in the pool.
    Plentiful,
    /// Item that may gate progression.
    PossibleProgression,
    /// Item that only counts as progression up to a limited quantity.
    ProgressionOnLimitedAmount,
    /// Item that can never gate progression.
    NeverProgression,
    /// Item that is not handed out when another player's game ends.
    IgnoreOnMultiplayerCompletion,
}

// ---------------------------------------------------------------------------
// Item types
// ---------------------------------------------------------------------------

/// An item that can be placed at a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// Placeholder for "no item".
    Nothing,

    // --- Zelda progression ---
    /// Bow.
    Bow,
    /// Silver arrows.
    SilverArrows,
    /// Hookshot.
    Hookshot,
    /// Fire rod.
    Firerod,
    /// Ice rod.
    Icerod,
    /// Lamp.
    Lamp,
    /// Hammer.
    Hammer,
    /// Flute.
    Flute,
    /// Book of Mudora.
    Book,
    /// Magic mirror.
    Mirror,
    /// Pegasus boots.
    Boots,
    /// Progressive glove.
    ProgressiveGlove,
    /// Zora's flippers.
    Flippers,
    /// Moon pearl.
    MoonPearl,
    /// Progressive sword.
    ProgressiveSword,
    /// Progressive shield.
    ProgressiveShield,
    /// Half magic upgrade.
    HalfMagic,

    // --- Metroid progression ---
    /// Morph ball.
    Morph,
    /// Morph ball bombs.
    Bombs,
    /// Charge beam.
    Charge,
    /// Ice beam.
    Ice,
    /// Wave beam.
    Wave,
    /// Plasma beam.
    Plasma,
    /// Varia suit.
    Varia,
    /// Gravity suit.
    Gravity,
    /// Grappling beam.
    Grapple,
    /// Space jump.
    SpaceJump,
    /// Screw attack.
    ScrewAttack,
    /// High jump boots.
    HiJump,
    /// Speed booster.
    SpeedBooster,
    /// Missile expansion.
    Missile,
    /// Super missile expansion.
    Super,
    /// Power bomb expansion.
    PowerBomb,
    /// Energy tank.
    ETank,
    /// Reserve tank.
    ReserveTank,

    // --- Zelda fillers ---
    /// Piece of heart.
    HeartPiece,
    /// Heart container.
    HeartContainer,
    /// Three bombs.
    ThreeBombs,
    /// Single arrow.
    Arrow,
    /// Ten arrows.
    TenArrows,
    /// One rupee.
    OneRupee,
    /// Five rupees.
    FiveRupees,
    /// Twenty rupees.
    TwentyRupees,
    /// Fifty rupees.
    FiftyRupees,
    /// One hundred rupees.
    OneHundredRupees,
}

impl ItemType {
    /// Every placeable item type, in declaration order.
    pub const ALL: [Self; 45] = [
        Self::Bow,
        Self::SilverArrows,
        Self::Hookshot,
        Self::Firerod,
        Self::Icerod,
        Self::Lamp,
        Self::Hammer,
        Self::Flute,
        Self::Book,
        Self::Mirror,
        Self::Boots,
        Self::ProgressiveGlove,
        Self::Flippers,
        Self::MoonPearl,
        Self::ProgressiveSword,
        Self::ProgressiveShield,
        Self::HalfMagic,
        Self::Morph,
        Self::Bombs,
        Self::Charge,
        Self::Ice,
        Self::Wave,
        Self::Plasma,
        Self::Varia,
        Self::Gravity,
        Self::Grapple,
        Self::SpaceJump,
        Self::ScrewAttack,
        Self::HiJump,
        Self::SpeedBooster,
        Self::Missile,
        Self::Super,
        Self::PowerBomb,
        Self::ETank,
        Self::ReserveTank,
        Self::HeartPiece,
        Self::HeartContainer,
        Self::ThreeBombs,
        Self::Arrow,
        Self::TenArrows,
        Self::OneRupee,
        Self::FiveRupees,
        Self::TwentyRupees,
        Self::FiftyRupees,
        Self::OneHundredRupees,
    ];

    /// Return the categories this item type belongs to.
    pub const fn categories(self) -> &'static [ItemCategory] {
        use ItemCategory::{
            IgnoreOnMultiplayerCompletion as Ignore, Junk, Metroid, NeverProgression,
            Plentiful, PossibleProgression, ProgressionOnLimitedAmount, Scam, Zelda,
        };
        match self {
            Self::Nothing => &[],
            Self::Bow
            | Self::SilverArrows
            | Self::Hookshot
            | Self::Firerod
            | Self::Icerod
            | Self::Lamp
            | Self::Hammer
            | Self::Flute
            | Self::Book
            | Self::Mirror
            | Self::Boots
            | Self::ProgressiveGlove
            | Self::Flippers
            | Self::MoonPearl
            | Self::ProgressiveSword => &[Zelda],
            Self::ProgressiveShield | Self::HalfMagic => &[Zelda, PossibleProgression],
            Self::Morph
            | Self::Bombs
            | Self::Charge
            | Self::Ice
            | Self::Wave
            | Self::Plasma
            | Self::Varia
            | Self::Gravity
            | Self::Grapple
            | Self::SpaceJump
            | Self::ScrewAttack
            | Self::HiJump
            | Self::SpeedBooster => &[Metroid],
            Self::Missile | Self::Super | Self::PowerBomb => &[Metroid, Plentiful],
            Self::ETank => &[Metroid, ProgressionOnLimitedAmount],
            Self::ReserveTank => &[Metroid, Junk, NeverProgression],
            Self::HeartPiece => &[Zelda, Scam, Junk, Plentiful],
            Self::HeartContainer => &[Zelda, Scam, Junk, ProgressionOnLimitedAmount],
            Self::ThreeBombs | Self::TwentyRupees => {
                &[Zelda, Scam, Junk, Plentiful, Ignore, NeverProgression]
            }
            Self::Arrow
            | Self::TenArrows
            | Self::OneRupee
            | Self::FiveRupees
            | Self::FiftyRupees => &[Zelda, Scam, Junk, Ignore, NeverProgression],
            Self::OneHundredRupees => &[Zelda, Scam, Junk, NeverProgression],
        }
    }

    /// Check whether this item type belongs to `category`.
    pub fn is_in_category(self, category: ItemCategory) -> bool {
        self.categories().contains(&category)
    }

    /// Whether this item counts toward game progression at all.
    pub fn is_progression(self) -> bool {
        !self.is_in_category(ItemCategory::NeverProgression)
            && !self.is_in_category(ItemCategory::Junk)
            && self != Self::Nothing
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// Bosses and rewards
// ---------------------------------------------------------------------------

/// A boss that can be tracked as defeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BossType {
    /// Armos Knights (Eastern Palace).
    ArmosKnights,
    /// Lanmolas (Desert Palace).
    Lanmolas,
    /// Moldorm (Tower of Hera).
    Moldorm,
    /// Helmasaur King (Palace of Darkness).
    HelmasaurKing,
    /// Arrghus (Swamp Palace).
    Arrghus,
    /// Mothula (Skull Woods).
    Mothula,
    /// Blind (Thieves' Town).
    Blind,
    /// Kholdstare (Ice Palace).
    Kholdstare,
    /// Vitreous (Misery Mire).
    Vitreous,
    /// Trinexx (Turtle Rock).
    Trinexx,
    /// Kraid (Brinstar).
    Kraid,
    /// Phantoon (Wrecked Ship).
    Phantoon,
    /// Draygon (Maridia).
    Draygon,
    /// Ridley (Lower Norfair).
    Ridley,
}

impl fmt::Display for BossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The reward granted for clearing a reward region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RewardType {
    /// Green pendant.
    PendantGreen,
    /// Red pendant.
    PendantRed,
    /// Blue pendant.
    PendantBlue,
    /// Ordinary crystal.
    CrystalBlue,
    /// Red crystal.
    CrystalRed,
    /// Kraid's boss token.
    KraidToken,
    /// Phantoon's boss token.
    PhantoonToken,
    /// Draygon's boss token.
    DraygonToken,
    /// Ridley's boss token.
    RidleyToken,
}

impl fmt::Display for RewardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

// ---------------------------------------------------------------------------
// Session status
// ---------------------------------------------------------------------------

/// Overall status of a multiplayer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameStatus {
    /// Players are joining and submitting configs.
    #[default]
    Created,
    /// The admin requested generation and it is in progress.
    Generating,
    /// Generation succeeded; the game is being played.
    Started,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Per-player status within a session.
///
/// `Forfeited` and `Completed` are terminal and mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerStatus {
    /// Still playing.
    #[default]
    Active,
    /// Gave up; their world is revealed to everyone else.
    Forfeited,
    /// Finished their game.
    Completed,
}
