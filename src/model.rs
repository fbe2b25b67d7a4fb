//! The account/roster data model.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An opaque integer-keyed map, persisted verbatim. Used for `inventory`,
/// `achievements`, and `extraInfo` — the server never interprets these keys
/// or values, it only round-trips them (spec §3).
pub type KvMap = BTreeMap<u32, u32>;

/// Rarity as normalized by the delta parser (spec §4.3.1). The raw wire
/// `extraRarity` value is never stored; it is regenerated on encode.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    #[default]
    Normal,
    Shiny,
    Shadow,
}

impl Rarity {
    /// The canonical `extraRarity` projection emitted by the snapshot encoder
    /// (spec §4.2): 1 for shiny, 180 for shadow, 0 otherwise.
    pub fn to_extra_rarity(self) -> i64 {
        match self {
            Rarity::Normal => 0,
            Rarity::Shiny => 1,
            Rarity::Shadow => 180,
        }
    }

    /// Derive rarity from a raw `extraRarity` value on capture (spec
    /// §4.3.1). Rules are applied in order; the last one falls back to
    /// `species` since the client also uses that as a degenerate shiny
    /// signal.
    pub fn from_extra_rarity(extra_rarity: i64, species: i64) -> Rarity {
        const SHINY_CODES: [i64; 11] = [1, 2, 3, 4, 5, 6, 151, 153, 168, 182, 854];
        const SHADOW_CODES: [i64; 3] = [180, 555, 855];

        if SHINY_CODES.contains(&extra_rarity) {
            Rarity::Shiny
        } else if SHADOW_CODES.contains(&extra_rarity) {
            Rarity::Shadow
        } else if extra_rarity == species {
            Rarity::Shiny
        } else {
            Rarity::Normal
        }
    }
}

/// One entry in a slot's roster (spec §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PokemonRecord {
    pub species: i64,
    pub experience: i64,
    pub level: i64,
    pub move1: i64,
    pub move2: i64,
    pub move3: i64,
    pub move4: i64,
    pub move_selected: i64,
    pub target_type: i64,
    /// Stable within a roster once non-zero; unique within a roster.
    pub my_id: i64,
    pub position: i64,
    pub rarity: Rarity,
    pub tag: String,
}

impl PokemonRecord {
    /// A record with every scalar field zeroed, `rarity` normal, and an
    /// empty tag. `myID` is assigned by the caller (delta parser allocation
    /// or explicit wire value).
    pub fn blank(my_id: i64) -> Self {
        PokemonRecord {
            species: 0,
            experience: 0,
            level: 0,
            move1: 0,
            move2: 0,
            move3: 0,
            move4: 0,
            move_selected: 0,
            target_type: 0,
            my_id,
            position: 0,
            rarity: Rarity::default(),
            tag: String::new(),
        }
    }
}

/// An ordered roster. Delta application works on an unordered map keyed by
/// `myID` (spec §9) and materializes this on write, sorted by `(position,
/// myID)` per spec §4.3.2.
pub type Roster = Vec<PokemonRecord>;

/// One of the three independent save contexts per account (spec §3). Each
/// slot is an independent playthrough, so `inventory`/`achievements`/
/// `extraInfo` live here rather than on [`Account`] — the response format
/// (spec §6) emits one `pSextra2`/`pSextra3`/`pSextra4` per slot `S`, and
/// a save request's `num` parameter scopes `extra2`/`extra3`/`extra4` to
/// one slot at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub nickname: String,
    pub avatar: String,
    pub badges: i64,
    pub money: i64,
    pub version: i64,
    pub advanced: i64,
    pub advanced_a: i64,
    pub classic: i64,
    pub challenge: i64,
    pub inventory: KvMap,
    pub achievements: KvMap,
    pub extra_info: KvMap,
}

impl Default for Slot {
    fn default() -> Self {
        Slot {
            nickname: "Satoshi".to_string(),
            avatar: "none".to_string(),
            badges: 0,
            money: 50,
            version: 0,
            advanced: 0,
            advanced_a: 0,
            classic: 0,
            challenge: 0,
            inventory: KvMap::new(),
            achievements: KvMap::new(),
            extra_info: KvMap::new(),
        }
    }
}

/// The number of species tracked by the pokedex sighting string (spec §3).
pub const POKEDEX_SIZE: usize = 151;

/// One account, created atomically with an empty roster on first reference
/// (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub trainer_id: i64,
    pub current_save: String,
    pub password: String,
    pub slot1: Slot,
    pub slot2: Slot,
    pub slot3: Slot,
    /// Exactly [`POKEDEX_SIZE`] decimal digits, position *i* is the
    /// sighting/catch flag for species *i+1*.
    pub pokedex: String,
}

impl Account {
    /// Borrow the named slot ("1" | "2" | "3"), falling back to slot 1 for
    /// any other value — mirrors the reference server's tolerant parameter
    /// handling.
    pub fn slot(&self, num: &str) -> &Slot {
        match num {
            "2" => &self.slot2,
            "3" => &self.slot3,
            _ => &self.slot1,
        }
    }

    pub fn slot_mut(&mut self, num: &str) -> &mut Slot {
        match num {
            "2" => &mut self.slot2,
            "3" => &mut self.slot3,
            _ => &mut self.slot1,
        }
    }
}
