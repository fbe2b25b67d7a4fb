//! Delta parser (spec §4.3): applies a change-record stream to an
//! in-memory roster, resolving the client's unstable `myID`s against
//! server-assigned identifiers.

use std::collections::BTreeMap;

use crate::codec::{skip_envelope_header, Reader};
use crate::model::{PokemonRecord, Rarity, Roster};

/// Apply a `extra`-field delta stream against `previous`, returning the
/// roster that should be persisted.
///
/// Never panics and never returns an error: cursor exhaustion or a
/// malformed entry simply halts the stream early (spec §4.3.3) and the
/// records accumulated so far are returned. Callers that need to detect
/// "nothing at all was decoded" should compare the input length against
/// [`MIN_EMPTY_DELTA_LEN`].
pub fn apply_delta(input: &str, previous: &Roster) -> Roster {
    let mut roster: BTreeMap<i64, PokemonRecord> = previous
        .iter()
        .cloned()
        .map(|r| (r.my_id, r))
        .collect();

    let mut r = Reader::new(input);
    skip_envelope_header(&mut r);
    let _total_count = r.read_single(); // informational only, never trusted

    while r.is_valid() && !r.at_end() {
        let change_count = r.read_single();
        if !r.is_valid() {
            break;
        }
        let my_id = r.read_double();
        if !r.is_valid() {
            break;
        }
        if change_count <= 0 {
            continue;
        }

        let first_type = r.read_single();
        if !r.is_valid() {
            break;
        }

        let remaining = (change_count - 1).max(0) as usize;

        if my_id == 0 {
            if first_type == CHANGE_CAPTURED {
                // Recomputed from the roster's current keys every time,
                // not tracked incrementally -- a prior entry in this same
                // stream may have inserted an explicit nonzero myID (or a
                // posChange rekey) above any previously allocated id, and
                // a stale counter would collide with it (spec §4.3.2/§3).
                let id = roster.keys().max().copied().unwrap_or(0) + 1;
                let mut rec = PokemonRecord::blank(id);
                apply_change(first_type, &mut r, &mut rec);
                apply_remaining(&mut r, remaining, Some(&mut rec));
                roster.insert(id, rec);
            } else {
                apply_remaining_with_first(&mut r, first_type, remaining, None);
            }
        } else if let Some(rec) = roster.get_mut(&my_id) {
            apply_change(first_type, &mut r, rec);
            apply_remaining(&mut r, remaining, Some(rec));
        } else if first_type == CHANGE_CAPTURED {
            let mut rec = PokemonRecord::blank(my_id);
            apply_change(first_type, &mut r, &mut rec);
            apply_remaining(&mut r, remaining, Some(&mut rec));
            roster.insert(my_id, rec);
        } else if first_type == CHANGE_POS {
            let mut scratch = PokemonRecord::blank(0);
            apply_change(first_type, &mut r, &mut scratch);
            let new_position = scratch.position;
            let rekey_from = roster
                .iter()
                .find(|(_, rec)| rec.position == new_position || rec.my_id == new_position)
                .map(|(k, _)| *k);

            if let Some(old_key) = rekey_from {
                let mut rec = roster.remove(&old_key).expect("key came from this map");
                rec.my_id = my_id;
                rec.position = new_position;
                apply_remaining(&mut r, remaining, Some(&mut rec));
                roster.insert(my_id, rec);
            } else {
                apply_remaining(&mut r, remaining, None);
            }
        } else {
            apply_remaining_with_first(&mut r, first_type, remaining, None);
        }
    }

    roster.retain(|id, _| *id != 0);
    let mut out: Roster = roster.into_values().collect();
    out.sort_by_key(|rec| (rec.position, rec.my_id));
    out
}

const CHANGE_CAPTURED: i64 = 1;
const CHANGE_LEVEL: i64 = 2;
const CHANGE_EXP: i64 = 3;
const CHANGE_MOVES: i64 = 4;
const CHANGE_MOVE_SELECTED: i64 = 5;
const CHANGE_EVOLVE: i64 = 6;
const CHANGE_TARGET: i64 = 7;
const CHANGE_POS: i64 = 8;
const CHANGE_TAG: i64 = 9;
const CHANGE_TRADE: i64 = 10;

/// Apply the remaining `count` changes, having already consumed the first
/// change's type tag and dispatched it. `rec`, when present, receives
/// every applied change; when absent the payloads are still read (into a
/// scratch record) so the cursor stays aligned.
fn apply_remaining(r: &mut Reader, count: usize, mut rec: Option<&mut PokemonRecord>) {
    for _ in 0..count {
        if !r.is_valid() {
            return;
        }
        let change_type = r.read_single();
        if !r.is_valid() {
            return;
        }
        match rec.as_deref_mut() {
            Some(rec) => apply_change(change_type, r, rec),
            None => {
                let mut scratch = PokemonRecord::blank(0);
                apply_change(change_type, r, &mut scratch);
            }
        }
    }
}

/// Like [`apply_remaining`], but also consumes the payload of a first
/// change type that was already read off the stream without being
/// dispatched to a record (the skip path for an invalid entry, spec
/// §4.3.2).
fn apply_remaining_with_first(r: &mut Reader, first_type: i64, remaining: usize, rec: Option<&mut PokemonRecord>) {
    let mut scratch = PokemonRecord::blank(0);
    apply_change(first_type, r, &mut scratch);
    apply_remaining(r, remaining, rec);
}

/// Read and apply one change's payload to `rec`. Always consumes exactly
/// the bytes the change type's payload shape specifies (spec §4.3 table),
/// regardless of whether the caller intends to keep `rec`.
fn apply_change(change_type: i64, r: &mut Reader, rec: &mut PokemonRecord) {
    match change_type {
        CHANGE_CAPTURED => {
            rec.species = r.read_single();
            rec.experience = r.read_double();
            rec.level = r.read_single();
            rec.move1 = r.read_single();
            rec.move2 = r.read_single();
            rec.move3 = r.read_single();
            rec.move4 = r.read_single();
            rec.move_selected = r.read_single();
            rec.target_type = r.read_single();
            rec.position = r.read_single();
            let extra_rarity = r.read_single();
            rec.rarity = Rarity::from_extra_rarity(extra_rarity, rec.species);
            rec.tag = r.read_string();
        }
        CHANGE_LEVEL => rec.level = r.read_single(),
        CHANGE_EXP => rec.experience = r.read_double(),
        CHANGE_MOVES => {
            rec.move1 = r.read_single();
            rec.move2 = r.read_single();
            rec.move3 = r.read_single();
            rec.move4 = r.read_single();
        }
        CHANGE_MOVE_SELECTED => rec.move_selected = r.read_single(),
        CHANGE_EVOLVE => rec.species = r.read_single(),
        CHANGE_TARGET => rec.target_type = r.read_single(),
        CHANGE_POS => rec.position = r.read_single(),
        CHANGE_TAG => rec.tag = r.read_string(),
        CHANGE_TRADE => {
            rec.species = r.read_single();
            rec.experience = r.read_double();
            rec.level = r.read_single();
            rec.move1 = r.read_single();
            rec.move2 = r.read_single();
            rec.move3 = r.read_single();
            rec.move4 = r.read_single();
            rec.move_selected = r.read_single();
            rec.target_type = r.read_single();
            rec.position = r.read_single();
        }
        _ => {
            log::warn!("delta: unrecognized change type {change_type}, stream likely desynchronized");
        }
    }
}
