//! Blob codec: the two structured blobs carried inside request and
//! response parameters — key/value maps and roster snapshots — sharing
//! the `H_len || H || body` envelope from [`super::wrap_envelope`].

use super::{encode_double, encode_single, encode_string, skip_envelope_header, wrap_envelope, Reader};
use crate::model::{KvMap, PokemonRecord, Rarity, Roster};

/// The literal encoding of an empty key/value blob, used as the
/// placeholder for unused KV slots in the load response.
pub const EMPTY_KV_BLOB: &str = "yqym";

/// Encode a key/value map (`inventory`, `achievements`, `extraInfo`).
pub fn encode_kv(map: &KvMap) -> String {
    let mut body = encode_single(map.len() as i64);
    for (key, value) in map {
        body.push_str(&encode_single(*key as i64));
        body.push_str(&encode_single(*value as i64));
    }
    wrap_envelope(&body)
}

/// Decode a key/value map. Fail-soft: stops at the first cursor exhaustion
/// and returns whatever was parsed so far.
pub fn decode_kv(input: &str) -> KvMap {
    let mut r = Reader::new(input);
    skip_envelope_header(&mut r);
    let count = r.read_single().max(0) as usize;
    let mut map = KvMap::new();
    for _ in 0..count {
        if !r.is_valid() {
            break;
        }
        let key = r.read_single();
        let value = r.read_single();
        if key >= 0 {
            map.insert(key as u32, value.max(0) as u32);
        }
    }
    map
}

/// Encode a roster as a full snapshot, the form the client accepts on
/// login. `rarity` is never round-tripped raw — `extraRarity` is always
/// regenerated from the normalized `rarity` field.
pub fn encode_snapshot(roster: &Roster) -> String {
    let mut body = encode_single(roster.len() as i64);
    for p in roster {
        body.push_str(&encode_single(p.species));
        body.push_str(&encode_double(p.experience));
        body.push_str(&encode_single(p.level));
        body.push_str(&encode_single(p.move1));
        body.push_str(&encode_single(p.move2));
        body.push_str(&encode_single(p.move3));
        body.push_str(&encode_single(p.move4));
        body.push_str(&encode_single(p.move_selected));
        body.push_str(&encode_single(p.target_type));
        body.push_str(&encode_double(p.my_id));
        body.push_str(&encode_single(p.position));
        body.push_str(&encode_single(p.rarity.to_extra_rarity()));
        body.push_str(&encode_string(&p.tag));
    }
    wrap_envelope(&body)
}

/// Decode a roster snapshot. Used for round-trip testing the encoder above;
/// the server itself never needs to decode a snapshot it didn't just write.
pub fn decode_snapshot(input: &str) -> Roster {
    let mut r = Reader::new(input);
    skip_envelope_header(&mut r);
    let count = r.read_single().max(0) as usize;
    let mut roster = Roster::new();
    for _ in 0..count {
        if !r.is_valid() {
            break;
        }
        let species = r.read_single();
        let experience = r.read_double();
        let level = r.read_single();
        let move1 = r.read_single();
        let move2 = r.read_single();
        let move3 = r.read_single();
        let move4 = r.read_single();
        let move_selected = r.read_single();
        let target_type = r.read_single();
        let my_id = r.read_double();
        let position = r.read_single();
        let extra_rarity = r.read_single();
        let tag = r.read_string();
        roster.push(PokemonRecord {
            species,
            experience,
            level,
            move1,
            move2,
            move3,
            move4,
            move_selected,
            target_type,
            my_id,
            position,
            rarity: Rarity::from_extra_rarity(extra_rarity, species),
            tag,
        });
    }
    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_kv_blob_is_literal_placeholder() {
        assert_eq!(encode_kv(&KvMap::new()), EMPTY_KV_BLOB);
    }

    #[test]
    fn kv_roundtrip() {
        let mut map = KvMap::new();
        map.insert(1, 5);
        map.insert(42, 999);
        map.insert(0, 0);
        let wire = encode_kv(&map);
        assert_eq!(decode_kv(&wire), map);
    }

    #[test]
    fn empty_kv_roundtrip() {
        let map = KvMap::new();
        assert_eq!(decode_kv(&encode_kv(&map)), map);
    }

    #[test]
    fn snapshot_roundtrip_preserves_fields() {
        let roster = vec![
            PokemonRecord {
                species: 1,
                experience: 16_777_000,
                level: 5,
                move1: 33,
                move2: 0,
                move3: 0,
                move4: 0,
                move_selected: 1,
                target_type: 1,
                my_id: 1,
                position: 1,
                rarity: Rarity::Shiny,
                tag: "Bulba".to_string(),
            },
            PokemonRecord {
                species: 2,
                experience: 0,
                level: 1,
                move1: 0,
                move2: 0,
                move3: 0,
                move4: 0,
                move_selected: 1,
                target_type: 1,
                my_id: 2,
                position: 2,
                rarity: Rarity::Shadow,
                tag: String::new(),
            },
        ];

        let wire = encode_snapshot(&roster);
        let decoded = decode_snapshot(&wire);
        assert_eq!(decoded.len(), roster.len());
        for (original, got) in roster.iter().zip(decoded.iter()) {
            assert_eq!(original.species, got.species);
            assert_eq!(original.experience, got.experience);
            assert_eq!(original.level, got.level);
            assert_eq!(original.move1, got.move1);
            assert_eq!(original.move2, got.move2);
            assert_eq!(original.move3, got.move3);
            assert_eq!(original.move4, got.move4);
            assert_eq!(original.move_selected, got.move_selected);
            assert_eq!(original.target_type, got.target_type);
            assert_eq!(original.my_id, got.my_id);
            assert_eq!(original.position, got.position);
            assert_eq!(original.tag, got.tag);
            assert_eq!(original.rarity, got.rarity);
        }
    }

    #[test]
    fn empty_roster_snapshot() {
        let wire = encode_snapshot(&Roster::new());
        // Same literal as the empty KV placeholder (spec §8 boundary
        // behavior) -- both bodies are just a single-prefixed zero count.
        assert_eq!(wire, EMPTY_KV_BLOB);
        assert_eq!(decode_snapshot(&wire), Roster::new());
    }
}
