//! Request dispatcher (C6, spec §4.6): parses decoded request parameters,
//! drives the account manager and delta parser, and assembles the
//! response key/value list.

use std::borrow::Cow;
use std::collections::HashMap;

use log::warn;

use crate::account::AccountManager;
use crate::codec::blob::{decode_kv, encode_kv, encode_snapshot, EMPTY_KV_BLOB};
use crate::config::Config;
use crate::delta::apply_delta;
use crate::error::DispatchError;
use crate::model::{Account, Roster, Slot};
use crate::profile_id;
use crate::storage::Storage;

const DEFAULT_SLOT: &str = "1";

fn param<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.as_str())
}

fn param_i64(params: &HashMap<String, String>, key: &str, default: i64) -> i64 {
    param(params, key).and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Split `saveString`'s pre-concatenated `key=value&key=value` body (spec
/// §6: "fallback parse path"). This is not URL-decoding — that remains the
/// external transport's job (spec §1) — just the same `&`/`=` splitting the
/// router would otherwise have done for us.
fn parse_save_string(s: &str) -> HashMap<String, String> {
    s.split('&')
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next()?;
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), parts.next().unwrap_or("").to_string()))
        })
        .collect()
}

/// When the router couldn't split the body into individual fields, it
/// hands the whole thing over as `saveString` instead. Parse it and fall
/// back to it only for keys the caller didn't already supply directly.
fn resolve_params(params: &HashMap<String, String>) -> Cow<'_, HashMap<String, String>> {
    if params.contains_key("Action") {
        return Cow::Borrowed(params);
    }
    match param(params, "saveString") {
        Some(save_string) => {
            let mut merged = parse_save_string(save_string);
            for (k, v) in params {
                merged.entry(k.clone()).or_insert_with(|| v.clone());
            }
            Cow::Owned(merged)
        }
        None => Cow::Borrowed(params),
    }
}

/// Handle one decoded request, never panicking and never letting a
/// `Storage` error escape as anything but a `Result=Failure` response
/// (spec §7: "no exception is allowed to escape the dispatcher").
pub fn dispatch<S: Storage>(
    params: &HashMap<String, String>,
    manager: &AccountManager<S>,
    config: &Config,
) -> Vec<(String, String)> {
    let params = resolve_params(params);
    match dispatch_inner(&params, manager, config) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!("dispatch failed: {e}");
            vec![
                ("Result".to_string(), "Failure".to_string()),
                ("Reason".to_string(), e.reason().to_string()),
            ]
        }
    }
}

/// An `Email` is used directly as a storage path component (spec §6,
/// [`crate::storage::file::FileStorage`]); reject anything that could
/// escape the account's own directory before it ever reaches `Storage`.
fn email_is_safe(email: &str) -> bool {
    !email.is_empty() && !email.contains("..") && !email.contains('/') && !email.contains('\\')
}

fn dispatch_inner<S: Storage>(
    params: &HashMap<String, String>,
    manager: &AccountManager<S>,
    config: &Config,
) -> Result<Vec<(String, String)>, DispatchError> {
    let action = param(params, "Action").ok_or(DispatchError::Transport)?;
    let email = param(params, "Email").ok_or(DispatchError::Transport)?;
    if !email_is_safe(email) {
        return Err(DispatchError::Transport);
    }

    match action {
        "loadAccount" | "createAccount" => handle_load(params, email, action == "createAccount", manager, config),
        "saveAccount" => handle_save(params, email, manager),
        _ => Err(DispatchError::Transport),
    }
}

/// What a load-flow transaction settled on, carried out of the
/// [`AccountManager::transact`] closure (which can only return
/// `Result<_, StorageError>`) so the caller can map it to the right
/// [`DispatchError`] afterward.
enum LoadOutcome {
    NotFound,
    WrongPass,
    Loaded(Vec<(String, String)>),
}

fn handle_load<S: Storage>(
    params: &HashMap<String, String>,
    email: &str,
    force_create: bool,
    manager: &AccountManager<S>,
    config: &Config,
) -> Result<Vec<(String, String)>, DispatchError> {
    let outcome = manager.transact(email, |mgr, loaded| {
        let (account, roster1, roster2, roster3, just_created) = match loaded {
            Some(l) => (l.account, l.roster1, l.roster2, l.roster3, false),
            None if force_create || config.auto_create_account => {
                let password = param(params, "Pass").unwrap_or("");
                let account = mgr.create_unlocked(email, password)?;
                (account, Roster::new(), Roster::new(), Roster::new(), true)
            }
            None => return Ok(LoadOutcome::NotFound),
        };

        // A just-created account has nothing stored yet to validate a
        // password against.
        if config.validate_password && !just_created {
            if let Some(pass) = param(params, "Pass") {
                if pass != account.password {
                    return Ok(LoadOutcome::WrongPass);
                }
            }
        }

        Ok(LoadOutcome::Loaded(build_load_response(&account, &roster1, &roster2, &roster3)))
    })?;

    match outcome {
        LoadOutcome::NotFound => Err(DispatchError::NotFound),
        LoadOutcome::WrongPass => Err(DispatchError::Auth),
        LoadOutcome::Loaded(resp) => Ok(resp),
    }
}

fn build_load_response(account: &Account, roster1: &Roster, roster2: &Roster, roster3: &Roster) -> Vec<(String, String)> {
    let mut out = Vec::new();
    out.push(("Result".to_string(), "Success".to_string()));
    out.push(("CurrentSave".to_string(), account.current_save.clone()));
    out.push(("newSave".to_string(), account.current_save.clone()));
    out.push(("TrainerID".to_string(), account.trainer_id.to_string()));

    match profile_id::derive(&account.current_save, account.trainer_id) {
        Some(id) => out.push(("ProfileID".to_string(), id)),
        None => warn!("profile id rejected for trainer {}", account.trainer_id),
    }

    out.push(("pokedex".to_string(), account.pokedex.clone()));

    for (label, slot, roster) in [("1", &account.slot1, roster1), ("2", &account.slot2, roster2), ("3", &account.slot3, roster3)] {
        push_slot(&mut out, label, slot, roster);
    }

    out
}

fn push_slot(out: &mut Vec<(String, String)>, label: &str, slot: &Slot, roster: &Roster) {
    out.push((format!("nickname{label}"), slot.nickname.clone()));
    out.push((format!("avatar{label}"), slot.avatar.clone()));
    out.push((format!("advanced{label}"), slot.advanced.to_string()));
    out.push((format!("advanced_a{label}"), slot.advanced_a.to_string()));
    out.push((format!("classic{label}"), slot.classic.to_string()));
    out.push((format!("challenge{label}"), slot.challenge.to_string()));
    out.push((format!("badges{label}"), slot.badges.to_string()));
    out.push((format!("money{label}"), slot.money.to_string()));
    out.push((format!("version{label}"), slot.version.to_string()));
    out.push((format!("PC{label}"), roster.len().to_string()));
    out.push((format!("p{label}extra"), encode_snapshot(roster)));
    out.push((format!("p{label}extra2"), kv_or_placeholder(&slot.inventory)));
    out.push((format!("p{label}extra3"), kv_or_placeholder(&slot.achievements)));
    out.push((format!("p{label}extra4"), kv_or_placeholder(&slot.extra_info)));

    for (i, record) in roster.iter().enumerate() {
        let tag = if record.tag.is_empty() {
            format!("Pokemon{}", i + 1)
        } else {
            record.tag.clone()
        };
        out.push((format!("p{label}PN{}", i + 1), tag));
    }
}

/// Reconstruct the request body for the per-account forensic dump (spec
/// §6): the client's own pre-concatenated form when present, else the
/// decoded parameters re-joined in a deterministic (sorted-key) order.
fn raw_dump_body(params: &HashMap<String, String>) -> String {
    if let Some(s) = param(params, "saveString") {
        return s.to_string();
    }
    let mut pairs: Vec<_> = params.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    pairs.into_iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join("&")
}

fn kv_or_placeholder(map: &crate::model::KvMap) -> String {
    if map.is_empty() {
        EMPTY_KV_BLOB.to_string()
    } else {
        encode_kv(map)
    }
}

fn handle_save<S: Storage>(
    params: &HashMap<String, String>,
    email: &str,
    manager: &AccountManager<S>,
) -> Result<Vec<(String, String)>, DispatchError> {
    let slot_num = param(params, "num").unwrap_or(DEFAULT_SLOT).to_string();

    // The whole load-modify-save(-raw-dump) cycle runs under one
    // `transact` lock acquisition, so a concurrent save for the same
    // email can't interleave and lose this one's changes (spec §5/§9).
    let out = manager.transact(email, |mgr, loaded| {
        let (mut account, mut roster) = match loaded {
            Some(l) => {
                let roster = match slot_num.as_str() {
                    "2" => l.roster2,
                    "3" => l.roster3,
                    _ => l.roster1,
                };
                (l.account, roster)
            }
            None => {
                let password = param(params, "Pass").unwrap_or("");
                (mgr.create_unlocked(email, password)?, Roster::new())
            }
        };

        if param(params, "newGame") == Some("yes") {
            roster = Roster::new();
        }

        {
            let slot = account.slot_mut(&slot_num);
            if let Some(v) = param(params, "nickname") {
                slot.nickname = v.to_string();
            }
            if let Some(v) = param(params, "avatar") {
                slot.avatar = v.to_string();
            }
            slot.badges = param_i64(params, "badges", slot.badges);
            slot.money = param_i64(params, "money", slot.money);
            slot.version = param_i64(params, "version", slot.version);
            slot.advanced = param_i64(params, "advanced", slot.advanced);
            slot.advanced_a = param_i64(params, "advanced_a", slot.advanced_a);
            slot.classic = param_i64(params, "classic", slot.classic);
            slot.challenge = param_i64(params, "challenge", slot.challenge);

            if let Some(v) = param(params, "extra2") {
                slot.inventory = decode_kv(v);
            }
            if let Some(v) = param(params, "extra3") {
                slot.achievements = decode_kv(v);
            }
            if let Some(v) = param(params, "extra4") {
                slot.extra_info = decode_kv(v);
            }
        }

        if let Some(pokedex) = param(params, "pokedex") {
            account.pokedex = pokedex.to_string();
        }

        // A failed delta must never corrupt the persisted roster (spec
        // §4.3.3) — apply_delta is itself fail-soft and never panics, so
        // "failure" here just means the pre-delta roster passes through
        // unchanged when `extra` is absent.
        if let Some(extra) = param(params, "extra") {
            roster = apply_delta(extra, &roster);
        }

        mgr.save_unlocked(email, &account, &slot_num, &roster)?;

        // Forensic dump only (spec §6); never block a successful save on it.
        if let Err(e) = mgr.append_raw_dump_unlocked(email, &raw_dump_body(params)) {
            warn!("raw save dump failed for {email}: {e}");
        }

        let mut out = vec![
            ("Result".to_string(), "Success".to_string()),
            ("newSave".to_string(), account.current_save.clone()),
        ];
        for record in &roster {
            out.push((format!("newPokePos_{}", record.position), record.my_id.to_string()));
        }
        Ok(out)
    })?;

    Ok(out)
}
