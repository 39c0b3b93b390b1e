use crate::db::decode_record;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::str_param;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_load_raw(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match str_param(req, "key") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    ok(
        &req.id,
        json!({ "key": key, "record": state.store.load_raw(key) }),
    )
}

/// Seeds a key either with a record (`params.record`, a flat object) or
/// with raw text (`params.text`) stored as-is.
fn handle_put(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = match str_param(req, "key") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    if let Some(text) = req.params.get("text").and_then(|v| v.as_str()) {
        return match state.store.put_text(key, text) {
            Ok(()) => ok(&req.id, json!({ "key": key, "stored": true })),
            Err(e) => err(&req.id, "session_failed", format!("{e:#}"), None),
        };
    }

    let Some(raw) = req.params.get("record") else {
        return err(
            &req.id,
            "bad_params",
            "missing params.record or params.text",
            None,
        );
    };
    let record = match decode_record(&raw.to_string()) {
        Ok(r) => r,
        Err(e) => return err(&req.id, "bad_params", format!("{e:#}"), None),
    };
    if !state.store.put_record(key, &record) {
        return err(&req.id, "session_failed", "failed to store record", None);
    }
    ok(
        &req.id,
        json!({ "key": key, "stored": true, "fields": record.len() }),
    )
}

fn handle_keys(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.store.keys() {
        Ok(keys) => ok(&req.id, json!({ "keys": keys })),
        Err(e) => err(&req.id, "session_failed", format!("{e:#}"), None),
    }
}

/// Ends the session: drops every stored record and every open page.
fn handle_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    match state.store.clear() {
        Ok(removed) => {
            state.pages.clear();
            ok(&req.id, json!({ "removed": removed }))
        }
        Err(e) => err(&req.id, "session_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.loadRaw" => Some(handle_load_raw(state, req)),
        "session.put" => Some(handle_put(state, req)),
        "session.keys" => Some(handle_keys(state, req)),
        "session.clear" => Some(handle_clear(state, req)),
        _ => None,
    }
}
