use crate::aggregate;
use crate::calc::{self, validate_mark};
use crate::db::SessionStore;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::group::{fetch_into, GroupFetch, GROUP_FETCH_ALERT};
use crate::ipc::helpers::{page_view, review_param, str_param, value_param, HandlerErr};
use crate::ipc::types::{ensure_page, open_page, AppState, PageState, Request};
use crate::schema::FieldKind;
use serde_json::json;
use tracing::info;

pub const REQUIRED_ALERT: &str = "Please fill all required fields";

/// Persists a page under its session key. The final page stores the
/// consolidated record rather than a raw snapshot.
pub fn save_page(store: &SessionStore, page: &PageState) -> (String, bool) {
    let review = page.form.review();
    let key = review.session_key();
    let saved = if review.is_final() {
        store.put_record(&key, &aggregate::final_record(&page.form))
    } else {
        store.save(&key, &page.form)
    };
    (key, saved)
}

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page = open_page(&mut state.pages, &state.store, review);
    info!(review = review.get(), "review page opened");
    ok(&req.id, page_view(page))
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page = ensure_page(&mut state.pages, &state.store, review);
    ok(&req.id, page_view(page))
}

/// A change event on one field. Marks are validated and the page's totals
/// recomputed; `group_id` on reviews 3 and 4 triggers the group lookup.
/// Carried values on page 5 are stored as typed without any recomputation.
/// Totals and finals are computed and never take a typed value.
fn handle_set_field(state: &mut AppState, req: &Request) -> serde_json::Value {
    let parsed = review_param(req).and_then(|review| {
        let key = str_param(req, "key")?;
        let value = value_param(req)?;
        Ok((review, key, value))
    });
    let (review, key, value) = match parsed {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let AppState {
        pages,
        store,
        server,
        ..
    } = state;
    let page = ensure_page(pages, store, review);
    let form = &mut page.form;

    let Some(kind) = form.kind_of(key) else {
        return ok(
            &req.id,
            json!({ "applied": false, "key": key, "page": page_view(page) }),
        );
    };

    let mut group = None;
    match kind {
        FieldKind::Mark(bounds) => {
            let outcome = validate_mark(review.mark_policy(), &value, bounds);
            if let Some(handle) = form.set(key, outcome.value) {
                form.set_invalid(&handle, !outcome.valid);
            }
            calc::recalculate_totals(form);
        }
        FieldKind::Text => {
            let handle = form.set(key, value);
            if handle.as_deref() == Some("group_id") && review.has_group_lookup() {
                group = Some(match fetch_into(&**server, form) {
                    GroupFetch::Skipped => json!({ "fetched": false }),
                    GroupFetch::Populated(details) => {
                        json!({ "fetched": true, "group": details })
                    }
                    GroupFetch::Failed(e) => json!({
                        "fetched": false,
                        "alert": GROUP_FETCH_ALERT,
                        "cause": e.to_string(),
                    }),
                });
            }
        }
        FieldKind::Carried { .. } => {
            form.set(key, value);
        }
        FieldKind::Total { .. } | FieldKind::Final { .. } => {
            return ok(
                &req.id,
                json!({
                    "applied": false,
                    "key": key,
                    "reason": "derived",
                    "page": page_view(page),
                }),
            );
        }
    }

    let mut result = json!({ "applied": true, "key": key, "page": page_view(page) });
    if let Some(g) = group {
        result["groupFetch"] = g;
    }
    ok(&req.id, result)
}

fn handle_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page = ensure_page(&mut state.pages, &state.store, review);
    let (key, saved) = save_page(&state.store, page);
    if !saved {
        return err(
            &req.id,
            "session_failed",
            "failed to save review state",
            Some(json!({ "key": key })),
        );
    }
    ok(&req.id, json!({ "key": key, "saved": true }))
}

/// Saves the current page, then hands back the neighbour's route.
fn handle_navigate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let target = match str_param(req, "direction") {
        Ok("next") => review.next(),
        Ok("previous") => review.previous(),
        Ok(other) => {
            return HandlerErr {
                code: "bad_params",
                message: "direction must be next or previous".to_string(),
                details: Some(json!({ "direction": other })),
            }
            .response(&req.id)
        }
        Err(e) => return e.response(&req.id),
    };
    let Some(target) = target else {
        return err(
            &req.id,
            "bad_params",
            format!("review {} has no page in that direction", review.get()),
            None,
        );
    };

    let page = ensure_page(&mut state.pages, &state.store, review);
    let (key, saved) = save_page(&state.store, page);
    info!(from = review.get(), to = target.get(), saved, "navigating");
    ok(
        &req.id,
        json!({
            "savedKey": key,
            "saved": saved,
            "target": target,
            "route": target.route(),
        }),
    )
}

fn handle_validate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let page = ensure_page(&mut state.pages, &state.store, review);
    let missing = page.form.check_required();
    let valid = missing.is_empty();
    let mut result = json!({ "valid": valid, "missing": missing });
    if !valid {
        result["alert"] = json!(REQUIRED_ALERT);
    }
    ok(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "review.open" => Some(handle_open(state, req)),
        "review.get" => Some(handle_get(state, req)),
        "review.setField" => Some(handle_set_field(state, req)),
        "review.save" => Some(handle_save(state, req)),
        "review.navigate" => Some(handle_navigate(state, req)),
        "review.validate" => Some(handle_validate(state, req)),
        _ => None,
    }
}

