use crate::form::FormState;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{opt_str_param, page_view, review_param};
use crate::ipc::types::{ensure_page, AppState, Request};
use crate::remote::{GroupDetails, RemoteError, ReviewServer};
use crate::schema::{group_detail_fields, MEMBERS};
use serde_json::json;
use tracing::warn;

pub const GROUP_FETCH_ALERT: &str = "Failed to load group details. Please check the group ID.";

pub enum GroupFetch {
    /// Blank group id; nothing was requested.
    Skipped,
    Populated(GroupDetails),
    Failed(RemoteError),
}

/// Copies group details into the page. Member `n` of the response lands in
/// `roll_no_{n+1}`, `student_name_{n+1}` and `contact_details_{n+1}`;
/// members without a matching field are dropped.
pub fn populate_group(form: &mut FormState, details: &GroupDetails) {
    for field in group_detail_fields() {
        form.set(field, details.detail(field));
    }
    for (idx, member) in details.members.iter().take(usize::from(MEMBERS)).enumerate() {
        let n = idx + 1;
        form.set(&format!("roll_no_{n}"), member.roll_no.as_str());
        form.set(&format!("student_name_{n}"), member.student_name.as_str());
        form.set(&format!("contact_details_{n}"), member.contact_details.as_str());
    }
}

/// Looks up the page's current `group_id`. On failure the form is left
/// exactly as it was.
pub fn fetch_into(server: &dyn ReviewServer, form: &mut FormState) -> GroupFetch {
    let group_id = form.value("group_id").unwrap_or_default().trim().to_string();
    if group_id.is_empty() {
        return GroupFetch::Skipped;
    }
    match server.fetch_group(&group_id) {
        Ok(details) => {
            populate_group(form, &details);
            GroupFetch::Populated(details)
        }
        Err(e) => {
            warn!(%group_id, "failed to fetch group details: {e}");
            GroupFetch::Failed(e)
        }
    }
}

fn handle_fetch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if !review.has_group_lookup() {
        return err(
            &req.id,
            "bad_params",
            "group lookup is only available on reviews 3 and 4",
            Some(json!({ "review": review })),
        );
    }

    let AppState {
        pages,
        store,
        server,
        ..
    } = state;
    let page = ensure_page(pages, store, review);
    if let Some(group_id) = opt_str_param(req, "groupId") {
        page.form.set("group_id", group_id);
    }

    match fetch_into(&**server, &mut page.form) {
        GroupFetch::Skipped => ok(
            &req.id,
            json!({ "fetched": false, "page": page_view(page) }),
        ),
        GroupFetch::Populated(details) => ok(
            &req.id,
            json!({ "fetched": true, "group": details, "page": page_view(page) }),
        ),
        GroupFetch::Failed(e) => err(
            &req.id,
            "group_fetch_failed",
            GROUP_FETCH_ALERT,
            Some(json!({ "cause": e.to_string() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "group.fetch" => Some(handle_fetch(state, req)),
        _ => None,
    }
}
