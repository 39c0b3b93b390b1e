use crate::ipc::error::err;
use crate::ipc::types::{PageState, Request};
use crate::schema::{FieldKind, ReviewNumber, MEMBERS};
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn review_param(req: &Request) -> Result<ReviewNumber, HandlerErr> {
    let Some(raw) = req.params.get("review") else {
        return Err(HandlerErr::bad_params("missing params.review"));
    };
    raw.as_i64()
        .and_then(ReviewNumber::from_i64)
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "review must be an integer from 1 to 5".to_string(),
            details: Some(json!({ "review": raw })),
        })
}

pub fn str_param<'a>(req: &'a Request, name: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{name}")))
}

pub fn opt_str_param<'a>(req: &'a Request, name: &str) -> Option<&'a str> {
    req.params.get(name).and_then(|v| v.as_str())
}

/// Field values are strings on the wire, but numbers are accepted and
/// rendered as text.
pub fn value_param(req: &Request) -> Result<String, HandlerErr> {
    match req.params.get("value") {
        Some(serde_json::Value::String(s)) => Ok(s.clone()),
        Some(serde_json::Value::Number(n)) => Ok(n
            .as_f64()
            .map(crate::calc::format_number)
            .unwrap_or_else(|| n.to_string())),
        Some(serde_json::Value::Null) => Ok(String::new()),
        _ => Err(HandlerErr::bad_params("missing params.value")),
    }
}

pub fn page_view(page: &PageState) -> serde_json::Value {
    let form = &page.form;
    let review = form.review();
    let pick = |member: u8| {
        form.schema().fields.iter().find_map(|f| match f.kind {
            FieldKind::Total { member: m } | FieldKind::Final { member: m } if m == member => {
                form.value(f.handle())
            }
            _ => None,
        })
    };
    let totals: Vec<&str> = (1..=MEMBERS).filter_map(pick).collect();

    let mut view = json!({
        "review": review,
        "sessionKey": review.session_key(),
        "fields": form.snapshot(),
        "invalid": form.invalid_fields().collect::<Vec<_>>(),
        "exportControl": page.control,
    });
    let totals_key = if review.is_final() { "finals" } else { "totals" };
    view[totals_key] = json!(totals);
    view
}
