use crate::export::save_document;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::review::{save_page, REQUIRED_ALERT};
use crate::ipc::helpers::{opt_str_param, review_param};
use crate::ipc::types::{ensure_page, AppState, PageState, Request};
use crate::remote::RemoteError;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

/// Posts the page's named fields to its PDF endpoint and writes the returned
/// document into the download directory. The page's trigger is disabled for
/// the duration and restored afterwards whatever the outcome.
fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let review = match review_param(req) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let filename = opt_str_param(req, "filename")
        .unwrap_or(review.download_filename())
        .to_string();
    if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
        return err(
            &req.id,
            "bad_params",
            "filename must be a bare file name",
            Some(json!({ "filename": filename })),
        );
    }
    let out_dir = opt_str_param(req, "outDir")
        .map(PathBuf::from)
        .unwrap_or_else(|| state.config.download_dir.clone());

    let AppState {
        pages,
        store,
        server,
        ..
    } = state;
    let page = ensure_page(pages, store, review);

    if !review.is_final() {
        let missing = page.form.check_required();
        if !missing.is_empty() {
            return err(
                &req.id,
                "validation_failed",
                REQUIRED_ALERT,
                Some(json!({ "missing": missing })),
            );
        }
    } else {
        save_page(store, page);
    }

    let PageState { form, control } = page;
    let Some(guard) = control.begin() else {
        return err(&req.id, "busy", "a PDF export is already running", None);
    };
    info!(review = review.get(), label = guard.label(), "pdf export started");

    let payload = form.named_payload();
    let outcome = match server.generate_pdf(review, &payload) {
        Ok(bytes) => {
            save_document(&out_dir, &filename, &bytes).map_err(|e| (format!("{e:#}"), None))
        }
        Err(RemoteError::Status { status, body }) => Err((body, Some(status))),
        Err(e) => Err((e.to_string(), None)),
    };
    drop(guard);

    match outcome {
        Ok(doc) => {
            info!(path = %doc.path.display(), bytes = doc.bytes, "pdf saved");
            ok(
                &req.id,
                json!({ "document": doc, "exportControl": control }),
            )
        }
        Err((message, status)) => {
            warn!(review = review.get(), ?status, "pdf export failed: {message}");
            err(
                &req.id,
                "pdf_failed",
                format!("Failed to generate PDF: {message}"),
                Some(json!({ "status": status, "exportControl": control })),
            )
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "pdf.export" => Some(handle_export(state, req)),
        _ => None,
    }
}
