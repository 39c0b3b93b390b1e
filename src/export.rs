use crate::schema::ReviewNumber;
use anyhow::Context;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const BUSY_LABEL: &str = "Generating PDF...";

/// State of a page's PDF trigger: label and enabled flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportControl {
    pub label: String,
    pub disabled: bool,
    #[serde(skip)]
    idle_label: &'static str,
}

impl ExportControl {
    pub fn for_review(review: ReviewNumber) -> Self {
        let idle_label = review.export_label();
        Self {
            label: idle_label.to_string(),
            disabled: false,
            idle_label,
        }
    }

    /// Disables and relabels the control. `None` when it is already disabled.
    /// Requests are handled one at a time and the guard is dropped before
    /// the response goes out, so over IPC every export finds it idle; the
    /// flag mirrors the trigger's disabled state for the page view.
    pub fn begin(&mut self) -> Option<ExportGuard<'_>> {
        if self.disabled {
            return None;
        }
        self.disabled = true;
        self.label = BUSY_LABEL.to_string();
        Some(ExportGuard { control: self })
    }
}

/// Restores the control's enabled state and idle label when dropped,
/// whatever the export's outcome.
pub struct ExportGuard<'a> {
    control: &'a mut ExportControl,
}

impl ExportGuard<'_> {
    pub fn label(&self) -> &str {
        &self.control.label
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.control.disabled = false;
        self.control.label = self.control.idle_label.to_string();
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDocument {
    pub path: PathBuf,
    pub bytes: usize,
    pub sha256: String,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Writes a downloaded document into `dir`: first to a temporary file, then
/// renamed onto `filename`. The temporary file is removed on failure.
pub fn save_document(dir: &Path, filename: &str, bytes: &[u8]) -> anyhow::Result<SavedDocument> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
    let dst = dir.join(filename);
    let tmp = dir.join(format!("{filename}.{}.part", uuid::Uuid::new_v4()));

    let written = File::create(&tmp)
        .with_context(|| format!("failed to create {}", tmp.to_string_lossy()))
        .and_then(|mut f| {
            f.write_all(bytes).context("failed to write document")?;
            f.flush().context("failed to flush document")
        })
        .and_then(|()| {
            std::fs::rename(&tmp, &dst)
                .with_context(|| format!("failed to move document to {}", dst.to_string_lossy()))
        });
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }

    Ok(SavedDocument {
        path: dst,
        bytes: bytes.len(),
        sha256: sha256_hex(bytes),
    })
}
