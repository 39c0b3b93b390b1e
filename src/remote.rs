use crate::form::Record;
use crate::schema::ReviewNumber;
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("invalid server url: {0}")]
    BadUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{body}")]
    Status { status: u16, body: String },
    #[error("malformed group details: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub roll_no: String,
    pub student_name: String,
    pub contact_details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetails {
    pub project_title: String,
    pub guide_name: String,
    pub mentor_name: String,
    pub mentor_email: String,
    pub mentor_mobile: String,
    pub members: Vec<GroupMember>,
}

fn scalar_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

impl GroupDetails {
    /// Accepts members either as objects (`{roll_no, student_name,
    /// contact_details}`) or as positional arrays in that order.
    pub fn from_value(v: &Value) -> Result<Self, RemoteError> {
        let Value::Object(obj) = v else {
            return Err(RemoteError::Decode("expected a JSON object".to_string()));
        };

        let members = match obj.get("members") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|m| match m {
                    Value::Array(cols) => GroupMember {
                        roll_no: scalar_text(cols.first()),
                        student_name: scalar_text(cols.get(1)),
                        contact_details: scalar_text(cols.get(2)),
                    },
                    other => GroupMember {
                        roll_no: scalar_text(other.get("roll_no")),
                        student_name: scalar_text(other.get("student_name")),
                        contact_details: scalar_text(other.get("contact_details")),
                    },
                })
                .collect(),
            Some(other) => {
                return Err(RemoteError::Decode(format!(
                    "members must be an array, got {other}"
                )))
            }
        };

        Ok(Self {
            project_title: scalar_text(obj.get("project_title")),
            guide_name: scalar_text(obj.get("guide_name")),
            mentor_name: scalar_text(obj.get("mentor_name")),
            mentor_email: scalar_text(obj.get("mentor_email")),
            mentor_mobile: scalar_text(obj.get("mentor_mobile")),
            members,
        })
    }

    pub fn detail(&self, field: &str) -> &str {
        match field {
            "project_title" => &self.project_title,
            "guide_name" => &self.guide_name,
            "mentor_name" => &self.mentor_name,
            "mentor_email" => &self.mentor_email,
            "mentor_mobile" => &self.mentor_mobile,
            _ => "",
        }
    }
}

/// The review server: group lookup and PDF rendering.
pub trait ReviewServer {
    fn fetch_group(&self, group_id: &str) -> Result<GroupDetails, RemoteError>;
    fn generate_pdf(&self, review: ReviewNumber, payload: &Record)
        -> Result<Vec<u8>, RemoteError>;
}

pub struct HttpReviewServer {
    client: Client,
    base_url: Url,
}

impl HttpReviewServer {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("server url cannot be a base: {base_url}");
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    fn endpoint<'a, I>(&self, segments: I) -> Result<Url, RemoteError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::BadUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

fn check_status(
    resp: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body,
    })
}

impl ReviewServer for HttpReviewServer {
    fn fetch_group(&self, group_id: &str) -> Result<GroupDetails, RemoteError> {
        let url = self.endpoint(["fetch", group_id])?;
        info!(%url, "fetching group details");
        let resp = check_status(self.client.get(url).send()?).inspect_err(|e| {
            warn!(group_id, "group lookup rejected: {e}");
        })?;
        let body: Value = resp.json()?;
        GroupDetails::from_value(&body)
    }

    fn generate_pdf(
        &self,
        review: ReviewNumber,
        payload: &Record,
    ) -> Result<Vec<u8>, RemoteError> {
        let endpoint = review.pdf_endpoint();
        let url = self.endpoint([endpoint.trim_start_matches('/')])?;
        info!(%url, fields = payload.len(), "requesting pdf");
        let resp = check_status(self.client.post(url).json(payload).send()?)?;
        Ok(resp.bytes()?.to_vec())
    }
}
