use serde::Serialize;
use std::collections::HashSet;

pub const MEMBERS: u8 = 4;

/// Total-field key templates for the four mark-bearing pages. `{i}` is the
/// member index (1..=4). The conventions differ per page and must be kept.
pub const TOTAL_KEY_TEMPLATES: [(u8, &str); 4] = [
    (1, "1.{i}.s1"),
    (2, "2.{i}.s1"),
    (3, "f8{i}"),
    (4, "f4.{i}.s1"),
];

const REQUIRED_FIELDS: [&str; 2] = ["group_id", "date"];
const GROUP_DETAIL_FIELDS: [&str; 5] = [
    "project_title",
    "guide_name",
    "mentor_name",
    "mentor_email",
    "mentor_mobile",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReviewNumber(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPolicy {
    /// Review 1: clamp to bounds, unparsable input counts as 0 and never
    /// invalidates the total.
    ClampOnly,
    /// Reviews 2-4: unparsable input is cleared, flagged and turns the
    /// member's total into the "Invalid" sentinel.
    Invalidate,
}

impl ReviewNumber {
    pub const FINAL: ReviewNumber = ReviewNumber(5);

    pub fn new(n: u8) -> Option<Self> {
        (1..=5).contains(&n).then_some(Self(n))
    }

    pub fn from_i64(n: i64) -> Option<Self> {
        u8::try_from(n).ok().and_then(Self::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The four pages whose totals feed the final page, in review order.
    pub fn carried() -> [ReviewNumber; 4] {
        [Self(1), Self(2), Self(3), Self(4)]
    }

    pub fn is_final(self) -> bool {
        self.0 == 5
    }

    pub fn session_key(self) -> String {
        format!("review{}_data", self.0)
    }

    pub fn route(self) -> String {
        format!("/review{}", self.0)
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).and_then(Self::new)
    }

    pub fn mark_policy(self) -> MarkPolicy {
        if self.0 == 1 {
            MarkPolicy::ClampOnly
        } else {
            MarkPolicy::Invalidate
        }
    }

    pub fn has_group_lookup(self) -> bool {
        matches!(self.0, 3 | 4)
    }

    pub fn pdf_endpoint(self) -> String {
        format!("/generate-pdf-review{}", self.0)
    }

    pub fn download_filename(self) -> &'static str {
        match self.0 {
            1 => "Review-I_Form.pdf",
            2 => "Review-II_Form.pdf",
            3 => "Review-III_Form.pdf",
            4 => "Review-IV_Form.pdf",
            _ => "Final_Review_Summary.pdf",
        }
    }

    pub fn export_label(self) -> &'static str {
        if self.is_final() {
            "Generate Final PDF"
        } else {
            "Generate PDF"
        }
    }

    pub fn comments_key(self) -> String {
        format!("c{}", self.0)
    }

    pub fn total_key_template(self) -> Option<&'static str> {
        TOTAL_KEY_TEMPLATES
            .iter()
            .find(|(n, _)| *n == self.0)
            .map(|(_, t)| *t)
    }

    pub fn total_key(self, member: u8) -> Option<String> {
        self.total_key_template()
            .map(|t| t.replace("{i}", &member.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkBounds {
    pub member: u8,
    pub min: f64,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Mark(MarkBounds),
    Total { member: u8 },
    /// Page 5: one review's total for one member, copied from that review.
    Carried { review: u8, member: u8 },
    Final { member: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: Option<String>,
    pub id: Option<String>,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn named(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: Some(name.into()),
            id: None,
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Key under which the field's value is tracked and saved: the name, or
    /// the id for fields that have no name.
    pub fn handle(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSchema {
    pub review: ReviewNumber,
    pub fields: Vec<FieldSpec>,
}

impl PageSchema {
    pub fn for_review(review: ReviewNumber) -> Self {
        let fields = if review.is_final() {
            final_page_fields()
        } else {
            mark_page_fields(review)
        };
        Self { review, fields }
    }

    pub fn field(&self, handle: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.handle() == handle)
    }

    /// Resolve a stored key to a field: by name first, then by id.
    pub fn lookup(&self, key: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| f.name.as_deref() == Some(key))
            .or_else(|| self.fields.iter().find(|f| f.id.as_deref() == Some(key)))
    }

    pub fn marks_for(&self, member: u8) -> impl Iterator<Item = (&FieldSpec, MarkBounds)> {
        self.fields.iter().filter_map(move |f| match f.kind {
            FieldKind::Mark(b) if b.member == member => Some((f, b)),
            _ => None,
        })
    }

    pub fn total_for(&self, member: u8) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| matches!(f.kind, FieldKind::Total { member: m } if m == member))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        REQUIRED_FIELDS
            .into_iter()
            .filter(|k| self.field(k).is_some())
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for f in &self.fields {
            if f.name.is_none() && f.id.is_none() {
                return Err(format!("field without name or id: {:?}", f.kind));
            }
            for key in [f.name.as_deref(), f.id.as_deref()].into_iter().flatten() {
                if !seen.insert(key.to_string()) {
                    return Err(format!("duplicate field key: {key}"));
                }
            }
            if let FieldKind::Mark(b) = f.kind {
                if let Some(max) = b.max {
                    if max < b.min {
                        return Err(format!("{}: max below min", f.handle()));
                    }
                }
            }
        }

        if self.review.is_final() {
            return Ok(());
        }
        for member in 1..=MEMBERS {
            let Some(total) = self.total_for(member) else {
                return Err(format!("no total field for member {member}"));
            };
            if total.name != self.review.total_key(member) {
                return Err(format!(
                    "total for member {member} is {:?}, expected {:?}",
                    total.name,
                    self.review.total_key(member)
                ));
            }
            if self.marks_for(member).next().is_none() {
                return Err(format!("no mark fields for member {member}"));
            }
        }
        Ok(())
    }
}

fn criteria_maxima(review: ReviewNumber) -> &'static [f64] {
    match review.get() {
        3 => &[5.0, 5.0, 3.0, 3.0, 3.0, 3.0, 3.0],
        _ => &[5.0, 5.0, 5.0, 5.0, 5.0],
    }
}

fn mark_key(review: ReviewNumber, member: u8, criterion: usize) -> String {
    match review.get() {
        3 => format!("f{criterion}{member}"),
        4 => format!("f4.{member}.{criterion}"),
        n => format!("{n}.{member}.{criterion}"),
    }
}

fn text(name: impl Into<String>) -> FieldSpec {
    FieldSpec::named(name, FieldKind::Text)
}

fn mark_page_fields(review: ReviewNumber) -> Vec<FieldSpec> {
    let mut fields: Vec<FieldSpec> = REQUIRED_FIELDS.into_iter().map(text).collect();
    fields.extend(GROUP_DETAIL_FIELDS.into_iter().map(text));
    for member in 1..=MEMBERS {
        fields.push(text(format!("roll_no_{member}")));
        fields.push(text(format!("student_name_{member}")));
        fields.push(text(format!("contact_details_{member}")));
    }

    for member in 1..=MEMBERS {
        for (idx, max) in criteria_maxima(review).iter().enumerate() {
            fields.push(FieldSpec::named(
                mark_key(review, member, idx + 1),
                FieldKind::Mark(MarkBounds {
                    member,
                    min: 0.0,
                    max: Some(*max),
                }),
            ));
        }
        if let Some(key) = review.total_key(member) {
            fields.push(FieldSpec::named(key, FieldKind::Total { member }));
        }
    }

    fields.push(text(review.comments_key()));
    fields
}

fn final_page_fields() -> Vec<FieldSpec> {
    let mut fields: Vec<FieldSpec> = REQUIRED_FIELDS.into_iter().map(text).collect();
    for review in ReviewNumber::carried() {
        let r = review.get();
        for member in 1..=MEMBERS {
            fields.push(
                FieldSpec::named(
                    format!("review{r}_{member}"),
                    FieldKind::Carried { review: r, member },
                )
                .with_id(format!("review{r}-student{member}")),
            );
        }
    }
    for member in 1..=MEMBERS {
        fields.push(
            FieldSpec::named(format!("final_{member}"), FieldKind::Final { member })
                .with_id(format!("final-student{member}")),
        );
    }
    fields.push(text(ReviewNumber::FINAL.comments_key()).with_id("final_comments"));
    fields
}

pub fn group_detail_fields() -> [&'static str; 5] {
    GROUP_DETAIL_FIELDS
}
