use crate::calc::{format_number, parse_number};
use crate::form::{FormState, Record};
use crate::schema::{ReviewNumber, MEMBERS};
use serde::Serialize;

const CARRIED: usize = 4;

/// Per-member totals pulled out of the four earlier reviews, plus the group
/// they were recorded for.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarriedTotals {
    pub group_id: String,
    /// `per_review[r][m]`: review `r + 1`, member `m + 1`.
    pub per_review: [[f64; MEMBERS as usize]; CARRIED],
}

/// First non-empty `group_id` across the records, in review order.
pub fn resolve_group_id(records: &[Record; CARRIED]) -> String {
    records
        .iter()
        .filter_map(|r| r.get("group_id"))
        .find(|v| !v.is_empty())
        .cloned()
        .unwrap_or_default()
}

/// One review's total for one member, read through that review's key
/// template. Absent or non-numeric values count as 0.
pub fn extract_total(record: &Record, review: ReviewNumber, member: u8) -> f64 {
    review
        .total_key(member)
        .and_then(|k| record.get(&k))
        .and_then(|v| parse_number(v))
        .unwrap_or(0.0)
}

pub fn collect(records: &[Record; CARRIED]) -> CarriedTotals {
    let mut per_review = [[0.0; MEMBERS as usize]; CARRIED];
    for (r, review) in ReviewNumber::carried().into_iter().enumerate() {
        for member in 1..=MEMBERS {
            per_review[r][usize::from(member - 1)] = extract_total(&records[r], review, member);
        }
    }
    CarriedTotals {
        group_id: resolve_group_id(records),
        per_review,
    }
}

/// Writes the carried values into the final page and computes the final
/// totals from what is displayed.
pub fn populate_final_page(
    form: &mut FormState,
    carried: &CarriedTotals,
) -> [f64; MEMBERS as usize] {
    form.set("group_id", carried.group_id.as_str());
    for (r, review) in ReviewNumber::carried().into_iter().enumerate() {
        for member in 1..=MEMBERS {
            let v = carried.per_review[r][usize::from(member - 1)];
            form.set(
                &format!("review{}_{member}", review.get()),
                format_number(v),
            );
        }
    }
    recompute_finals(form)
}

/// Final total per member: the sum of the four displayed per-review values,
/// non-numeric entries counting as 0.
pub fn recompute_finals(form: &mut FormState) -> [f64; MEMBERS as usize] {
    let mut finals = [0.0; MEMBERS as usize];
    for member in 1..=MEMBERS {
        let total: f64 = ReviewNumber::carried()
            .into_iter()
            .map(|review| {
                form.value(&format!("review{}_{member}", review.get()))
                    .and_then(parse_number)
                    .unwrap_or(0.0)
            })
            .sum();
        form.set(&format!("final_{member}"), format_number(total));
        finals[usize::from(member - 1)] = total;
    }
    finals
}

/// The consolidated record persisted under `review5_data`.
pub fn final_record(form: &FormState) -> Record {
    let mut record = Record::new();
    record.insert(
        "group_id".to_string(),
        form.value("group_id").unwrap_or_default().to_string(),
    );
    record.insert(
        "final_comments".to_string(),
        form.value(&ReviewNumber::FINAL.comments_key())
            .unwrap_or_default()
            .to_string(),
    );
    for review in ReviewNumber::carried() {
        for member in 1..=MEMBERS {
            let key = format!("review{}_{member}", review.get());
            let value = form.value(&key).unwrap_or_default().to_string();
            record.insert(key, value);
        }
    }
    record
}
