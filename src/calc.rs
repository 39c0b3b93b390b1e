use crate::form::FormState;
use crate::schema::{MarkBounds, MarkPolicy, MEMBERS};
use std::fmt;

pub const INVALID_SENTINEL: &str = "Invalid";

/// Leading-prefix float parse: surrounding junk after a numeric prefix is
/// ignored ("7abc" -> 7), anything without a numeric prefix is `None`.
/// This is the parse every page uses for marks and carried totals.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        if digits > 0 {
            end = j;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut j = end + 1;
        if matches!(bytes.get(j), Some(b'+' | b'-')) {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            end = j;
        }
    }

    s[..end].parse::<f64>().ok()
}

/// Renders a number the way the pages display it: whole numbers without a
/// fractional part.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

pub fn clamp_to_bounds(v: f64, bounds: MarkBounds) -> f64 {
    let v = v.max(bounds.min);
    match bounds.max {
        Some(max) => v.min(max),
        None => v,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkOutcome {
    pub value: String,
    pub valid: bool,
}

/// Change-event validation of one mark input.
pub fn validate_mark(policy: MarkPolicy, raw: &str, bounds: MarkBounds) -> MarkOutcome {
    let Some(v) = parse_number(raw) else {
        return match policy {
            MarkPolicy::ClampOnly => MarkOutcome {
                value: raw.to_string(),
                valid: true,
            },
            MarkPolicy::Invalidate => MarkOutcome {
                value: String::new(),
                valid: false,
            },
        };
    };

    let clamped = clamp_to_bounds(v, bounds);
    let trimmed = raw.trim();
    let value = if clamped == v && trimmed.parse::<f64>().is_ok() {
        trimmed.to_string()
    } else {
        format_number(clamped)
    };
    MarkOutcome { value, valid: true }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalValue {
    Sum(f64),
    Invalid,
}

impl TotalValue {
    pub fn is_invalid(self) -> bool {
        matches!(self, TotalValue::Invalid)
    }
}

impl fmt::Display for TotalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalValue::Sum(v) => f.write_str(&format_number(*v)),
            TotalValue::Invalid => f.write_str(INVALID_SENTINEL),
        }
    }
}

/// Sum of one member's marks on one page. Unparsable entries are excluded
/// from the sum; under `Invalidate` they also turn the result into
/// `TotalValue::Invalid`.
pub fn member_total<'a, I>(policy: MarkPolicy, values: I) -> TotalValue
where
    I: IntoIterator<Item = &'a str>,
{
    let mut sum = 0.0;
    let mut valid = true;
    for raw in values {
        match parse_number(raw) {
            Some(v) => sum += v,
            None => valid = false,
        }
    }
    if valid || policy == MarkPolicy::ClampOnly {
        TotalValue::Sum(sum)
    } else {
        TotalValue::Invalid
    }
}

/// Recomputes every member's total on a mark page, writes it into the page's
/// total field and refreshes the error flags of mark and total fields.
pub fn recalculate_totals(form: &mut FormState) -> [TotalValue; MEMBERS as usize] {
    let policy = form.review().mark_policy();
    let mut totals = [TotalValue::Sum(0.0); MEMBERS as usize];

    for member in 1..=MEMBERS {
        let handles: Vec<String> = form
            .schema()
            .marks_for(member)
            .map(|(f, _)| f.handle().to_string())
            .collect();

        let total = member_total(
            policy,
            handles.iter().map(|h| form.value(h).unwrap_or_default()),
        );

        if policy == MarkPolicy::Invalidate {
            for h in &handles {
                let bad = form.value(h).and_then(parse_number).is_none();
                form.set_invalid(h, bad);
            }
        }

        let total_handle = form
            .schema()
            .total_for(member)
            .map(|f| f.handle().to_string());
        if let Some(h) = total_handle {
            form.set(&h, total.to_string());
            form.set_invalid(&h, total.is_invalid());
        }
        totals[usize::from(member - 1)] = total;
    }

    totals
}
