use crate::schema::{FieldKind, PageSchema, ReviewNumber};
use std::collections::{BTreeMap, BTreeSet};

/// Flat field-name -> value mapping, the unit of session persistence and of
/// PDF payloads.
pub type Record = BTreeMap<String, String>;

/// Live state of one review page: current values of every declared field
/// plus the set of fields showing an error state.
#[derive(Debug, Clone)]
pub struct FormState {
    schema: PageSchema,
    values: BTreeMap<String, String>,
    invalid: BTreeSet<String>,
}

impl FormState {
    pub fn new(review: ReviewNumber) -> Self {
        let schema = PageSchema::for_review(review);
        debug_assert!(schema.validate().is_ok(), "{:?}", schema.validate());
        let values = schema
            .fields
            .iter()
            .map(|f| (f.handle().to_string(), String::new()))
            .collect();
        Self {
            schema,
            values,
            invalid: BTreeSet::new(),
        }
    }

    pub fn review(&self) -> ReviewNumber {
        self.schema.review
    }

    pub fn schema(&self) -> &PageSchema {
        &self.schema
    }

    pub fn value(&self, handle: &str) -> Option<&str> {
        self.values.get(handle).map(String::as_str)
    }

    /// Sets a field addressed by name or id. Returns the field's handle, or
    /// `None` when the page has no such field.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Option<String> {
        let handle = self.schema.lookup(key)?.handle().to_string();
        self.values.insert(handle.clone(), value.into());
        Some(handle)
    }

    pub fn kind_of(&self, key: &str) -> Option<FieldKind> {
        self.schema.lookup(key).map(|f| f.kind)
    }

    pub fn set_invalid(&mut self, handle: &str, invalid: bool) {
        if invalid {
            self.invalid.insert(handle.to_string());
        } else {
            self.invalid.remove(handle);
        }
    }

    pub fn invalid_fields(&self) -> impl Iterator<Item = &str> {
        self.invalid.iter().map(String::as_str)
    }

    /// Everything the page would save: named fields under their name and
    /// id-only fields under their id.
    pub fn snapshot(&self) -> Record {
        self.values.clone()
    }

    /// Named fields only, the payload posted to the PDF endpoint.
    pub fn named_payload(&self) -> Record {
        self.schema
            .fields
            .iter()
            .filter_map(|f| {
                let name = f.name.as_deref()?;
                Some((name.to_string(), self.values.get(name)?.clone()))
            })
            .collect()
    }

    /// Flags blank required fields and clears the flag on filled ones.
    /// Returns the blank ones; fields the page lacks are not reported.
    pub fn check_required(&mut self) -> Vec<String> {
        let required: Vec<&'static str> = self.schema.required_fields().collect();
        let mut missing = Vec::new();
        for key in required {
            let blank = self.value(key).map_or(true, |v| v.trim().is_empty());
            self.set_invalid(key, blank);
            if blank {
                missing.push(key.to_string());
            }
        }
        missing
    }

    /// Applies a stored record. Keys without a matching field are skipped.
    /// Returns how many fields were populated.
    pub fn apply(&mut self, record: &Record) -> usize {
        let mut applied = 0;
        for (key, value) in record {
            if self.set(key, value.as_str()).is_some() {
                applied += 1;
            }
        }
        applied
    }
}
