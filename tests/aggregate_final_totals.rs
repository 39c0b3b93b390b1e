#[path = "../src/aggregate.rs"]
mod aggregate;
#[path = "../src/calc.rs"]
mod calc;
#[path = "../src/form.rs"]
mod form;
#[path = "../src/schema.rs"]
mod schema;

use aggregate::{collect, extract_total, final_record, populate_final_page, recompute_finals};
use form::{FormState, Record};
use schema::ReviewNumber;

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn review(n: u8) -> ReviewNumber {
    ReviewNumber::new(n).expect("review number")
}

#[test]
fn final_total_sums_each_review_under_its_own_key() {
    let records = [
        record(&[("group_id", "G7"), ("1.1.s1", "10")]),
        record(&[("2.1.s1", "20")]),
        record(&[("f81", "5")]),
        record(&[("f4.1.s1", "7")]),
    ];
    let carried = collect(&records);
    assert_eq!(carried.group_id, "G7");
    assert_eq!(carried.per_review[0], [10.0, 0.0, 0.0, 0.0]);

    let mut form = FormState::new(ReviewNumber::FINAL);
    let finals = populate_final_page(&mut form, &carried);
    assert_eq!(finals, [42.0, 0.0, 0.0, 0.0]);

    assert_eq!(form.value("group_id"), Some("G7"));
    assert_eq!(form.value("review1_1"), Some("10"));
    assert_eq!(form.value("review3_1"), Some("5"));
    assert_eq!(form.value("final_1"), Some("42"));
    assert_eq!(form.value("final_2"), Some("0"));
}

#[test]
fn group_id_falls_back_through_later_reviews() {
    let records = [
        record(&[("group_id", "")]),
        Record::new(),
        record(&[("group_id", "G3")]),
        record(&[("group_id", "G4")]),
    ];
    assert_eq!(collect(&records).group_id, "G3");

    let empty: [Record; 4] = Default::default();
    assert_eq!(collect(&empty).group_id, "");
}

#[test]
fn invalid_or_missing_totals_count_as_zero() {
    let r2 = record(&[("2.1.s1", "Invalid"), ("2.2.s1", "12.5")]);
    assert_eq!(extract_total(&r2, review(2), 1), 0.0);
    assert_eq!(extract_total(&r2, review(2), 2), 12.5);
    assert_eq!(extract_total(&r2, review(2), 3), 0.0);
    // Another page's key convention is not consulted.
    assert_eq!(extract_total(&r2, review(1), 2), 0.0);
}

#[test]
fn finals_recompute_from_displayed_values() {
    let mut form = FormState::new(ReviewNumber::FINAL);
    form.set("review1-student2", "4");
    form.set("review2_2", "abc");
    form.set("review4_2", "1.5");
    let finals = recompute_finals(&mut form);
    assert_eq!(finals[1], 5.5);
    assert_eq!(form.value("final_2"), Some("5.5"));
}

#[test]
fn final_record_carries_comments_and_per_review_values() {
    let records = [
        record(&[("group_id", "G1"), ("1.2.s1", "9")]),
        Record::new(),
        Record::new(),
        Record::new(),
    ];
    let mut form = FormState::new(ReviewNumber::FINAL);
    populate_final_page(&mut form, &collect(&records));
    form.set("final_comments", "well done");

    let saved = final_record(&form);
    assert_eq!(saved.get("group_id").map(String::as_str), Some("G1"));
    assert_eq!(
        saved.get("final_comments").map(String::as_str),
        Some("well done")
    );
    assert_eq!(saved.get("review1_2").map(String::as_str), Some("9"));
    assert_eq!(saved.get("review4_4").map(String::as_str), Some("0"));
    assert!(!saved.contains_key("final_1"));
    assert_eq!(saved.len(), 2 + 16);
}
