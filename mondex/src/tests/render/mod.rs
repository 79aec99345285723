use rstest::*;

use crate::core::client::DatabaseError;
use crate::render::{Renderer, NO_CHANGES};
use crate::service::{ApplyProgress, ApplyReport, OperationOutcome};
use crate::tests::common::{derived, named};
use crate::types::index::{CanonicalIndex, IndexDirection, IndexKeySpec};
use crate::types::plan::{CollectionDiff, IndexOperation, ReconciliationPlan};

fn render(write: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
    let mut buffer = Vec::new();
    write(&mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

fn outcome(collection: &str, operation: IndexOperation, result: Result<(), DatabaseError>) -> OperationOutcome {
    OperationOutcome { collection: collection.to_string(), operation, result }
}

#[rstest]
fn empty_plan_reports_no_changes() {
    let output = render(|out| Renderer::new(false).plan(&ReconciliationPlan::new(), out));
    assert_eq!(output, format!("{}\n", NO_CHANGES));
}

#[rstest]
fn plan_lists_creates_then_drops_per_collection() {
    let mut plan = ReconciliationPlan::new();
    plan.push(CollectionDiff {
        collection: "users".to_string(),
        to_create: vec![
            derived(&[("email", 1)]).unique(true),
            derived(&[("createdAt", -1)]).expire_after(Some(3600)),
        ],
        to_drop: vec![named("name_1", &[("name", 1)])],
    });
    plan.push(CollectionDiff {
        collection: "orders".to_string(),
        to_create: vec![],
        to_drop: vec![named("placedAt_1_customer_-1", &[("placedAt", 1), ("customer", -1)])],
    });

    let output = render(|out| Renderer::new(false).plan(&plan, out));

    let expected = "\
Collection: users
+ Create email_1 {\"email\":1} (unique)
+ Create createdAt_-1 {\"createdAt\":-1} (expires: 3600)
- Drop name_1 {\"name\":1}
Collection: orders
- Drop placedAt_1_customer_-1 {\"placedAt\":1,\"customer\":-1}
";
    assert_eq!(output, expected);
}

#[rstest]
fn special_index_types_are_quoted() {
    let keys = IndexKeySpec::new().with("location", IndexDirection::Special("2dsphere".to_string()));
    let mut plan = ReconciliationPlan::new();
    plan.push(CollectionDiff {
        collection: "places".to_string(),
        to_create: vec![CanonicalIndex::new("location_2dsphere", keys)],
        to_drop: vec![],
    });

    let output = render(|out| Renderer::new(false).plan(&plan, out));

    assert!(output.contains("+ Create location_2dsphere {\"location\":\"2dsphere\"}"));
}

#[rstest]
#[case::control_character("a\u{7f}b")]
#[case::quote("say \"hi\"")]
#[case::backslash("path\\to")]
#[case::non_ascii("naïve")]
fn key_spec_renders_as_valid_json(#[case] field: &str) {
    let keys = IndexKeySpec::new().with(field, IndexDirection::Ascending).with("b", IndexDirection::Descending);

    let rendered = keys.to_string();

    let parsed: serde_json::Value = serde_json::from_str(&rendered).expect("rendered keys should be valid JSON");
    assert_eq!(parsed[field], 1);
    assert_eq!(parsed["b"], -1);
}

#[rstest]
fn colored_output_wraps_text_in_escape_codes() {
    let mut plan = ReconciliationPlan::new();
    plan.push(CollectionDiff { collection: "c".to_string(), to_create: vec![derived(&[("a", 1)])], to_drop: vec![] });

    let colored = render(|out| Renderer::new(true).plan(&plan, out));
    let plain = render(|out| Renderer::new(false).plan(&plan, out));

    assert!(colored.contains("\x1b["));
    assert!(!plain.contains("\x1b["));
}

#[rstest]
fn apply_report_shows_each_operation_and_failures() {
    let report: ApplyReport = vec![
        outcome("users", IndexOperation::Drop(named("name_1", &[("name", 1)])), Ok(())),
        outcome(
            "users",
            IndexOperation::Create(derived(&[("email", 1)]).unique(true)),
            Err(DatabaseError::UnnamedIndex { collection: "users".to_string() }),
        ),
        outcome("orders", IndexOperation::Create(derived(&[("placedAt", -1)])), Ok(())),
    ]
    .into_iter()
    .collect();

    let output = render(|out| Renderer::new(false).apply_report(&report, out));

    let expected = "\
Collection: users
- Dropping index name_1 {\"name\":1}
+ Creating index email_1 {\"email\":1} (unique)
  failed: Collection users reported an index without a name
Collection: orders
+ Creating index placedAt_-1 {\"placedAt\":-1}
2 of 3 operations succeeded, 1 failed
";
    assert_eq!(output, expected);
}

#[rstest]
fn successful_apply_ends_with_summary() {
    let report: ApplyReport =
        vec![outcome("c", IndexOperation::Create(derived(&[("a", 1)])), Ok(()))].into_iter().collect();

    let output = render(|out| Renderer::new(false).apply_report(&report, out));

    assert!(output.ends_with("1 of 1 operations succeeded\n"));
}

#[rstest]
fn empty_apply_reports_no_changes() {
    let output = render(|out| Renderer::new(false).apply_report(&ApplyReport::default(), out));
    assert_eq!(output, format!("{}\n", NO_CHANGES));
}

#[rstest]
fn apply_printer_writes_each_operation_before_it_completes() {
    let operation = IndexOperation::Create(derived(&[("email", 1)]));
    let mut buffer = Vec::new();

    let mut printer = Renderer::new(false).apply_printer(&mut buffer);
    printer.record(ApplyProgress::Started { collection: "users", operation: &operation });
    drop(printer);

    assert_eq!(String::from_utf8(buffer).unwrap(), "Collection: users\n+ Creating index email_1 {\"email\":1}\n");
}

#[rstest]
fn apply_printer_streams_the_same_output_as_the_report() {
    let outcomes = vec![
        outcome("users", IndexOperation::Drop(named("name_1", &[("name", 1)])), Ok(())),
        outcome(
            "users",
            IndexOperation::Create(derived(&[("email", 1)])),
            Err(DatabaseError::UnnamedIndex { collection: "users".to_string() }),
        ),
    ];

    let mut streamed = Vec::new();
    let mut printer = Renderer::new(false).apply_printer(&mut streamed);
    for outcome in &outcomes {
        printer.record(ApplyProgress::Started { collection: &outcome.collection, operation: &outcome.operation });
        printer.record(ApplyProgress::Finished(outcome));
    }
    let report: ApplyReport = outcomes.into_iter().collect();
    printer.finish(&report).unwrap();

    let rendered = render(|out| Renderer::new(false).apply_report(&report, out));
    assert_eq!(String::from_utf8(streamed).unwrap(), rendered);
}
