//! Tests for the lender clause lifecycle.

use chrono::{Duration, TimeZone};
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn input(title: &str, content: &str) -> LenderClauseInput {
    LenderClauseInput {
        lender_id: LenderId::random(),
        title: title.to_owned(),
        content: content.to_owned(),
        description: None,
    }
}

fn draft(now: DateTime<Utc>) -> LenderClause {
    NewLenderClause::new(
        input("Early repayment", "## Early repayment\n\nPay {{loan_amount}}."),
        UserId::random(),
        now,
    )
    .expect("valid clause")
    .into_clause(1)
}

#[rstest]
fn new_clauses_start_as_inactive_drafts(now: DateTime<Utc>) {
    let clause = draft(now);

    assert!(clause.is_draft());
    assert!(!clause.is_active());
    assert_eq!(clause.version(), 1);
    assert_eq!(clause.last_updated(), now);
}

#[rstest]
#[case("", "content", "title")]
#[case("   ", "content", "title")]
#[case("Title", "  \n ", "content")]
fn rejects_blank_fields(
    now: DateTime<Utc>,
    #[case] title: &str,
    #[case] content: &str,
    #[case] field: &str,
) {
    let err = NewLenderClause::new(input(title, content), UserId::random(), now)
        .expect_err("blank field rejected");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(err.field_errors().iter().any(|f| f.field == field));
}

#[rstest]
fn rejects_overlong_titles(now: DateTime<Utc>) {
    let long = "x".repeat(TITLE_MAX + 1);
    let err = NewLenderClause::new(input(&long, "content"), UserId::random(), now)
        .expect_err("long title rejected");
    assert_eq!(err.code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn creation_entry_lists_initial_values(now: DateTime<Utc>) {
    let mut raw = input("Title", "Body");
    raw.description = Some("Why".to_owned());
    let new_clause = NewLenderClause::new(raw, UserId::random(), now).expect("valid clause");

    let entry = new_clause.creation_entry();

    assert_eq!(entry.action, VersionAction::Created);
    let fields: Vec<&str> = entry.changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["title", "content", "description"]);
    assert!(entry.changes.iter().all(|c| c.before.is_none()));
}

#[rstest]
fn drafts_cannot_be_activated(now: DateTime<Utc>) {
    let mut clause = draft(now);

    let err = clause.activate(now).expect_err("draft activation rejected");

    assert!(matches!(err, ClauseStateError::NotPublished { .. }));
    assert!(!clause.is_active());
    assert_eq!(Error::from(err).code(), ErrorCode::InvalidRequest);
}

#[rstest]
fn publish_then_activate_records_flag_changes(now: DateTime<Utc>) {
    let mut clause = draft(now);
    let later = now + Duration::minutes(5);

    let published = clause.publish(later);
    let activated = clause.activate(later).expect("published clause activates");

    assert_eq!(published, vec![FieldChange::flag("is_draft", true, false)]);
    assert_eq!(activated, vec![FieldChange::flag("is_active", false, true)]);
    assert!(clause.is_published());
    assert!(clause.is_active());
    assert_eq!(clause.updated_at(), later);
    assert_eq!(clause.last_updated(), now, "flags do not touch last_updated");
}

#[rstest]
fn repeated_transitions_change_nothing(now: DateTime<Utc>) {
    let mut clause = draft(now);
    clause.publish(now);
    clause.activate(now).expect("activates");

    assert!(clause.publish(now).is_empty());
    assert!(clause.activate(now).expect("still published").is_empty());
    assert_eq!(clause.deactivate(now).len(), 1);
    assert!(clause.deactivate(now).is_empty());
}

#[rstest]
fn update_reports_only_changed_fields(now: DateTime<Utc>) {
    let mut clause = draft(now);
    let later = now + Duration::hours(1);

    let changes = clause
        .apply_update(
            LenderClauseUpdate {
                title: Some("Early repayment".to_owned()),
                content: Some("New body".to_owned()),
                description: Some(Some("Revised".to_owned())),
            },
            later,
        )
        .expect("valid update");

    let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
    assert_eq!(fields, vec!["content", "description"]);
    assert_eq!(clause.content(), "New body");
    assert_eq!(clause.description(), Some("Revised"));
    assert_eq!(clause.last_updated(), later);
    assert_eq!(clause.version(), 1);
}

#[rstest]
fn empty_update_keeps_timestamps(now: DateTime<Utc>) {
    let mut clause = draft(now);

    let changes = clause
        .apply_update(LenderClauseUpdate::default(), now + Duration::hours(1))
        .expect("empty update is valid");

    assert!(changes.is_empty());
    assert_eq!(clause.updated_at(), now);
}

#[rstest]
fn invalid_update_leaves_clause_untouched(now: DateTime<Utc>) {
    let mut clause = draft(now);
    let before = clause.clone();

    let result = clause.apply_update(
        LenderClauseUpdate {
            title: Some("Changed".to_owned()),
            content: Some(String::new()),
            description: None,
        },
        now,
    );

    assert!(result.is_err());
    assert_eq!(clause, before);
}

#[rstest]
fn renders_content_with_substitutions(now: DateTime<Utc>) {
    let clause = draft(now);
    let mut values = Substitutions::new();
    values.insert("loan_amount".to_owned(), "£100".to_owned());

    assert_eq!(
        clause.rendered_content(&values),
        "<h2>Early repayment</h2>\n<p>Pay £100.</p>"
    );
    assert!(clause.rendered_preview_content().contains("£250,000.00"));
    assert_eq!(
        clause.placeholders().into_iter().collect::<Vec<_>>(),
        vec!["loan_amount".to_owned()]
    );
}

#[rstest]
fn rehydration_never_yields_active_drafts(now: DateTime<Utc>) {
    let clause = LenderClause::from(LenderClauseRecord {
        id: LenderClauseId::random(),
        lender_id: LenderId::random(),
        title: "T".to_owned(),
        content: "C".to_owned(),
        description: None,
        version: 3,
        is_draft: true,
        is_active: true,
        last_updated: now,
        created_by: UserId::random(),
        created_at: now,
        updated_at: now,
    });

    assert!(!clause.is_active());
}
