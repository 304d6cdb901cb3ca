//! Tests for the lender clause service.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use mockable::MockClock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::clauses::{LenderClauseInput, VersionAction};
use crate::domain::ports::MockLenderClauseRepository;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

fn clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(now());
    Arc::new(clock)
}

fn service(repo: MockLenderClauseRepository) -> LenderClauseService<MockLenderClauseRepository> {
    LenderClauseService::new(Arc::new(repo), clock())
}

#[fixture]
fn draft() -> LenderClause {
    NewLenderClause::new(
        LenderClauseInput {
            lender_id: LenderId::random(),
            title: "Early repayment".to_owned(),
            content: "Lender: {{lender_name}}".to_owned(),
            description: None,
        },
        UserId::random(),
        now(),
    )
    .expect("valid clause")
    .into_clause(3)
}

#[fixture]
fn published(draft: LenderClause) -> LenderClause {
    let mut clause = draft;
    clause.publish(now());
    clause
}

#[rstest]
#[tokio::test]
async fn create_passes_the_validated_draft_to_the_repository() {
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_create()
        .withf(|clause| clause.title == "Title" && clause.creation_entry().action == VersionAction::Created)
        .times(1)
        .returning(|clause| Ok(clause.clone().into_clause(1)));

    let clause = service(repo)
        .create_clause(
            LenderId::random(),
            CreateLenderClauseRequest {
                title: "  Title ".to_owned(),
                content: "Body".to_owned(),
                description: None,
            },
            UserId::random(),
        )
        .await
        .expect("create succeeds");

    assert!(clause.is_draft());
    assert_eq!(clause.version(), 1);
}

#[rstest]
#[tokio::test]
async fn create_rejects_invalid_input_before_touching_storage() {
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_create().times(0);

    let err = service(repo)
        .create_clause(
            LenderId::random(),
            CreateLenderClauseRequest {
                title: String::new(),
                content: String::new(),
                description: None,
            },
            UserId::random(),
        )
        .await
        .expect_err("invalid input");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(err.field_errors().len(), 2);
}

#[rstest]
#[tokio::test]
async fn update_writes_one_entry_listing_changed_fields(draft: LenderClause) {
    let id = draft.id();
    let actor = UserId::random();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(draft)));
    repo.expect_save()
        .withf(move |loaded, clause, entry| {
            loaded.content() == "Lender: {{lender_name}}"
                && clause.content() == "New body"
                && entry.user_id == actor
                && entry.action == VersionAction::Updated
                && entry.changes.len() == 1
                && entry.changes[0].field == "content"
        })
        .times(1)
        .returning(|_, _, _| Ok(()));

    let clause = service(repo)
        .update_clause(
            id,
            UpdateLenderClauseRequest {
                content: Some("New body".to_owned()),
                ..UpdateLenderClauseRequest::default()
            },
            actor,
        )
        .await
        .expect("update succeeds");

    assert_eq!(clause.version(), 3, "updates never change the version");
}

#[rstest]
#[tokio::test]
async fn no_op_update_writes_nothing(draft: LenderClause) {
    let id = draft.id();
    let title = draft.title().to_owned();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(draft)));
    repo.expect_save().times(0);

    service(repo)
        .update_clause(
            id,
            UpdateLenderClauseRequest {
                title: Some(title),
                ..UpdateLenderClauseRequest::default()
            },
            UserId::random(),
        )
        .await
        .expect("no-op update succeeds");
}

#[rstest]
#[tokio::test]
async fn publishing_twice_is_a_no_op(published: LenderClause) {
    let id = published.id();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(published)));
    repo.expect_save().times(0);

    let clause = service(repo)
        .publish_clause(id, UserId::random())
        .await
        .expect("publish succeeds");

    assert!(clause.is_published());
}

#[rstest]
#[tokio::test]
async fn activating_a_draft_is_an_invalid_request(draft: LenderClause) {
    let id = draft.id();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(draft)));
    repo.expect_save().times(0);

    let err = service(repo)
        .activate_clause(id, UserId::random())
        .await
        .expect_err("draft activation rejected");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert!(err.message().contains("published"));
}

#[rstest]
#[tokio::test]
async fn activating_a_published_clause_records_the_flag(published: LenderClause) {
    let id = published.id();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(published)));
    repo.expect_save()
        .withf(|_, clause, entry| clause.is_active() && entry.changes[0].field == "is_active")
        .times(1)
        .returning(|_, _, _| Ok(()));

    let clause = service(repo)
        .activate_clause(id, UserId::random())
        .await
        .expect("activation succeeds");

    assert!(clause.is_active());
}

#[rstest]
#[tokio::test]
async fn unknown_clause_is_not_found() {
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id().return_once(|_| Ok(None));

    let err = service(repo)
        .get_clause(LenderClauseId::random())
        .await
        .expect_err("missing clause");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test]
async fn preview_uses_sample_values(draft: LenderClause) {
    let id = draft.id();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(draft)));

    let preview = service(repo)
        .preview_clause(id)
        .await
        .expect("preview succeeds");

    assert_eq!(preview.html, "<p>Lender: Sample Lender Ltd</p>");
    assert_eq!(preview.placeholders, vec!["lender_name".to_owned()]);
}

#[rstest]
#[tokio::test]
async fn preview_markup_needs_no_storage() {
    let repo = MockLenderClauseRepository::new();

    let preview = service(repo)
        .preview_markup("## Heading\n\n- {{unknown_field}}".to_owned())
        .await
        .expect("preview succeeds");

    assert_eq!(
        preview.html,
        "<h2>Heading</h2>\n<ul>\n<li>{{unknown_field}}</li>\n</ul>"
    );
}

#[rstest]
#[case(LenderClauseRepositoryError::connection("down"), ErrorCode::ServiceUnavailable)]
#[case(LenderClauseRepositoryError::query("bad"), ErrorCode::InternalError)]
#[case(LenderClauseRepositoryError::missing_reference("gone"), ErrorCode::NotFound)]
#[case(LenderClauseRepositoryError::conflict("stale"), ErrorCode::Conflict)]
#[tokio::test]
async fn repository_errors_map_to_domain_codes(
    #[case] failure: LenderClauseRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_list_for_lender()
        .return_once(move |_| Err(failure));

    let err = service(repo)
        .list_clauses(LenderId::random())
        .await
        .expect_err("repository failure");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn stale_save_is_a_conflict(published: LenderClause) {
    let id = published.id();
    let mut repo = MockLenderClauseRepository::new();
    repo.expect_find_by_id()
        .return_once(move |_| Ok(Some(published)));
    repo.expect_save()
        .times(1)
        .returning(|_, clause, _| {
            Err(LenderClauseRepositoryError::conflict(format!(
                "lender clause {} changed since it was loaded",
                clause.id()
            )))
        });

    let err = service(repo)
        .activate_clause(id, UserId::random())
        .await
        .expect_err("stale write rejected");

    assert_eq!(err.code(), ErrorCode::Conflict);
}
