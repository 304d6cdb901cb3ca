//! Integration tests for `DieselLenderClauseRepository`.
//!
//! Checks version allocation, the audit trail and stale-write rejection
//! against embedded PostgreSQL.

use chrono::Utc;
use futureproof_backend::domain::clauses::{
    LenderClause, LenderClauseInput, LenderClauseUpdate, NewLenderClause,
    NewLenderClauseVersion, VersionAction,
};
use futureproof_backend::domain::ports::{LenderClauseRepository, LenderClauseRepositoryError};
use futureproof_backend::domain::{LenderId, UserId};
use futureproof_backend::outbound::persistence::DieselLenderClauseRepository;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use postgres::{Client, NoTls};
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;
use uuid::Uuid;

mod support;

use support::pg_embed::shared_cluster;
use support::{
    connect_pool, format_postgres_error, handle_cluster_setup_failure,
    provision_template_database,
};

struct TestContext {
    runtime: Runtime,
    repository: DieselLenderClauseRepository,
    lenders: [LenderId; 2],
    actor: UserId,
    _database: TemporaryDatabase,
}

fn seed_lenders(url: &str) -> Result<[Uuid; 2], String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let lenders = [Uuid::new_v4(), Uuid::new_v4()];
    for (lender, name) in lenders.iter().zip(["Harbour Homes", "Quayside Loans"]) {
        client
            .execute(
                "INSERT INTO lenders (id, name) VALUES ($1, $2)",
                &[lender, &name],
            )
            .map_err(|err| format_postgres_error(&err))?;
    }
    Ok(lenders)
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster)?;
    let database_url = database.url().to_owned();
    let lenders = seed_lenders(&database_url)?.map(LenderId::from_uuid);
    let pool = connect_pool(&runtime, &database_url)?;

    Ok(TestContext {
        runtime,
        repository: DieselLenderClauseRepository::new(pool),
        lenders,
        actor: UserId::random(),
        _database: database,
    })
}

impl TestContext {
    fn create(&self, lender_id: LenderId, title: &str) -> LenderClause {
        let draft = NewLenderClause::new(
            LenderClauseInput {
                lender_id,
                title: title.to_owned(),
                content: "Pay early.".to_owned(),
                description: None,
            },
            self.actor,
            Utc::now(),
        )
        .expect("valid clause");
        self.runtime
            .block_on(self.repository.create(&draft))
            .expect("create clause")
    }

    fn load(&self, clause: &LenderClause) -> LenderClause {
        self.runtime
            .block_on(self.repository.find_by_id(clause.id()))
            .expect("load clause")
            .expect("clause exists")
    }
}

#[fixture]
fn repo_context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

#[rstest]
fn versions_are_consecutive_per_lender(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: versions_are_consecutive_per_lender skipped");
        return;
    };
    let [harbour, quayside] = context.lenders;

    let versions: Vec<_> = [
        (harbour, "First"),
        (harbour, "Second"),
        (quayside, "Elsewhere"),
        (harbour, "Third"),
    ]
    .into_iter()
    .map(|(lender, title)| {
        let clause = context.create(lender, title);
        (clause.lender_id(), clause.version())
    })
    .collect();

    assert_eq!(
        versions,
        vec![(harbour, 1), (harbour, 2), (quayside, 1), (harbour, 3)]
    );
    let listed: Vec<_> = context
        .runtime
        .block_on(context.repository.list_for_lender(harbour))
        .expect("list clauses")
        .iter()
        .map(LenderClause::version)
        .collect();
    assert_eq!(listed, vec![3, 2, 1]);
}

#[rstest]
fn unknown_lender_is_a_missing_reference(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: unknown_lender_is_a_missing_reference skipped");
        return;
    };
    let draft = NewLenderClause::new(
        LenderClauseInput {
            lender_id: LenderId::random(),
            title: "Orphan".to_owned(),
            content: "Body".to_owned(),
            description: None,
        },
        context.actor,
        Utc::now(),
    )
    .expect("valid clause");

    let err = context
        .runtime
        .block_on(context.repository.create(&draft))
        .expect_err("lender does not exist");

    assert!(matches!(
        err,
        LenderClauseRepositoryError::MissingReference { .. }
    ));
}

#[rstest]
fn saves_append_one_audit_entry_each(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: saves_append_one_audit_entry_each skipped");
        return;
    };
    let created = context.create(context.lenders[0], "Early repayment");
    let loaded = context.load(&created);
    let mut published = loaded.clone();
    let changes = published.publish(Utc::now());

    context
        .runtime
        .block_on(context.repository.save(
            &loaded,
            &published,
            &NewLenderClauseVersion::updated(created.id(), context.actor, changes, Utc::now()),
        ))
        .expect("save clause");

    let history = context
        .runtime
        .block_on(context.repository.list_versions(created.id()))
        .expect("list versions");
    let actions: Vec<_> = history.iter().map(|entry| entry.action).collect();
    assert_eq!(actions, vec![VersionAction::Created, VersionAction::Updated]);
    let fields: Vec<_> = history
        .last()
        .map(|entry| entry.changes.iter().map(|change| change.field.as_str()).collect())
        .unwrap_or_default();
    assert_eq!(fields, vec!["is_draft"]);
    assert!(context.load(&created).is_published());
}

#[rstest]
fn a_save_from_a_stale_copy_is_rejected(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: a_save_from_a_stale_copy_is_rejected skipped");
        return;
    };
    let created = context.create(context.lenders[0], "Early repayment");
    let first = context.load(&created);
    let second = context.load(&created);

    let mut edited = first.clone();
    let edit_changes = edited
        .apply_update(
            LenderClauseUpdate {
                content: Some("Pay whenever.".to_owned()),
                ..LenderClauseUpdate::default()
            },
            Utc::now(),
        )
        .expect("valid update");
    context
        .runtime
        .block_on(context.repository.save(
            &first,
            &edited,
            &NewLenderClauseVersion::updated(
                created.id(),
                context.actor,
                edit_changes,
                Utc::now(),
            ),
        ))
        .expect("first save");

    let mut published = second.clone();
    let publish_changes = published.publish(Utc::now());
    let err = context
        .runtime
        .block_on(context.repository.save(
            &second,
            &published,
            &NewLenderClauseVersion::updated(
                created.id(),
                context.actor,
                publish_changes,
                Utc::now(),
            ),
        ))
        .expect_err("stale save rejected");
    assert!(matches!(err, LenderClauseRepositoryError::Conflict { .. }));

    let stored = context.load(&created);
    assert_eq!(stored.content(), "Pay whenever.");
    assert!(stored.is_draft());
    let history = context
        .runtime
        .block_on(context.repository.list_versions(created.id()))
        .expect("list versions");
    assert_eq!(history.len(), 2, "the rejected save writes no audit entry");
}
