//! Integration tests for `DieselContractClauseRepository`.
//!
//! Exercises usage replacement and reactivation against embedded
//! PostgreSQL, where the partial unique index allows one active usage per
//! contract position. Timestamps are truncated to whole seconds so they
//! survive the round trip through `TIMESTAMPTZ` unchanged.

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use futureproof_backend::domain::clauses::{
    ClausePosition, DEFAULT_CLAUSE_POSITIONS, LenderClause, LenderClauseInput, NewLenderClause,
    NewLenderClauseVersion,
};
use futureproof_backend::domain::contracts::{ContractClauseUsage, MortgageContract};
use futureproof_backend::domain::ports::{
    ClausePositionRepository, ContractClauseRepository, LenderClauseRepository,
};
use futureproof_backend::domain::{LenderId, MortgageContractId, UserId};
use futureproof_backend::outbound::persistence::{
    DieselClausePositionRepository, DieselContractClauseRepository, DieselLenderClauseRepository,
};
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
    contracts: DieselContractClauseRepository,
    clauses: DieselLenderClauseRepository,
    contract: MortgageContract,
    position: ClausePosition,
    actor: UserId,
    _database: TemporaryDatabase,
}

fn seed_contract(url: &str) -> Result<(Uuid, Uuid), String> {
    let mut client = Client::connect(url, NoTls).map_err(|err| format_postgres_error(&err))?;
    let lender = Uuid::new_v4();
    let contract = Uuid::new_v4();
    client
        .execute(
            "INSERT INTO lenders (id, name) VALUES ($1, 'Harbour Homes')",
            &[&lender],
        )
        .map_err(|err| format_postgres_error(&err))?;
    client
        .execute(
            "INSERT INTO mortgage_contracts (id, lender_id, reference, version) \
             VALUES ($1, $2, 'MC-2001', 2)",
            &[&contract, &lender],
        )
        .map_err(|err| format_postgres_error(&err))?;
    Ok((lender, contract))
}

fn setup_context() -> Result<TestContext, String> {
    let runtime = Runtime::new().map_err(|err| err.to_string())?;
    let cluster = shared_cluster()?;
    let database = provision_template_database(cluster)?;
    let database_url = database.url().to_owned();
    let (_, contract_id) = seed_contract(&database_url)?;
    let pool = connect_pool(&runtime, &database_url)?;

    let positions = DieselClausePositionRepository::new(pool.clone());
    let contracts = DieselContractClauseRepository::new(pool.clone());
    let (contract, position) = runtime.block_on(async {
        positions
            .seed(&DEFAULT_CLAUSE_POSITIONS)
            .await
            .map_err(|err| err.to_string())?;
        let position = positions
            .find_by_section("before_signatures")
            .await
            .map_err(|err| err.to_string())?
            .ok_or("seeded position missing")?;
        let contract = contracts
            .find_contract(MortgageContractId::from_uuid(contract_id))
            .await
            .map_err(|err| err.to_string())?
            .ok_or("seeded contract missing")?;
        Ok::<_, String>((contract, position))
    })?;

    Ok(TestContext {
        runtime,
        contracts,
        clauses: DieselLenderClauseRepository::new(pool),
        contract,
        position,
        actor: UserId::random(),
        _database: database,
    })
}

impl TestContext {
    fn lender(&self) -> LenderId {
        self.contract.lender_id
    }

    fn active_clause(&self, title: &str, content: &str) -> LenderClause {
        let draft = NewLenderClause::new(
            LenderClauseInput {
                lender_id: self.lender(),
                title: title.to_owned(),
                content: content.to_owned(),
                description: None,
            },
            self.actor,
            Utc::now(),
        )
        .expect("valid clause");
        self.runtime.block_on(async {
            let created = self.clauses.create(&draft).await.expect("create clause");
            let loaded = self
                .clauses
                .find_by_id(created.id())
                .await
                .expect("load clause")
                .expect("clause exists");
            let mut clause = loaded.clone();
            let mut changes = clause.publish(Utc::now());
            changes.extend(clause.activate(Utc::now()).expect("published clause activates"));
            self.clauses
                .save(
                    &loaded,
                    &clause,
                    &NewLenderClauseVersion::updated(clause.id(), self.actor, changes, Utc::now()),
                )
                .await
                .expect("save clause");
            clause
        })
    }

    fn place(
        &self,
        clause: &LenderClause,
        at: DateTime<Utc>,
    ) -> (ContractClauseUsage, Option<ContractClauseUsage>) {
        let usage =
            ContractClauseUsage::capture(&self.contract, clause, &self.position, self.actor, at)
                .expect("capture usage");
        let retired = self
            .runtime
            .block_on(self.contracts.insert_replacing_active(&usage, self.actor, at))
            .expect("insert usage");
        (usage, retired)
    }

    fn usages(&self) -> Vec<ContractClauseUsage> {
        self.runtime
            .block_on(self.contracts.list_usages(self.contract.id))
            .expect("list usages")
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
fn inserting_into_an_occupied_position_retires_the_previous_usage(
    repo_context: Option<TestContext>,
) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: inserting_into_an_occupied_position_retires_the_previous_usage skipped"
        );
        return;
    };
    let early = context.active_clause("Early repayment", "Pay early.");
    let late = context.active_clause("Late repayment", "Pay late.");
    let first_at = Utc::now().trunc_subsecs(0);
    let second_at = first_at + TimeDelta::minutes(10);

    let (first, nothing_replaced) = context.place(&early, first_at);
    assert!(nothing_replaced.is_none());
    let (second, replaced) = context.place(&late, second_at);

    let retired = replaced.expect("previous usage retired");
    assert_eq!(retired.id(), first.id());
    assert!(!retired.is_active());
    assert_eq!(retired.removed_by(), Some(context.actor));

    let usages = context.usages();
    let active: Vec<_> = usages.iter().filter(|usage| usage.is_active()).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active.first().map(|usage| usage.id()), Some(second.id()));
    assert_eq!(
        active.first().map(|usage| usage.clause_content_snapshot()),
        Some("Pay late.")
    );
    assert_eq!(second.contract_version_at_usage(), 2);
}

#[rstest]
fn reactivation_clears_removal_and_retires_the_replacement(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!(
            "SKIP-TEST-CLUSTER: reactivation_clears_removal_and_retires_the_replacement skipped"
        );
        return;
    };
    let early = context.active_clause("Early repayment", "Pay early.");
    let late = context.active_clause("Late repayment", "Pay late.");
    let first_at = Utc::now().trunc_subsecs(0);
    let (first, _) = context.place(&early, first_at);
    let (second, _) = context.place(&late, first_at + TimeDelta::minutes(10));

    let mut revived = context
        .runtime
        .block_on(context.contracts.find_usage(first.id()))
        .expect("load usage")
        .expect("usage exists");
    assert!(revived.removed_at().is_some());
    assert!(revived.reactivate());

    let retired = context
        .runtime
        .block_on(context.contracts.reactivate_replacing_active(
            &revived,
            context.actor,
            first_at + TimeDelta::minutes(20),
        ))
        .expect("reactivate usage")
        .expect("replacement retired");
    assert_eq!(retired.id(), second.id());

    let stored = context
        .runtime
        .block_on(context.contracts.find_usage(first.id()))
        .expect("load usage")
        .expect("usage exists");
    assert!(stored.is_active());
    assert_eq!(stored.removed_by(), None);
    assert_eq!(stored.removed_at(), None);
    assert_eq!(stored.added_at(), first.added_at());

    let active: Vec<_> = context
        .usages()
        .into_iter()
        .filter(ContractClauseUsage::is_active)
        .map(|usage| usage.id())
        .collect();
    assert_eq!(active, vec![first.id()]);
}

#[rstest]
fn removing_a_usage_only_succeeds_once(repo_context: Option<TestContext>) {
    let Some(context) = repo_context else {
        eprintln!("SKIP-TEST-CLUSTER: removing_a_usage_only_succeeds_once skipped");
        return;
    };
    let clause = context.active_clause("Early repayment", "Pay early.");
    let placed_at = Utc::now().trunc_subsecs(0);
    let (mut usage, _) = context.place(&clause, placed_at);
    assert!(usage.retire(context.actor, placed_at + TimeDelta::minutes(5)));

    let first = context
        .runtime
        .block_on(context.contracts.mark_removed(&usage))
        .expect("remove usage");
    let second = context
        .runtime
        .block_on(context.contracts.mark_removed(&usage))
        .expect("remove usage again");

    assert!(first);
    assert!(!second);
    assert!(context.usages().iter().all(|stored| !stored.is_active()));
}
