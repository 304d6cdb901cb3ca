//! Tests for the funding relationship service.

use std::sync::Arc;

use mockable::MockClock;
use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::funding::fixtures::{parent_link, pool_link, timestamp, wholesale_funder};
use crate::domain::funding::WholesaleFunder;
use crate::domain::ports::MockFunderRelationshipRepository;

struct Setup {
    lender: LenderId,
    funder: WholesaleFunder,
}

#[fixture]
fn setup() -> Setup {
    Setup {
        lender: LenderId::random(),
        funder: wholesale_funder("Northwind Capital"),
    }
}

fn clock() -> Arc<dyn Clock> {
    let mut clock = MockClock::new();
    clock.expect_utc().return_const(timestamp());
    Arc::new(clock)
}

fn service(repo: MockFunderRelationshipRepository) -> FunderActivationService<MockFunderRelationshipRepository> {
    FunderActivationService::new(Arc::new(repo), clock())
}

#[rstest]
#[tokio::test]
async fn toggling_an_active_wholesale_funder_runs_the_cascade(setup: Setup) {
    let parent = parent_link(setup.lender, &setup.funder, true);
    let mut deactivated_parent = parent.clone();
    deactivated_parent.active = false;
    let pools = vec![
        pool_link(setup.lender, &setup.funder, "Pool 1", false),
        pool_link(setup.lender, &setup.funder, "Pool 2", false),
    ];
    let outcome = CascadeOutcome {
        wholesale_funder: deactivated_parent,
        deactivated_pools: pools,
    };

    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_wholesale_funder_link()
        .times(1)
        .return_once(move |_, _| Ok(Some(parent)));
    repo.expect_deactivate_wholesale_funder_link_cascade()
        .times(1)
        .return_once(move |_, _, _| Ok(Some(outcome)));
    repo.expect_activate_wholesale_funder_link().times(0);

    let toggle = service(repo)
        .toggle_wholesale_funder(setup.lender, setup.funder.id)
        .await
        .expect("toggle succeeds");

    assert!(!toggle.relationship().active);
    assert_eq!(
        toggle.summary(),
        "Wholesale funder 'Northwind Capital' deactivated. 2 funder pool relationships were also deactivated."
    );
}

#[rstest]
#[tokio::test]
async fn toggling_an_inactive_wholesale_funder_activates_it_alone(setup: Setup) {
    let parent = parent_link(setup.lender, &setup.funder, false);
    let mut activated = parent.clone();
    activated.active = true;

    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_wholesale_funder_link()
        .return_once(move |_, _| Ok(Some(parent)));
    repo.expect_activate_wholesale_funder_link()
        .times(1)
        .return_once(move |_, _, _| Ok(Some(activated)));
    repo.expect_deactivate_wholesale_funder_link_cascade().times(0);

    let toggle = service(repo)
        .toggle_wholesale_funder(setup.lender, setup.funder.id)
        .await
        .expect("toggle succeeds");

    assert!(matches!(toggle, WholesaleFunderToggle::Activated(_)));
    assert_eq!(toggle.summary(), "Wholesale funder 'Northwind Capital' activated.");
}

#[rstest]
#[tokio::test]
async fn blocked_pool_activation_reports_the_wholesale_funder(setup: Setup) {
    let pool = pool_link(setup.lender, &setup.funder, "Pool 1", false);
    let blocked = pool.clone();

    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_funder_pool_link()
        .return_once(move |_, _| Ok(Some(pool)));
    repo.expect_activate_funder_pool_link()
        .times(1)
        .return_once(move |_, _, _| Ok(Some(PoolActivation::Blocked(blocked))));

    let err = service(repo)
        .toggle_funder_pool(setup.lender, FunderPoolId::random())
        .await
        .expect_err("activation blocked");

    assert_eq!(err.code(), ErrorCode::ActivationBlocked);
    assert!(err.message().contains("Northwind Capital"));
    assert!(err.message().ends_with("Activate 'Northwind Capital' first."));
    let details = err.details().expect("blocked error carries details");
    assert_eq!(details["wholesaleFunderName"], "Northwind Capital");
    assert_eq!(details["funderPoolName"], "Pool 1");
}

#[rstest]
#[tokio::test]
async fn toggling_an_active_pool_deactivates_without_checking_the_parent(setup: Setup) {
    let pool = pool_link(setup.lender, &setup.funder, "Pool 1", true);
    let mut off = pool.clone();
    off.active = false;

    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_funder_pool_link()
        .return_once(move |_, _| Ok(Some(pool)));
    repo.expect_find_wholesale_funder_link().times(0);
    repo.expect_deactivate_funder_pool_link()
        .times(1)
        .return_once(move |_, _, _| Ok(Some(off)));

    let link = service(repo)
        .toggle_funder_pool(setup.lender, FunderPoolId::random())
        .await
        .expect("deactivation succeeds");

    assert!(!link.active);
}

#[rstest]
#[case(Some(true), true)]
#[case(Some(false), false)]
#[case(None, false)]
#[tokio::test]
async fn can_activate_reflects_parent_state(
    setup: Setup,
    #[case] parent_active: Option<bool>,
    #[case] expected: bool,
) {
    let pool = pool_link(setup.lender, &setup.funder, "Pool 1", false);
    let parent = parent_active.map(|active| parent_link(setup.lender, &setup.funder, active));

    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_funder_pool_link()
        .return_once(move |_, _| Ok(Some(pool)));
    repo.expect_find_wholesale_funder_link()
        .return_once(move |_, _| Ok(parent));

    let check = service(repo)
        .can_activate_funder_pool(setup.lender, FunderPoolId::random())
        .await
        .expect("check succeeds");

    assert_eq!(check.can_activate, expected);
    assert_eq!(check.reason.is_some(), !expected);
}

#[rstest]
#[tokio::test]
async fn missing_relationship_is_not_found(setup: Setup) {
    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_find_wholesale_funder_link()
        .return_once(|_, _| Ok(None));

    let err = service(repo)
        .toggle_wholesale_funder(setup.lender, setup.funder.id)
        .await
        .expect_err("missing link");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[case(FunderRelationshipRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(FunderRelationshipRepositoryError::query("syntax"), ErrorCode::InternalError)]
#[case(FunderRelationshipRepositoryError::duplicate("pair"), ErrorCode::Conflict)]
#[case(FunderRelationshipRepositoryError::missing_reference("no parent"), ErrorCode::NotFound)]
#[tokio::test]
async fn repository_errors_map_to_domain_codes(
    setup: Setup,
    #[case] failure: FunderRelationshipRepositoryError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_create_funder_pool_link()
        .return_once(move |_, _, _| Err(failure));

    let err = service(repo)
        .attach_funder_pool(setup.lender, FunderPoolId::random())
        .await
        .expect_err("repository failure");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[tokio::test]
async fn detaching_a_missing_pool_is_not_found(setup: Setup) {
    let mut repo = MockFunderRelationshipRepository::new();
    repo.expect_delete_funder_pool_link()
        .return_once(|_, _| Ok(false));

    let err = service(repo)
        .detach_funder_pool(setup.lender, FunderPoolId::random())
        .await
        .expect_err("nothing to detach");

    assert_eq!(err.code(), ErrorCode::NotFound);
}
