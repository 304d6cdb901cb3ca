//! In-memory implementation of every lending repository port.
//!
//! A single mutex guards the whole store, so each repository call is atomic
//! in the same way the Diesel adapters wrap their calls in a transaction.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::clauses::{
    ClausePosition, ClausePositionSeed, LenderClause, LenderClauseVersion, NewLenderClause,
    NewLenderClauseVersion,
};
use crate::domain::contracts::{ContractClauseUsage, MortgageContract};
use crate::domain::funding::{
    CascadeOutcome, FunderPool, LenderFunderPool, LenderFundingRelationships,
    LenderWholesaleFunder, WholesaleFunder, can_activate,
};
use crate::domain::ports::{
    ClausePositionRepository, ClausePositionRepositoryError, ContractClauseRepository,
    ContractClauseRepositoryError, FunderRelationshipRepository,
    FunderRelationshipRepositoryError, LenderClauseRepository, LenderClauseRepositoryError,
    PoolActivation,
};
use crate::domain::{
    ClausePositionId, ContractClauseUsageId, FunderPoolId, LenderClauseId,
    LenderClauseVersionId, LenderFunderPoolId, LenderId, LenderWholesaleFunderId,
    MortgageContractId, UserId, WholesaleFunderId,
};

#[derive(Debug, Default)]
struct State {
    lenders: BTreeMap<LenderId, String>,
    wholesale_funders: BTreeMap<WholesaleFunderId, WholesaleFunder>,
    funder_pools: BTreeMap<FunderPoolId, FunderPool>,
    wholesale_funder_links: Vec<LenderWholesaleFunder>,
    funder_pool_links: Vec<LenderFunderPool>,
    clauses: BTreeMap<LenderClauseId, LenderClause>,
    versions: Vec<LenderClauseVersion>,
    positions: Vec<ClausePosition>,
    contracts: BTreeMap<MortgageContractId, MortgageContract>,
    usages: Vec<ContractClauseUsage>,
}

impl State {
    fn parent_link_mut(
        &mut self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Option<&mut LenderWholesaleFunder> {
        self.wholesale_funder_links.iter_mut().find(|link| {
            link.lender_id == lender_id && link.wholesale_funder.id == wholesale_funder_id
        })
    }

    fn pool_link_mut(
        &mut self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Option<&mut LenderFunderPool> {
        self.funder_pool_links
            .iter_mut()
            .find(|link| link.lender_id == lender_id && link.funder_pool.id == funder_pool_id)
    }

    fn retire_active_at(
        &mut self,
        contract_id: MortgageContractId,
        position_id: ClausePositionId,
        except: ContractClauseUsageId,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Option<ContractClauseUsage> {
        let usage = self.usages.iter_mut().find(|usage| {
            usage.mortgage_contract_id() == contract_id
                && usage.clause_position_id() == position_id
                && usage.id() != except
                && usage.is_active()
        })?;
        usage.retire(retired_by, at);
        Some(usage.clone())
    }
}

/// Process-local lending store for tests.
#[derive(Debug, Default)]
pub struct InMemoryLendingStore {
    state: Mutex<State>,
}

impl InMemoryLendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a lender.
    pub fn add_lender(&self, name: &str) -> LenderId {
        let id = LenderId::random();
        self.lock().lenders.insert(id, name.to_owned());
        id
    }

    /// Register a wholesale funder.
    pub fn add_wholesale_funder(&self, name: &str) -> WholesaleFunder {
        let funder = WholesaleFunder {
            id: WholesaleFunderId::random(),
            name: name.to_owned(),
        };
        self.lock()
            .wholesale_funders
            .insert(funder.id, funder.clone());
        funder
    }

    /// Register a pool owned by `funder`.
    pub fn add_funder_pool(&self, funder: &WholesaleFunder, name: &str) -> FunderPool {
        let pool = FunderPool {
            id: FunderPoolId::random(),
            name: name.to_owned(),
            wholesale_funder: funder.clone(),
            total_amount: 10_000_000,
            allocated_amount: 0,
        };
        self.lock().funder_pools.insert(pool.id, pool.clone());
        pool
    }

    /// Register a contract for `lender_id`.
    pub fn add_contract(
        &self,
        lender_id: LenderId,
        reference: &str,
        version: u32,
        at: DateTime<Utc>,
    ) -> MortgageContract {
        let contract = MortgageContract {
            id: MortgageContractId::random(),
            lender_id,
            reference: reference.to_owned(),
            version,
            created_at: at,
            updated_at: at,
        };
        self.lock().contracts.insert(contract.id, contract.clone());
        contract
    }

    /// Current wholesale funder links.
    pub fn wholesale_funder_links(&self) -> Vec<LenderWholesaleFunder> {
        self.lock().wholesale_funder_links.clone()
    }

    /// Current funder pool links.
    pub fn funder_pool_links(&self) -> Vec<LenderFunderPool> {
        self.lock().funder_pool_links.clone()
    }

    /// Every stored usage.
    pub fn usages(&self) -> Vec<ContractClauseUsage> {
        self.lock().usages.clone()
    }
}

#[async_trait]
impl FunderRelationshipRepository for InMemoryLendingStore {
    async fn find_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError> {
        Ok(self
            .lock()
            .parent_link_mut(lender_id, wholesale_funder_id)
            .map(|link| link.clone()))
    }

    async fn find_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError> {
        Ok(self
            .lock()
            .pool_link_mut(lender_id, funder_pool_id)
            .map(|link| link.clone()))
    }

    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<LenderFundingRelationships, FunderRelationshipRepositoryError> {
        let state = self.lock();
        let mut wholesale_funders: Vec<_> = state
            .wholesale_funder_links
            .iter()
            .filter(|link| link.lender_id == lender_id)
            .cloned()
            .collect();
        wholesale_funders.sort_by(|a, b| a.wholesale_funder.name.cmp(&b.wholesale_funder.name));
        let mut funder_pools: Vec<_> = state
            .funder_pool_links
            .iter()
            .filter(|link| link.lender_id == lender_id)
            .cloned()
            .collect();
        funder_pools.sort_by(|a, b| {
            a.wholesale_funder()
                .name
                .cmp(&b.wholesale_funder().name)
                .then_with(|| a.funder_pool.name.cmp(&b.funder_pool.name))
        });
        Ok(LenderFundingRelationships {
            wholesale_funders,
            funder_pools,
        })
    }

    async fn create_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        active: bool,
        at: DateTime<Utc>,
    ) -> Result<LenderWholesaleFunder, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        if !state.lenders.contains_key(&lender_id) {
            return Err(FunderRelationshipRepositoryError::missing_reference(format!(
                "lender {lender_id} does not exist"
            )));
        }
        let funder = state
            .wholesale_funders
            .get(&wholesale_funder_id)
            .cloned()
            .ok_or_else(|| {
                FunderRelationshipRepositoryError::missing_reference(format!(
                    "wholesale funder {wholesale_funder_id} does not exist"
                ))
            })?;
        if state.parent_link_mut(lender_id, wholesale_funder_id).is_some() {
            return Err(FunderRelationshipRepositoryError::duplicate(format!(
                "lender {lender_id} is already linked to '{}'",
                funder.name
            )));
        }
        let link = LenderWholesaleFunder {
            id: LenderWholesaleFunderId::random(),
            lender_id,
            wholesale_funder: funder,
            active,
            created_at: at,
            updated_at: at,
        };
        state.wholesale_funder_links.push(link.clone());
        Ok(link)
    }

    async fn create_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<LenderFunderPool, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        let pool = state.funder_pools.get(&funder_pool_id).cloned().ok_or_else(|| {
            FunderRelationshipRepositoryError::missing_reference(format!(
                "funder pool {funder_pool_id} does not exist"
            ))
        })?;
        let parent_active = state
            .parent_link_mut(lender_id, pool.wholesale_funder.id)
            .map(|parent| parent.active)
            .ok_or_else(|| {
                FunderRelationshipRepositoryError::missing_reference(format!(
                    "lender has no relationship with wholesale funder '{}'",
                    pool.wholesale_funder.name
                ))
            })?;
        if state.pool_link_mut(lender_id, funder_pool_id).is_some() {
            return Err(FunderRelationshipRepositoryError::duplicate(format!(
                "lender {lender_id} is already linked to pool '{}'",
                pool.name
            )));
        }
        let link = LenderFunderPool {
            id: LenderFunderPoolId::random(),
            lender_id,
            funder_pool: pool,
            active: parent_active,
            created_at: at,
            updated_at: at,
        };
        state.funder_pool_links.push(link.clone());
        Ok(link)
    }

    async fn activate_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderWholesaleFunder>, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        Ok(state
            .parent_link_mut(lender_id, wholesale_funder_id)
            .map(|link| {
                link.active = true;
                link.updated_at = at;
                link.clone()
            }))
    }

    async fn deactivate_wholesale_funder_link_cascade(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
        at: DateTime<Utc>,
    ) -> Result<Option<CascadeOutcome>, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        let Some(parent) = state.parent_link_mut(lender_id, wholesale_funder_id) else {
            return Ok(None);
        };
        parent.active = false;
        parent.updated_at = at;
        let wholesale_funder = parent.clone();

        let mut deactivated_pools = Vec::new();
        for link in state.funder_pool_links.iter_mut().filter(|link| {
            link.active && link.is_child_of(&wholesale_funder)
        }) {
            link.active = false;
            link.updated_at = at;
            deactivated_pools.push(link.clone());
        }
        Ok(Some(CascadeOutcome {
            wholesale_funder,
            deactivated_pools,
        }))
    }

    async fn activate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<PoolActivation>, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        let Some(pool) = state.pool_link_mut(lender_id, funder_pool_id).map(|link| link.clone())
        else {
            return Ok(None);
        };
        let parent = state
            .parent_link_mut(lender_id, pool.wholesale_funder().id)
            .map(|link| link.clone());
        if !can_activate(&pool, parent.as_ref()) {
            return Ok(Some(PoolActivation::Blocked(pool)));
        }
        Ok(state.pool_link_mut(lender_id, funder_pool_id).map(|link| {
            link.active = true;
            link.updated_at = at;
            PoolActivation::Activated(link.clone())
        }))
    }

    async fn deactivate_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
        at: DateTime<Utc>,
    ) -> Result<Option<LenderFunderPool>, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        Ok(state.pool_link_mut(lender_id, funder_pool_id).map(|link| {
            link.active = false;
            link.updated_at = at;
            link.clone()
        }))
    }

    async fn delete_wholesale_funder_link(
        &self,
        lender_id: LenderId,
        wholesale_funder_id: WholesaleFunderId,
    ) -> Result<Option<usize>, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        let before = state.wholesale_funder_links.len();
        state.wholesale_funder_links.retain(|link| {
            !(link.lender_id == lender_id && link.wholesale_funder.id == wholesale_funder_id)
        });
        if state.wholesale_funder_links.len() == before {
            return Ok(None);
        }
        let pools_before = state.funder_pool_links.len();
        state.funder_pool_links.retain(|link| {
            !(link.lender_id == lender_id && link.wholesale_funder().id == wholesale_funder_id)
        });
        Ok(Some(pools_before - state.funder_pool_links.len()))
    }

    async fn delete_funder_pool_link(
        &self,
        lender_id: LenderId,
        funder_pool_id: FunderPoolId,
    ) -> Result<bool, FunderRelationshipRepositoryError> {
        let mut state = self.lock();
        let before = state.funder_pool_links.len();
        state
            .funder_pool_links
            .retain(|link| !(link.lender_id == lender_id && link.funder_pool.id == funder_pool_id));
        Ok(state.funder_pool_links.len() != before)
    }
}

#[async_trait]
impl LenderClauseRepository for InMemoryLendingStore {
    async fn create(
        &self,
        clause: &NewLenderClause,
    ) -> Result<LenderClause, LenderClauseRepositoryError> {
        let mut state = self.lock();
        if !state.lenders.contains_key(&clause.lender_id) {
            return Err(LenderClauseRepositoryError::missing_reference(format!(
                "lender {} does not exist",
                clause.lender_id
            )));
        }
        let version = state
            .clauses
            .values()
            .filter(|existing| existing.lender_id() == clause.lender_id)
            .map(LenderClause::version)
            .max()
            .unwrap_or(0)
            + 1;
        let created = clause.clone().into_clause(version);
        state
            .versions
            .push(clause.creation_entry().into_version(LenderClauseVersionId::random()));
        state.clauses.insert(created.id(), created.clone());
        Ok(created)
    }

    async fn save(
        &self,
        loaded: &LenderClause,
        clause: &LenderClause,
        entry: &NewLenderClauseVersion,
    ) -> Result<(), LenderClauseRepositoryError> {
        let mut state = self.lock();
        match state.clauses.get(&clause.id()) {
            None => {
                return Err(LenderClauseRepositoryError::missing_reference(format!(
                    "lender clause {} does not exist",
                    clause.id()
                )));
            }
            Some(stored) if stored != loaded => {
                return Err(LenderClauseRepositoryError::conflict(format!(
                    "lender clause {} changed since it was loaded",
                    clause.id()
                )));
            }
            Some(_) => {}
        }
        state.clauses.insert(clause.id(), clause.clone());
        state
            .versions
            .push(entry.clone().into_version(LenderClauseVersionId::random()));
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: LenderClauseId,
    ) -> Result<Option<LenderClause>, LenderClauseRepositoryError> {
        Ok(self.lock().clauses.get(&id).cloned())
    }

    async fn list_for_lender(
        &self,
        lender_id: LenderId,
    ) -> Result<Vec<LenderClause>, LenderClauseRepositoryError> {
        let mut clauses: Vec<_> = self
            .lock()
            .clauses
            .values()
            .filter(|clause| clause.lender_id() == lender_id)
            .cloned()
            .collect();
        clauses.sort_by_key(|clause| std::cmp::Reverse(clause.version()));
        Ok(clauses)
    }

    async fn list_versions(
        &self,
        id: LenderClauseId,
    ) -> Result<Vec<LenderClauseVersion>, LenderClauseRepositoryError> {
        Ok(self
            .lock()
            .versions
            .iter()
            .filter(|version| version.lender_clause_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ClausePositionRepository for InMemoryLendingStore {
    async fn list(&self) -> Result<Vec<ClausePosition>, ClausePositionRepositoryError> {
        let mut positions = self.lock().positions.clone();
        positions.sort_by_key(|position| position.display_order);
        Ok(positions)
    }

    async fn find_by_id(
        &self,
        id: ClausePositionId,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError> {
        Ok(self
            .lock()
            .positions
            .iter()
            .find(|position| position.id == id)
            .cloned())
    }

    async fn find_by_section(
        &self,
        section_identifier: &str,
    ) -> Result<Option<ClausePosition>, ClausePositionRepositoryError> {
        Ok(self
            .lock()
            .positions
            .iter()
            .find(|position| position.section_identifier == section_identifier)
            .cloned())
    }

    async fn seed(
        &self,
        seeds: &[ClausePositionSeed],
    ) -> Result<usize, ClausePositionRepositoryError> {
        let mut state = self.lock();
        let mut inserted = 0;
        for seed in seeds {
            if state
                .positions
                .iter()
                .any(|position| position.section_identifier == seed.section_identifier)
            {
                continue;
            }
            state.positions.push(seed.to_position());
            inserted += 1;
        }
        Ok(inserted)
    }
}

#[async_trait]
impl ContractClauseRepository for InMemoryLendingStore {
    async fn find_contract(
        &self,
        id: MortgageContractId,
    ) -> Result<Option<MortgageContract>, ContractClauseRepositoryError> {
        Ok(self.lock().contracts.get(&id).cloned())
    }

    async fn find_usage(
        &self,
        id: ContractClauseUsageId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        Ok(self.lock().usages.iter().find(|usage| usage.id() == id).cloned())
    }

    async fn find_active_usage(
        &self,
        contract_id: MortgageContractId,
        position_id: ClausePositionId,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        Ok(self
            .lock()
            .usages
            .iter()
            .find(|usage| {
                usage.mortgage_contract_id() == contract_id
                    && usage.clause_position_id() == position_id
                    && usage.is_active()
            })
            .cloned())
    }

    async fn list_usages(
        &self,
        contract_id: MortgageContractId,
    ) -> Result<Vec<ContractClauseUsage>, ContractClauseRepositoryError> {
        Ok(self
            .lock()
            .usages
            .iter()
            .filter(|usage| usage.mortgage_contract_id() == contract_id)
            .cloned()
            .collect())
    }

    async fn insert_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let mut state = self.lock();
        if state.usages.iter().any(|existing| existing.id() == usage.id()) {
            return Err(ContractClauseRepositoryError::conflict(format!(
                "usage {} already exists",
                usage.id()
            )));
        }
        let retired = state.retire_active_at(
            usage.mortgage_contract_id(),
            usage.clause_position_id(),
            usage.id(),
            retired_by,
            at,
        );
        state.usages.push(usage.clone());
        Ok(retired)
    }

    async fn mark_removed(
        &self,
        usage: &ContractClauseUsage,
    ) -> Result<bool, ContractClauseRepositoryError> {
        let mut state = self.lock();
        let Some(stored) = state
            .usages
            .iter_mut()
            .find(|stored| stored.id() == usage.id() && stored.is_active())
        else {
            return Ok(false);
        };
        *stored = usage.clone();
        Ok(true)
    }

    async fn reactivate_replacing_active(
        &self,
        usage: &ContractClauseUsage,
        retired_by: UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<ContractClauseUsage>, ContractClauseRepositoryError> {
        let mut state = self.lock();
        if !state.usages.iter().any(|stored| stored.id() == usage.id()) {
            return Err(ContractClauseRepositoryError::query(format!(
                "usage {} does not exist",
                usage.id()
            )));
        }
        let retired = state.retire_active_at(
            usage.mortgage_contract_id(),
            usage.clause_position_id(),
            usage.id(),
            retired_by,
            at,
        );
        if let Some(stored) = state.usages.iter_mut().find(|stored| stored.id() == usage.id()) {
            *stored = usage.clone();
        }
        Ok(retired)
    }
}
