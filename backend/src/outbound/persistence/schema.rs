//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes the schema, regenerate them with `diesel print-schema`
//! or update them by hand.

diesel::table! {
    /// Lenders that own clauses, contracts and funding relationships.
    lenders (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Wholesale funders; the name is globally unique.
    wholesale_funders (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Pools of capital offered by a wholesale funder.
    funder_pools (id) {
        id -> Uuid,
        wholesale_funder_id -> Uuid,
        name -> Varchar,
        /// Pool size in minor currency units.
        total_amount -> Int8,
        /// Amount already committed, in minor currency units.
        allocated_amount -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Lender to wholesale funder relationship (the cascade parent).
    ///
    /// Unique on `(lender_id, wholesale_funder_id)`.
    lender_wholesale_funders (id) {
        id -> Uuid,
        lender_id -> Uuid,
        wholesale_funder_id -> Uuid,
        active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Lender to funder pool relationship (the cascade child).
    ///
    /// Unique on `(lender_id, funder_pool_id)`.
    lender_funder_pools (id) {
        id -> Uuid,
        lender_id -> Uuid,
        funder_pool_id -> Uuid,
        active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Versioned lender clauses. Unique on `(lender_id, version)`.
    lender_clauses (id) {
        id -> Uuid,
        lender_id -> Uuid,
        title -> Varchar,
        content -> Text,
        description -> Nullable<Text>,
        version -> Int4,
        is_draft -> Bool,
        is_active -> Bool,
        last_updated -> Timestamptz,
        created_by -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit entries for lender clauses.
    lender_clause_versions (id) {
        id -> Uuid,
        lender_clause_id -> Uuid,
        user_id -> Uuid,
        /// `created` or `updated`.
        action -> Varchar,
        /// JSON array of `{field, before, after}` objects.
        changes -> Jsonb,
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Fixed insertion points in the contract template.
    clause_positions (id) {
        id -> Uuid,
        section_identifier -> Varchar,
        name -> Varchar,
        description -> Nullable<Text>,
        display_order -> Int4,
    }
}

diesel::table! {
    mortgage_contracts (id) {
        id -> Uuid,
        lender_id -> Uuid,
        reference -> Varchar,
        version -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Clause placements in contracts with immutable content snapshots.
    ///
    /// A partial unique index allows one active row per contract position.
    contract_clause_usages (id) {
        id -> Uuid,
        mortgage_contract_id -> Uuid,
        lender_clause_id -> Uuid,
        clause_position_id -> Uuid,
        clause_content_snapshot -> Text,
        contract_version_at_usage -> Int4,
        clause_version_at_usage -> Int4,
        active -> Bool,
        added_by -> Uuid,
        added_at -> Timestamptz,
        removed_by -> Nullable<Uuid>,
        removed_at -> Nullable<Timestamptz>,
    }
}

diesel::joinable!(funder_pools -> wholesale_funders (wholesale_funder_id));
diesel::joinable!(lender_wholesale_funders -> lenders (lender_id));
diesel::joinable!(lender_wholesale_funders -> wholesale_funders (wholesale_funder_id));
diesel::joinable!(lender_funder_pools -> lenders (lender_id));
diesel::joinable!(lender_funder_pools -> funder_pools (funder_pool_id));
diesel::joinable!(lender_clauses -> lenders (lender_id));
diesel::joinable!(lender_clause_versions -> lender_clauses (lender_clause_id));
diesel::joinable!(mortgage_contracts -> lenders (lender_id));
diesel::joinable!(contract_clause_usages -> mortgage_contracts (mortgage_contract_id));
diesel::joinable!(contract_clause_usages -> lender_clauses (lender_clause_id));
diesel::joinable!(contract_clause_usages -> clause_positions (clause_position_id));

diesel::allow_tables_to_appear_in_same_query!(
    lenders,
    wholesale_funders,
    funder_pools,
    lender_wholesale_funders,
    lender_funder_pools,
    lender_clauses,
    lender_clause_versions,
    clause_positions,
    mortgage_contracts,
    contract_clause_usages,
);
