//! Diesel table definitions for the four tables this store owns (spec.md
//! §4.0, shapes specified in full in SPEC_FULL.md §10).

diesel::table! {
    tokens (chain, contract_address, token_id, owner_address) {
        chain -> Text,
        contract_address -> Text,
        token_id -> Text,
        owner_address -> Text,
        quantity -> Text,
        token_type -> Text,
        token_uri -> Nullable<Text>,
        token_metadata -> Nullable<Jsonb>,
        name -> Nullable<Text>,
        description -> Nullable<Text>,
        ownership_history -> Jsonb,
        block_number -> BigInt,
    }
}

diesel::table! {
    contracts (chain, address) {
        chain -> Text,
        address -> Text,
        name -> Nullable<Text>,
        symbol -> Nullable<Text>,
        owner_address -> Nullable<Text>,
        creator_address -> Nullable<Text>,
        owner_method -> Nullable<Text>,
        latest_block -> BigInt,
    }
}

diesel::table! {
    address_filters (chunk_from, chunk_to) {
        chunk_from -> BigInt,
        chunk_to -> BigInt,
        filter -> Jsonb,
    }
}

diesel::table! {
    log_cache (cache_key) {
        cache_key -> Text,
        payload -> Bytea,
        is_error -> Bool,
    }
}
