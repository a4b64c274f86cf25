//! Shared `ethabi::Function` descriptors for the view calls the uris plugin
//! and refresh orchestrator issue directly against a contract (spec.md §6):
//! `tokenURI`, `uri`, `owner`.

use ethabi::{Function, Param, ParamType, StateMutability};

pub fn token_uri_function() -> Function {
    #[allow(deprecated)]
    Function {
        name: "tokenURI".to_string(),
        inputs: vec![Param { name: "tokenId".to_string(), kind: ParamType::Uint(256), internal_type: None }],
        outputs: vec![Param { name: "".to_string(), kind: ParamType::String, internal_type: None }],
        constant: Some(true),
        state_mutability: StateMutability::View,
    }
}

pub fn uri_function() -> Function {
    #[allow(deprecated)]
    Function {
        name: "uri".to_string(),
        inputs: vec![Param { name: "id".to_string(), kind: ParamType::Uint(256), internal_type: None }],
        outputs: vec![Param { name: "".to_string(), kind: ParamType::String, internal_type: None }],
        constant: Some(true),
        state_mutability: StateMutability::View,
    }
}

pub fn owner_function() -> Function {
    #[allow(deprecated)]
    Function {
        name: "owner".to_string(),
        inputs: vec![],
        outputs: vec![Param { name: "".to_string(), kind: ParamType::Address, internal_type: None }],
        constant: Some(true),
        state_mutability: StateMutability::View,
    }
}
