//! ENS registers `.eth` names as ERC-721 tokens whose id is the `namehash`
//! of the label, not a sequential index, and has no `tokenURI` on the base
//! registrar. Since the namehash can't be reversed back into a label without
//! an external name-reverse lookup this repo doesn't perform, the handler
//! only attaches the fact that the token is an ENS name and its raw
//! namehash; anything above that belongs to a reverse-resolution step this
//! handler deliberately leaves to the caller.

use std::collections::BTreeMap;

use indexer_types::value::Value;

use super::CustomHandler;

pub const CONTRACT_ADDRESS: &str = "0x57f1887a8bf19b14fc0df6fd9b2acc9af147ea85";

pub struct EnsHandler;

impl CustomHandler for EnsHandler {
    fn contract_address(&self) -> &'static str {
        CONTRACT_ADDRESS
    }

    fn generate(&self, token_id: &str, _uri: &str) -> BTreeMap<String, Value> {
        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), Value::String("ENS: .eth Name".to_string()));
        metadata.insert("namehash".to_string(), Value::String(token_id.to_string()));
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attaches_the_raw_namehash() {
        let handler = EnsHandler;
        let metadata = handler.generate("0xabc123", "");
        assert_eq!(metadata.get("namehash").unwrap().as_str().unwrap(), "0xabc123");
    }
}
