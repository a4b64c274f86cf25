//! The original CryptoPunks contract predates ERC-721 and has no
//! `tokenURI`/`uri` at all. Attribute data (type and accessories) lives in a
//! well-known off-chain dataset; here we only synthesize the stable
//! identity fields the rest of the pipeline needs (name, image pointer into
//! the canonical punk spritesheet), leaving attribute enrichment to a
//! dataset load this handler does not itself perform.

use std::collections::BTreeMap;

use indexer_types::value::Value;

use super::CustomHandler;

pub const CONTRACT_ADDRESS: &str = "0xb47e3cd837ddf8e4c57f05d70ab865de6e193bbb";

pub struct CryptopunksHandler;

impl CustomHandler for CryptopunksHandler {
    fn contract_address(&self) -> &'static str {
        CONTRACT_ADDRESS
    }

    fn generate(&self, token_id: &str, _uri: &str) -> BTreeMap<String, Value> {
        let index: u64 = token_id.parse().unwrap_or_else(|_| u64::from_str_radix(token_id.trim_start_matches("0x"), 16).unwrap_or(0));

        let mut metadata = BTreeMap::new();
        metadata.insert("name".to_string(), Value::String(format!("CryptoPunk #{index}")));
        metadata.insert(
            "image".to_string(),
            Value::String(format!("https://www.larvalabs.com/cryptopunks/cryptopunk{index:04}.png")),
        );
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_the_image_index_to_four_digits() {
        let handler = CryptopunksHandler;
        let metadata = handler.generate("7", "");
        assert_eq!(metadata.get("image").unwrap().as_str().unwrap(), "https://www.larvalabs.com/cryptopunks/cryptopunk0007.png");
    }
}
