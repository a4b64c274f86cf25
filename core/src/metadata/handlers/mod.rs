//! Hand-written metadata generators for the handful of contracts whose
//! tokens don't carry a standard `tokenURI`, keyed by lowercase contract
//! address (spec.md §4.6's "custom handler" escape hatch).

pub mod autoglyphs;
pub mod colorglyphs;
pub mod cryptopunks;
pub mod ens;
pub mod glyph_render;

use std::collections::BTreeMap;
use std::sync::Arc;

use indexer_types::value::Value;

/// A contract-specific metadata generator. Implementors never perform I/O of
/// their own in this repo — they derive metadata from the token id alone or
/// (for `ens`) from a name already resolved elsewhere in the pipeline.
pub trait CustomHandler: Send + Sync {
    fn contract_address(&self) -> &'static str;

    fn generate(&self, token_id: &str, uri: &str) -> BTreeMap<String, Value>;
}

#[derive(Default)]
pub struct CustomHandlerRegistry {
    by_address: std::collections::HashMap<&'static str, Arc<dyn CustomHandler>>,
}

impl CustomHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(autoglyphs::AutoglyphsHandler));
        registry.register(Arc::new(colorglyphs::ColorglyphsHandler));
        registry.register(Arc::new(cryptopunks::CryptopunksHandler));
        registry.register(Arc::new(ens::EnsHandler));
        registry
    }

    pub fn register(&mut self, handler: Arc<dyn CustomHandler>) {
        self.by_address.insert(handler.contract_address(), handler);
    }

    pub fn get(&self, contract_address: &str) -> Option<Arc<dyn CustomHandler>> {
        self.by_address.get(contract_address.to_lowercase().as_str()).cloned()
    }
}
