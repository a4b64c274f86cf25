//! Fan-out of a decoded `Transfer` to every registered plugin (spec.md §4.4).
//!
//! The teacher's subgraph runtime fans triggers out to wasm modules picked by
//! a `petgraph`-based filter graph; here the trigger set is fixed (four
//! plugins, always all of them, no dynamic subscription), so the graph
//! collapses to a plain `Vec<Arc<dyn Plugin>>`.

use std::sync::Arc;

use indexer_types::domain::Transfer;

/// A unit of work the bus hands every decoded transfer to.
///
/// Plugins never see each other's output; each owns its own `Reducer`
/// internally and is consulted only through `on_transfer`.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;

    fn on_transfer(&self, transfer: &Transfer);
}

#[derive(Clone, Default)]
pub struct PluginBus {
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PluginBus {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Dispatches to every plugin in registration order. A plugin's internal
    /// `offer` never fails or panics on plausible input, so this has no
    /// error path (spec.md §4.4: "a plugin never blocks or fails the bus").
    pub fn dispatch(&self, transfer: &Transfer) {
        for plugin in &self.plugins {
            plugin.on_transfer(transfer);
        }
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexer_types::domain::TokenType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingPlugin {
        name: &'static str,
        count: AtomicUsize,
    }

    impl Plugin for CountingPlugin {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_transfer(&self, _transfer: &Transfer) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_transfer() -> Transfer {
        Transfer {
            chain: "ethereum".into(),
            contract_address: "0x0c2e".into(),
            from: "0x0".into(),
            to: "0xa".into(),
            token_id: "1".into(),
            token_type: TokenType::Erc721,
            amount: 1,
            block_number: 1,
            tx_index: 0,
        }
    }

    #[test]
    fn dispatches_to_every_registered_plugin() {
        let mut bus = PluginBus::new();
        let a = Arc::new(CountingPlugin { name: "a", count: AtomicUsize::new(0) });
        let b = Arc::new(CountingPlugin { name: "b", count: AtomicUsize::new(0) });
        bus.register(a.clone());
        bus.register(b.clone());

        bus.dispatch(&sample_transfer());

        assert_eq!(a.count.load(Ordering::SeqCst), 1);
        assert_eq!(b.count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.plugin_names(), vec!["a", "b"]);
    }
}
