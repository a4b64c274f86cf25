//! The five fixed plugins that subscribe to every decoded `Transfer`
//! (spec.md §4.4): current owner, ownership history, ERC-1155 balances,
//! token URI candidates, and deep-refresh bloom filters.

pub mod balances;
pub mod current_owners;
pub mod previous_owners;
pub mod refresh;
pub mod uris;

pub use balances::BalancesPlugin;
pub use current_owners::CurrentOwnersPlugin;
pub use previous_owners::PreviousOwnersPlugin;
pub use refresh::RefreshPlugin;
pub use uris::UrisPlugin;
