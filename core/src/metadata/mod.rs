//! Resolves a token's raw `tokenURI`/`uri` string into structured metadata
//! (spec.md §4.6): IPFS, Arweave, plain HTTP(S), and `data:` URIs, plus a
//! small table of hand-written handlers for contracts whose metadata does
//! not follow any of those schemes.

pub mod handlers;
pub mod resolver;
pub mod uri_type;

pub use resolver::MetadataResolver;
pub use uri_type::UriType;
