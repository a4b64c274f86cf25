//! Fetches and parses a token's metadata document from whatever scheme its
//! `tokenURI`/`uri` resolves to (spec.md §4.6).

use std::collections::BTreeMap;
use std::time::Duration;

use base64::Engine;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient};
use reqwest::Client;
use slog::{debug, warn, Logger};

use indexer_types::errors::MetadataError;
use indexer_types::value::Value;

use super::handlers::CustomHandlerRegistry;
use super::uri_type::UriType;

const ARWEAVE_GATEWAY: &str = "https://arweave.net";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

pub struct MetadataResolver {
    http: Client,
    ipfs: IpfsClient,
    custom_handlers: CustomHandlerRegistry,
    logger: Logger,
}

impl MetadataResolver {
    pub fn new(logger: Logger) -> Self {
        Self {
            http: Client::builder().timeout(DEFAULT_TIMEOUT).build().expect("static reqwest client config"),
            ipfs: IpfsClient::default(),
            custom_handlers: CustomHandlerRegistry::with_defaults(),
            logger,
        }
    }

    /// Resolves `uri` into a metadata document. If `contract_address` has a
    /// registered custom handler, that always takes precedence over parsing
    /// `uri` at all (spec.md §4.6: custom handlers are contracts with no
    /// usable `tokenURI` in the first place).
    pub async fn resolve(&self, contract_address: &str, token_id: &str, uri: &str) -> Result<BTreeMap<String, Value>, MetadataError> {
        if let Some(handler) = self.custom_handlers.get(contract_address) {
            debug!(self.logger, "using custom metadata handler"; "contract" => contract_address);
            return Ok(handler.generate(token_id, uri));
        }

        match UriType::parse(uri) {
            UriType::Ipfs(cid) => self.fetch_ipfs(&cid).await,
            UriType::Arweave(path) => self.fetch_http(&format!("{ARWEAVE_GATEWAY}/{path}")).await,
            UriType::Http(url) => self.fetch_http(&url).await,
            UriType::DataUri(raw) => decode_data_uri(&raw),
            UriType::Unknown(raw) => Err(MetadataError::Unknown(raw)),
        }
    }

    async fn fetch_ipfs(&self, cid: &str) -> Result<BTreeMap<String, Value>, MetadataError> {
        let bytes: Vec<u8> = self
            .ipfs
            .cat(cid)
            .map_ok(|chunk| chunk.to_vec())
            .try_concat()
            .await
            .map_err(|e| MetadataError::NotFound(format!("ipfs cat {cid} failed: {e}")))?;
        parse_json_bytes(&bytes)
    }

    async fn fetch_http(&self, url: &str) -> Result<BTreeMap<String, Value>, MetadataError> {
        let response = self.http.get(url).send().await.map_err(|e| {
            warn!(self.logger, "http metadata fetch failed"; "url" => url, "error" => e.to_string());
            MetadataError::Dns(e.to_string())
        })?;

        if !response.status().is_success() {
            return Err(MetadataError::HttpStatus { status: response.status().as_u16(), url: url.to_string() });
        }

        let bytes = response.bytes().await.map_err(|e| MetadataError::Dns(e.to_string()))?;
        parse_json_bytes(&bytes)
    }
}

fn decode_data_uri(raw: &str) -> Result<BTreeMap<String, Value>, MetadataError> {
    let (header, payload) = raw.split_once(',').ok_or_else(|| MetadataError::Url(raw.to_string()))?;
    if header.contains("base64") {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(payload))
            .map_err(|_| MetadataError::Base64Decode)?;
        parse_json_bytes(&bytes)
    } else {
        let decoded = percent_decode(payload);
        parse_json_bytes(decoded.as_bytes())
    }
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            let hi = chars.next();
            let lo = chars.next();
            if let (Some(hi), Some(lo)) = (hi, lo) {
                if let Ok(byte) = u8::from_str_radix(&format!("{hi}{lo}"), 16) {
                    out.push(byte as char);
                    continue;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn parse_json_bytes(bytes: &[u8]) -> Result<BTreeMap<String, Value>, MetadataError> {
    let json: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| MetadataError::Unknown(e.to_string()))?;
    let value: Value = json.into();
    match value.as_object() {
        Some(map) => Ok(map.clone()),
        None => Err(MetadataError::Unknown("metadata document was not a JSON object".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_data_uri() {
        let payload = base64::engine::general_purpose::STANDARD.encode(r#"{"name":"X"}"#);
        let raw = format!("data:application/json;base64,{payload}");
        let metadata = decode_data_uri(&raw).unwrap();
        assert_eq!(metadata.get("name").unwrap().as_str(), Some("X"));
    }

    #[test]
    fn decodes_percent_encoded_plain_data_uri() {
        let raw = "data:application/json,%7B%22name%22%3A%22Y%22%7D";
        let metadata = decode_data_uri(raw).unwrap();
        assert_eq!(metadata.get("name").unwrap().as_str(), Some("Y"));
    }

    #[test]
    fn rejects_data_uri_missing_comma_separator() {
        assert!(decode_data_uri("data:application/json;base64").is_err());
    }
}
