//! Classifies a raw `tokenURI`/`uri` string by scheme (spec.md §4.6).

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UriType {
    Ipfs(String),
    Arweave(String),
    Http(String),
    DataUri(String),
    Unknown(String),
}

impl UriType {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(cid) = trimmed.strip_prefix("ipfs://") {
            return UriType::Ipfs(cid.trim_start_matches("ipfs/").to_string());
        }
        if let Some(cid) = trimmed.strip_prefix("/ipfs/") {
            return UriType::Ipfs(cid.to_string());
        }
        if let Some(path) = trimmed.strip_prefix("ar://") {
            return UriType::Arweave(path.to_string());
        }
        if trimmed.starts_with("data:") {
            return UriType::DataUri(trimmed.to_string());
        }
        if let Some(idx) = trimmed.find("/ipfs/") {
            // e.g. an HTTP gateway URL that happens to embed an IPFS path.
            return UriType::Ipfs(trimmed[idx + "/ipfs/".len()..].to_string());
        }
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return UriType::Http(trimmed.to_string());
        }
        UriType::Unknown(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_ipfs_scheme() {
        assert_eq!(UriType::parse("ipfs://bafy123"), UriType::Ipfs("bafy123".into()));
    }

    #[test]
    fn recognizes_ipfs_gateway_path_embedded_in_http_url() {
        assert_eq!(
            UriType::parse("https://gateway.example/ipfs/bafy123"),
            UriType::Ipfs("bafy123".into())
        );
    }

    #[test]
    fn recognizes_arweave_scheme() {
        assert_eq!(UriType::parse("ar://abc"), UriType::Arweave("abc".into()));
    }

    #[test]
    fn recognizes_data_uri() {
        let raw = "data:application/json;base64,eyJhIjoxfQ==";
        assert_eq!(UriType::parse(raw), UriType::DataUri(raw.into()));
    }

    #[test]
    fn recognizes_plain_http() {
        assert_eq!(UriType::parse("https://example.com/1"), UriType::Http("https://example.com/1".into()));
    }

    #[test]
    fn falls_back_to_unknown() {
        assert_eq!(UriType::parse("not-a-uri"), UriType::Unknown("not-a-uri".into()));
    }
}
