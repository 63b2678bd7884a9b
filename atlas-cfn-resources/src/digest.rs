//! HTTP Digest authentication (RFC 7616) for the Atlas API key pair

use md5::Md5;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl Algorithm {
    fn parse(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.to_ascii_uppercase()) {
            None => Some(Self::Md5),
            Some(v) if v == "MD5" => Some(Self::Md5),
            Some(v) if v == "SHA-256" => Some(Self::Sha256),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha256 => "SHA-256",
        }
    }

    fn hash(&self, data: &str) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(data.as_bytes())),
            Self::Sha256 => hex::encode(Sha256::digest(data.as_bytes())),
        }
    }
}

/// A parsed `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Algorithm,
    pub qop_auth: bool,
}

impl Challenge {
    /// Parse a challenge header. Returns `None` for non-digest schemes or unsupported algorithms.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let params = parse_params(rest);
        let qop_auth = params
            .get("qop")
            .map(|q| q.split(',').any(|v| v.trim().eq_ignore_ascii_case("auth")))
            .unwrap_or(false);

        Some(Self {
            realm: params.get("realm").cloned().unwrap_or_default(),
            nonce: params.get("nonce").cloned()?,
            opaque: params.get("opaque").cloned(),
            algorithm: Algorithm::parse(params.get("algorithm").map(String::as_str))?,
            qop_auth,
        })
    }

    /// Build the `Authorization` header value for one request
    pub fn authorize(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
    ) -> String {
        let nc = "00000001";
        let ha1 = self
            .algorithm
            .hash(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = self.algorithm.hash(&format!("{}:{}", method, uri));

        let response = if self.qop_auth {
            self.algorithm
                .hash(&format!("{}:{}:{}:{}:auth:{}", ha1, self.nonce, nc, cnonce, ha2))
        } else {
            self.algorithm.hash(&format!("{}:{}:{}", ha1, self.nonce, ha2))
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            username,
            self.realm,
            self.nonce,
            uri,
            self.algorithm.name(),
            response
        );
        if self.qop_auth {
            header.push_str(&format!(", qop=auth, nc={}, cnonce=\"{}\"", nc, cnonce));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        header
    }
}

/// Fresh client nonce for a request
pub fn cnonce() -> String {
    format!("{:016x}", rand::random::<u64>())
}

// key=value pairs separated by commas; values may be quoted and contain commas
fn parse_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if *c == ',' || c.is_whitespace()) {
            chars.next();
        }

        let key: String = chars
            .by_ref()
            .take_while(|c| *c != '=')
            .collect::<String>()
            .trim()
            .to_ascii_lowercase();
        if key.is_empty() {
            break;
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(c) = chars.peek() {
                if *c == ',' {
                    break;
                }
                value.push(*c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        params.insert(key, value);
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_atlas_challenge() {
        let challenge = Challenge::parse(
            r#"Digest realm="MMS Public API", domain="", nonce="abc,def", algorithm=MD5, qop="auth", stale=false"#,
        )
        .unwrap();

        assert_eq!(challenge.realm, "MMS Public API");
        assert_eq!(challenge.nonce, "abc,def");
        assert_eq!(challenge.algorithm, Algorithm::Md5);
        assert!(challenge.qop_auth);
        assert!(challenge.opaque.is_none());
    }

    #[test]
    fn test_non_digest_scheme_is_ignored() {
        assert!(Challenge::parse(r#"Basic realm="x""#).is_none());
        assert!(Challenge::parse(r#"Digest realm="x", nonce="n", algorithm=SHA-512-256"#).is_none());
    }

    #[test]
    fn test_rfc2617_response_vector() {
        let challenge = Challenge::parse(
            r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        )
        .unwrap();

        let header = challenge.authorize(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
        );

        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("qop=auth, nc=00000001"));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
    }

    #[test]
    fn test_sha256_challenge() {
        let challenge =
            Challenge::parse(r#"Digest realm="r", nonce="n", algorithm=SHA-256"#).unwrap();
        assert_eq!(challenge.algorithm, Algorithm::Sha256);
        assert!(!challenge.qop_auth);

        let header = challenge.authorize("u", "p", "DELETE", "/x", "c");
        assert!(header.contains("algorithm=SHA-256"));
        assert!(!header.contains("cnonce"));
    }
}
