//! OAuth 1.0a request signing with RSA-SHA1, the scheme Jira application
//! links accept in place of a password.
use crate::config::OAuthConfig;
use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::RsaPrivateKey;
use sha1::{Digest, Sha1};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

/// RFC 3986 unreserved characters stay literal; everything else is escaped.
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "RSA-SHA1";
const OAUTH_VERSION: &str = "1.0";

pub struct OAuthSigner {
    consumer_key: String,
    access_token: String,
    key: SigningKey<Sha1>,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl OAuthSigner {
    pub fn from_config(config: &OAuthConfig) -> Result<Self> {
        let path = &config.private_key_path;
        let pem = fs::read_to_string(path)
            .with_context(|| format!("read private key {}", path.display()))?;
        let key =
            parse_private_key(&pem).with_context(|| format!("parse private key {}", path.display()))?;
        Ok(Self {
            consumer_key: config.consumer_key.clone(),
            access_token: config.access_token.clone(),
            key: SigningKey::<Sha1>::new(key),
        })
    }

    /// `Authorization` header value for one request with a fresh nonce.
    pub fn authorization(&self, method: &str, url: &str, body: &[u8]) -> Result<String> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        self.authorization_at(method, url, body, &nonce, timestamp)
    }

    fn authorization_at(
        &self,
        method: &str,
        url: &str,
        body: &[u8],
        nonce: &str,
        timestamp: u64,
    ) -> Result<String> {
        let mut params = vec![
            ("oauth_body_hash", STANDARD.encode(Sha1::digest(body))),
            ("oauth_consumer_key", self.consumer_key.clone()),
            ("oauth_nonce", nonce.to_string()),
            ("oauth_signature_method", SIGNATURE_METHOD.to_string()),
            ("oauth_timestamp", timestamp.to_string()),
            ("oauth_token", self.access_token.clone()),
            ("oauth_version", OAUTH_VERSION.to_string()),
        ];
        let base = signature_base(method, url, &params);
        let signature = self
            .key
            .try_sign(base.as_bytes())
            .map_err(|err| anyhow!("sign {method} {url}: {err}"))?;
        params.push(("oauth_signature", STANDARD.encode(signature.to_bytes())));
        let fields: Vec<String> = params
            .iter()
            .map(|(name, value)| format!("{name}=\"{}\"", encode(value)))
            .collect();
        Ok(format!("OAuth {}", fields.join(", ")))
    }
}

fn parse_private_key(pem: &str) -> Result<RsaPrivateKey> {
    if pem.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(pem).map_err(|err| anyhow!("PKCS#1 key: {err}"));
    }
    RsaPrivateKey::from_pkcs8_pem(pem).map_err(|err| anyhow!("PKCS#8 key: {err}"))
}

/// Signature base string: method, URL without query, and the sorted union
/// of query and protocol parameters, each part percent-encoded.
pub fn signature_base(method: &str, url: &str, params: &[(&str, String)]) -> String {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let (base_url, query) = url.split_once('?').unwrap_or((url, ""));
    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (encode(&decode(name)), encode(&decode(value)))
        })
        .collect();
    pairs.extend(
        params
            .iter()
            .map(|(name, value)| (encode(name), encode(value))),
    );
    pairs.sort();
    let normalized: Vec<String> = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(base_url),
        encode(&normalized.join("&"))
    )
}

fn encode(raw: &str) -> String {
    utf8_percent_encode(raw, UNRESERVED).to_string()
}

fn decode(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
