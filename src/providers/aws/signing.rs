//! AWS Signature Version 4.
//!
//! The invoker builds its requests by hand (the operation set is data, not
//! generated code), so signing happens here rather than inside an SDK client.
//! The algorithm follows
//! <https://docs.aws.amazon.com/general/latest/gr/sigv4_signing.html>:
//! canonical request, string to sign, derived signing key, signature.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Credentials plus signing scope for one request.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub session_token: Option<&'a str>,
    pub region: &'a str,
    pub service: &'a str,
}

/// Signs one request and returns the full header map to send: the caller's
/// headers plus `x-amz-date`, the session token when present, and
/// `authorization`.
pub fn sign_request(
    ctx: &SigningContext<'_>,
    method: &str,
    url: &str,
    headers: &BTreeMap<String, String>,
    body: &str,
    timestamp: DateTime<Utc>,
) -> BTreeMap<String, String> {
    let date_stamp = timestamp.format("%Y%m%d").to_string();
    let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();

    let mut signed_headers = headers.clone();
    signed_headers.insert("x-amz-date".to_string(), amz_date.clone());
    if let Some(token) = ctx.session_token {
        signed_headers.insert("x-amz-security-token".to_string(), token.to_string());
    }

    let payload_hash = sha256_hex(body.as_bytes());
    let (canonical_uri, canonical_query) = split_url(url);
    let canonical_request = build_canonical_request(
        method,
        &canonical_uri,
        &canonical_query,
        &signed_headers,
        &payload_hash,
    );

    let credential_scope = format!("{date_stamp}/{}/{}/aws4_request", ctx.region, ctx.service);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
        sha256_hex(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(ctx.secret_access_key, &date_stamp, ctx.region, ctx.service);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={}, Signature={signature}",
        ctx.access_key_id,
        signed_header_names(&signed_headers),
    );
    signed_headers.insert("authorization".to_string(), authorization);
    signed_headers
}

fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    headers: &BTreeMap<String, String>,
    payload_hash: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{}\n{}\n{payload_hash}",
        canonical_headers(headers),
        signed_header_names(headers),
    )
}

/// kSecret -> kDate -> kRegion -> kService -> kSigning.
fn derive_signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Headers lowercased, trimmed, sorted, one `name:value\n` line each. The
/// BTreeMap already iterates in sorted order; names are stored lowercase.
fn canonical_headers(headers: &BTreeMap<String, String>) -> String {
    let mut sorted: Vec<(String, &str)> =
        headers.iter().map(|(k, v)| (k.to_ascii_lowercase(), v.trim())).collect();
    sorted.sort();
    sorted.into_iter().map(|(k, v)| format!("{k}:{v}\n")).collect()
}

fn signed_header_names(headers: &BTreeMap<String, String>) -> String {
    let mut names: Vec<String> = headers.keys().map(|k| k.to_ascii_lowercase()).collect();
    names.sort();
    names.join(";")
}

/// Splits a URL into (canonical path, canonical query string). Query pairs
/// must already be percent-encoded by the caller; they are only sorted here.
fn split_url(url: &str) -> (String, String) {
    let without_scheme = url.splitn(2, "://").nth(1).unwrap_or(url);
    let (host_and_path, query) = match without_scheme.split_once('?') {
        Some((head, query)) => (head, query),
        None => (without_scheme, ""),
    };
    let path = match host_and_path.find('/') {
        Some(idx) => &host_and_path[idx..],
        None => "/",
    };
    let canonical_path =
        path.split('/').map(uri_encode).collect::<Vec<_>>().join("/");

    let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_unstable();
    (canonical_path, pairs.join("&"))
}

/// Percent-encodes everything outside the RFC 3986 unreserved set.
pub fn uri_encode(input: &str) -> String {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
    const AWS_ENCODE_SET: &AsciiSet =
        &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');
    utf8_percent_encode(input, AWS_ENCODE_SET).to_string()
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
