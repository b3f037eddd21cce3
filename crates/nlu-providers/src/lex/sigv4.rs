//! AWS Signature Version 4 request signing.
//!
//! Only the header-based flavour is implemented: the caller passes the
//! headers it wants covered by the signature, and gets back the
//! `x-amz-date`, optional `x-amz-security-token` and `authorization` headers
//! to attach to the request.

use super::settings::AwsCredentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Request parts that take part in the signature.
#[derive(Debug, Clone, Copy)]
pub struct CanonicalParts<'a> {
    pub method: &'a str,
    pub url: &'a Url,
    /// Extra headers to sign. `host` and `x-amz-date` are always added.
    pub headers: &'a [(&'a str, &'a str)],
    pub body: &'a [u8],
}

/// Signing scope for one service in one region.
#[derive(Debug, Clone, Copy)]
pub struct Signer<'a> {
    credentials: &'a AwsCredentials,
    region: &'a str,
    service: &'a str,
}

impl<'a> Signer<'a> {
    pub fn new(credentials: &'a AwsCredentials, region: &'a str, service: &'a str) -> Self {
        Self { credentials, region, service }
    }

    /// Headers to add to the request so that it authenticates at `now`.
    pub fn sign(&self, parts: &CanonicalParts<'_>, now: DateTime<Utc>) -> Result<Vec<(&'static str, String)>, String> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        let mut headers: Vec<(String, String)> = parts
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        headers.push(("host".to_string(), host_header(parts.url)));
        headers.push(("x-amz-date".to_string(), amz_date.clone()));
        if let Some(token) = &self.credentials.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort();

        let signed_headers = headers.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(";");
        let canonical_headers: String = headers.iter().map(|(name, value)| format!("{name}:{value}\n")).collect();

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            parts.method,
            canonical_uri(parts.url),
            canonical_query(parts.url),
            canonical_headers,
            signed_headers,
            hex::encode(Sha256::digest(parts.body)),
        );

        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let secret = format!("AWS4{}", self.credentials.secret_key);
        let k_date = hmac(secret.as_bytes(), date.as_bytes())?;
        let k_region = hmac(&k_date, self.region.as_bytes())?;
        let k_service = hmac(&k_region, self.service.as_bytes())?;
        let k_signing = hmac(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac(&k_signing, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            self.credentials.access_key
        );

        let mut result = vec![("x-amz-date", amz_date)];
        if let Some(token) = &self.credentials.session_token {
            result.push(("x-amz-security-token", token.clone()));
        }
        result.push(("authorization", authorization));
        Ok(result)
    }
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, String> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| format!("invalid signing key: {e}"))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

/// Path segments encoded a second time, as every non-S3 service expects.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(|segment| urlencoding::encode(segment).into_owned()).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| (urlencoding::encode(&key).into_owned(), urlencoding::encode(&value).into_owned()))
        .collect();
    pairs.sort();
    pairs.iter().map(|(key, value)| format!("{key}={value}")).collect::<Vec<_>>().join("&")
}
