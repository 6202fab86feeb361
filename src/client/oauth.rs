//! Two-legged OAuth 1.0a request signing (HMAC-SHA1)
//!
//! The Noun Project API authenticates every request with a consumer key and
//! secret and no access token. The signature covers the method, the base URL
//! and every query parameter, so the query must be final before signing.

use crate::config::Credentials;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use url::Url;

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const OAUTH_VERSION: &str = "1.0";

/// RFC 3986 percent-encoding (unreserved characters pass through)
pub fn percent_encode(input: &str) -> String {
    urlencoding::encode(input).into_owned()
}

/// Signs requests with the consumer credentials
#[derive(Clone)]
pub struct OAuth1Signer {
    consumer_key: String,
    consumer_secret: String,
}

impl OAuth1Signer {
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            consumer_key: credentials.api_key().to_string(),
            consumer_secret: credentials.api_secret().to_string(),
        }
    }

    /// Build an `Authorization` header value with a fresh nonce and timestamp
    pub fn authorization_header(&self, method: &str, url: &Url) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let timestamp = chrono::Utc::now().timestamp();
        self.authorization_header_with(method, url, &nonce, timestamp)
    }

    /// Build an `Authorization` header value for a fixed nonce and timestamp
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &Url,
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let mut oauth_params = self.oauth_params(nonce, timestamp);
        let base = signature_base_string(method, url, &oauth_params);
        let signature = self.sign(&base);
        oauth_params.push(("oauth_signature".to_string(), signature));
        oauth_params.sort();

        let fields = oauth_params
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");

        format!("OAuth {fields}")
    }

    fn oauth_params(&self, nonce: &str, timestamp: i64) -> Vec<(String, String)> {
        vec![
            ("oauth_consumer_key".to_string(), self.consumer_key.clone()),
            ("oauth_nonce".to_string(), nonce.to_string()),
            (
                "oauth_signature_method".to_string(),
                SIGNATURE_METHOD.to_string(),
            ),
            ("oauth_timestamp".to_string(), timestamp.to_string()),
            ("oauth_version".to_string(), OAUTH_VERSION.to_string()),
        ]
    }

    fn sign(&self, base_string: &str) -> String {
        // No token secret in two-legged OAuth, so the key ends with a bare '&'
        let key = format!("{}&", percent_encode(&self.consumer_secret));
        let mut mac =
            HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC accepts keys of any length");
        mac.update(base_string.as_bytes());
        STANDARD.encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for OAuth1Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Signer").finish_non_exhaustive()
    }
}

/// Build the signature base string per RFC 5849 section 3.4.1
pub fn signature_base_string(method: &str, url: &Url, oauth_params: &[(String, String)]) -> String {
    let mut base_url = url.clone();
    base_url.set_query(None);
    base_url.set_fragment(None);

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
        .chain(
            oauth_params
                .iter()
                .map(|(k, v)| (percent_encode(k), percent_encode(v))),
        )
        .collect();
    params.sort();

    let normalized = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_uppercase(),
        percent_encode(base_url.as_str()),
        percent_encode(&normalized)
    )
}
