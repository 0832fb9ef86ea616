//! Google Cloud Storage JSON API with a service-account token.

use super::{http_client, send_json, ProviderError};
use crate::checks::{gcp::GCS_CHECKS, CheckSpec};
use crate::config::ServiceAccount;
use crate::model::{ConfigKind, StorageProvider};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

const STORAGE_ENDPOINT: &str = "https://storage.googleapis.com/storage/v1";
const READ_ONLY_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform.read-only";
const JWT_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME: u64 = 3600;

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

pub struct GcsProvider {
    http: Client,
    storage: String,
    account: ServiceAccount,
    token: RefCell<Option<String>>,
}

impl GcsProvider {
    pub fn connect(account: ServiceAccount, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoint(account, timeout, STORAGE_ENDPOINT)
    }

    /// The token endpoint always comes from the key file's `token_uri`.
    pub fn with_endpoint(account: ServiceAccount, timeout: Duration, storage: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            storage: storage.trim_end_matches('/').to_string(),
            account,
            token: RefCell::new(None),
        })
    }

    fn assertion(&self) -> Result<String, ProviderError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ProviderError::Other(e.to_string()))?
            .as_secs();
        let claims = Claims {
            iss: &self.account.client_email,
            scope: READ_ONLY_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + TOKEN_LIFETIME,
        };
        let key = EncodingKey::from_rsa_pem(self.account.private_key.as_bytes())
            .map_err(|e| ProviderError::api("InvalidPrivateKey", e.to_string()))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| ProviderError::Other(e.to_string()))
    }

    fn token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let assertion = self.assertion()?;
        let body = send_json(
            self.http
                .post(&self.account.token_uri)
                .form(&[("grant_type", JWT_GRANT), ("assertion", assertion.as_str())]),
        )?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| ProviderError::Other("token response carried no access_token".into()))?
            .to_string();
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn get(&self, path: &str, query: &[(&str, &str)], anonymous: bool) -> Result<Value, ProviderError> {
        let mut request = self.http.get(format!("{}{}", self.storage, path)).query(query);
        if !anonymous {
            request = request.bearer_auth(self.token()?);
        }
        send_json(request)
    }
}

impl StorageProvider for GcsProvider {
    fn resource_noun(&self) -> &'static str { "Bucket" }

    fn checks(&self) -> &'static [CheckSpec] { GCS_CHECKS }

    fn validate_credentials(&self) -> Result<(), ProviderError> {
        self.get("/b", &[("project", self.account.project_id.as_str()), ("maxResults", "1")], false)?;
        debug!(client = %self.account.client_email, "service account accepted");
        Ok(())
    }

    fn list_resources(&self) -> Result<Vec<String>, ProviderError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![("project", self.account.project_id.as_str())];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page = self.get("/b", &query, false)?;
            if let Some(items) = page["items"].as_array() {
                names.extend(items.iter().filter_map(|b| b["name"].as_str().map(str::to_string)));
            }
            match page["nextPageToken"].as_str() {
                Some(next) if !next.is_empty() => page_token = Some(next.to_string()),
                _ => break,
            }
        }
        Ok(names)
    }

    fn get_config(&self, bucket: &str, kind: ConfigKind) -> Result<Value, ProviderError> {
        debug!(bucket, ?kind, "fetching bucket metadata");
        match kind {
            ConfigKind::Bucket => self.get(&format!("/b/{}", bucket), &[], false),
            other => Err(ProviderError::Other(format!("{:?} is not a GCS configuration", other))),
        }
    }

    fn test_permissions(&self, bucket: &str, permissions: &[&str], anonymous: bool) -> Result<Vec<String>, ProviderError> {
        let query: Vec<(&str, &str)> = permissions.iter().map(|p| ("permissions", *p)).collect();
        let body = self.get(&format!("/b/{}/iam/testPermissions", bucket), &query, anonymous)?;
        Ok(body["permissions"]
            .as_array()
            .map(|held| held.iter().filter_map(|p| p.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::serve;

    fn provider(base: &str) -> GcsProvider {
        let account = ServiceAccount {
            client_email: "auditor@project.iam.gserviceaccount.com".into(),
            private_key: String::new(),
            project_id: "project".into(),
            token_uri: format!("{}/token", base),
        };
        let p = GcsProvider::with_endpoint(account, Duration::from_secs(5), base).unwrap();
        *p.token.borrow_mut() = Some("token-1".into());
        p
    }

    #[test]
    fn bucket_listing_follows_page_token() {
        let (base, requests) = serve(vec![
            (200, r#"{"items": [{"name": "logs"}], "nextPageToken": "page-2"}"#),
            (200, r#"{"items": [{"name": "assets"}]}"#),
        ]);
        assert_eq!(provider(&base).list_resources().unwrap(), vec!["logs", "assets"]);
        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("GET /b?project=project "));
        assert!(requests[1].contains("pageToken=page-2"));
    }

    #[test]
    fn anonymous_probe_sends_no_token() {
        let (base, requests) = serve(vec![
            (200, r#"{"kind": "storage#testIamPermissionsResponse"}"#),
            (200, r#"{"permissions": ["storage.objects.list"]}"#),
        ]);
        let p = provider(&base);
        let perms = ["storage.objects.list", "storage.objects.get"];
        assert!(p.test_permissions("assets", &perms, true).unwrap().is_empty());
        assert_eq!(p.test_permissions("assets", &perms, false).unwrap(), vec!["storage.objects.list"]);

        let requests = requests.lock().unwrap();
        assert!(requests[0].starts_with("GET /b/assets/iam/testPermissions?permissions=storage.objects.list&permissions=storage.objects.get"));
        assert!(!requests[0].to_ascii_lowercase().contains("authorization:"));
        assert!(requests[1].to_ascii_lowercase().contains("authorization: bearer token-1"));
    }

    #[test]
    fn bucket_metadata_error_keeps_google_status() {
        let (base, _) = serve(vec![(404, r#"{"error": {"code": 404, "status": "NOT_FOUND", "message": "bucket missing"}}"#)]);
        let err = provider(&base).get_config("gone", ConfigKind::Bucket).unwrap_err();
        assert_eq!(err.code(), Some("NOT_FOUND"));
    }
}
