//! Azure Blob storage through the Resource Manager REST API, authenticated
//! as a service principal (OAuth2 client credentials).

use super::{http_client, send_json, ProviderError};
use crate::checks::{azure::BLOB_CHECKS, CheckSpec};
use crate::config::AzureCredentials;
use crate::model::{ConfigKind, StorageProvider};
use reqwest::blocking::Client;
use serde_json::Value;
use std::cell::RefCell;
use std::time::Duration;
use tracing::debug;

const LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";
const SUBSCRIPTION_API_VERSION: &str = "2022-12-01";
const STORAGE_API_VERSION: &str = "2023-01-01";

pub struct BlobProvider {
    http: Client,
    login: String,
    management: String,
    creds: AzureCredentials,
    account: String,
    token: RefCell<Option<String>>,
    account_id: RefCell<Option<String>>,
}

impl BlobProvider {
    pub fn connect(creds: AzureCredentials, account: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoints(creds, account, timeout, LOGIN_ENDPOINT, MANAGEMENT_ENDPOINT)
    }

    pub fn with_endpoints(
        creds: AzureCredentials,
        account: &str,
        timeout: Duration,
        login: &str,
        management: &str,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(timeout)?,
            login: login.trim_end_matches('/').to_string(),
            management: management.trim_end_matches('/').to_string(),
            creds,
            account: account.to_string(),
            token: RefCell::new(None),
            account_id: RefCell::new(None),
        })
    }

    fn token(&self) -> Result<String, ProviderError> {
        if let Some(token) = self.token.borrow().as_ref() {
            return Ok(token.clone());
        }
        let url = format!("{}/{}/oauth2/v2.0/token", self.login, self.creds.tenant_id);
        let body = send_json(self.http.post(url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.creds.client_id.as_str()),
            ("client_secret", self.creds.client_secret.as_str()),
            ("scope", MANAGEMENT_SCOPE),
        ]))?;
        let token = body["access_token"]
            .as_str()
            .ok_or_else(|| ProviderError::Other("token response carried no access_token".into()))?
            .to_string();
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn get(&self, path: &str, api_version: &str) -> Result<Value, ProviderError> {
        let url = format!("{}{}", self.management, path);
        send_json(self.http.get(url).query(&[("api-version", api_version)]).bearer_auth(self.token()?))
    }

    /// Follows `nextLink` until the listing is exhausted.
    fn list(&self, path: &str) -> Result<Vec<Value>, ProviderError> {
        let mut items = Vec::new();
        let mut page = self.get(path, STORAGE_API_VERSION)?;
        loop {
            if let Some(values) = page["value"].as_array() {
                items.extend(values.iter().cloned());
            }
            match page["nextLink"].as_str() {
                Some(next) if !next.is_empty() => {
                    page = send_json(self.http.get(next).bearer_auth(self.token()?))?;
                }
                _ => break,
            }
        }
        Ok(items)
    }

    fn storage_accounts(&self) -> Result<Vec<Value>, ProviderError> {
        self.list(&format!("/subscriptions/{}/providers/Microsoft.Storage/storageAccounts", self.creds.subscription_id))
    }

    /// Resource id of the selected storage account.
    fn account_id(&self) -> Result<String, ProviderError> {
        if let Some(id) = self.account_id.borrow().as_ref() {
            return Ok(id.clone());
        }
        let id = self
            .storage_accounts()?
            .iter()
            .find(|a| a["name"].as_str() == Some(self.account.as_str()))
            .and_then(|a| a["id"].as_str().map(str::to_string))
            .ok_or_else(|| ProviderError::api("StorageAccountNotFound", format!("storage account {} not found", self.account)))?;
        *self.account_id.borrow_mut() = Some(id.clone());
        Ok(id)
    }
}

impl StorageProvider for BlobProvider {
    fn resource_noun(&self) -> &'static str { "Container" }

    fn checks(&self) -> &'static [CheckSpec] { BLOB_CHECKS }

    fn validate_credentials(&self) -> Result<(), ProviderError> {
        let sub = self.get(&format!("/subscriptions/{}", self.creds.subscription_id), SUBSCRIPTION_API_VERSION)?;
        debug!(state = sub["state"].as_str().unwrap_or_default(), "subscription resolved");
        Ok(())
    }

    fn validate_scope(&self) -> Result<bool, ProviderError> {
        match self.account_id() {
            Ok(_) => Ok(true),
            Err(e) if e.code() == Some("StorageAccountNotFound") => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_resources(&self) -> Result<Vec<String>, ProviderError> {
        let containers = self.list(&format!("{}/blobServices/default/containers", self.account_id()?))?;
        Ok(containers.iter().filter_map(|c| c["name"].as_str().map(str::to_string)).collect())
    }

    fn get_config(&self, container: &str, kind: ConfigKind) -> Result<Value, ProviderError> {
        debug!(container, ?kind, "fetching storage configuration");
        let account = self.account_id()?;
        let path = match kind {
            ConfigKind::Account => account,
            ConfigKind::BlobService => format!("{}/blobServices/default", account),
            ConfigKind::Container => format!("{}/blobServices/default/containers/{}", account, container),
            other => return Err(ProviderError::Other(format!("{:?} is not a blob storage configuration", other))),
        };
        self.get(&path, STORAGE_API_VERSION)
    }

    fn test_permissions(&self, _container: &str, _permissions: &[&str], _anonymous: bool) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Other("permission probes are not supported for blob storage".into()))
    }
}
