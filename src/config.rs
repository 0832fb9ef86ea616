//! Credential resolution, credential files and template generation.
//!
//! Credentials come from inline flags first, then from a JSON credential
//! file in the shape written by `--gen-config`. Secrets never reach `Debug`
//! output or the log.

use crate::error::ConfigError;
use dialoguer::{Input, Password};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const REDACTED: &str = "<redacted>";
const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Aws,
    Gcp,
    Azure,
}

impl Platform {
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Aws => "aws",
            Platform::Gcp => "gcp",
            Platform::Azure => "az",
        }
    }

    pub fn template_file_name(&self) -> String {
        format!("{}_config.json", self.key())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AzureCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub subscription_id: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &REDACTED)
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcpCredentials {
    pub service_account_file: PathBuf,
}

/// The fields of a Google service-account key file that are needed to mint
/// an access token.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
    pub project_id: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .field("private_key", &REDACTED)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Malformed { path: path.to_path_buf(), source })
}

/// Credential material exactly as supplied on the command line. Not
/// `Debug`, the inline flags carry raw secrets.
#[derive(Default, Clone)]
pub struct CredentialArgs {
    pub aws: Option<Vec<String>>,
    pub gcp: Option<PathBuf>,
    pub az: Option<Vec<String>>,
    pub config: Option<PathBuf>,
}

impl CredentialArgs {
    fn inline_aws(&self) -> Option<AwsCredentials> {
        match self.aws.as_deref()? {
            [id, secret] => Some(AwsCredentials { access_key_id: id.clone(), secret_access_key: secret.clone() }),
            _ => None,
        }
    }

    fn inline_azure(&self) -> Option<AzureCredentials> {
        match self.az.as_deref()? {
            [tenant, client, secret, subscription] => Some(AzureCredentials {
                tenant_id: tenant.clone(),
                client_id: client.clone(),
                client_secret: secret.clone(),
                subscription_id: subscription.clone(),
            }),
            _ => None,
        }
    }

    /// `None` means "use the SDK default credential chain".
    pub fn aws(&self) -> Result<Option<AwsCredentials>, ConfigError> {
        if let Some(creds) = self.inline_aws() {
            return Ok(Some(creds));
        }
        match &self.config {
            Some(path) => load(path).map(Some),
            None => {
                debug!("no explicit aws credentials, falling back to the default chain");
                Ok(None)
            }
        }
    }

    pub fn azure(&self) -> Result<AzureCredentials, ConfigError> {
        if let Some(creds) = self.inline_azure() {
            return Ok(creds);
        }
        match &self.config {
            Some(path) => load(path),
            None => Err(ConfigError::MissingCredentials("supply --az-creds or --config".into())),
        }
    }

    /// Resolves and parses the service-account key file.
    pub fn gcp(&self) -> Result<ServiceAccount, ConfigError> {
        let path = match (&self.gcp, &self.config) {
            (Some(path), _) => path.clone(),
            (None, Some(config)) => load::<GcpCredentials>(config)?.service_account_file,
            (None, None) => return Err(ConfigError::MissingCredentials("supply --gcp-creds or --config".into())),
        };
        load(&path)
    }
}

/// "access_key_id" -> "Access key id"
pub fn prompt_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Interactive prompt; secret fields are read without echo.
pub fn ask(field: &str, secret: bool) -> Result<String, ConfigError> {
    let label = prompt_label(field);
    let value = if secret {
        Password::new().with_prompt(label).interact()?
    } else {
        Input::<String>::new().with_prompt(label).interact_text()?
    };
    Ok(value)
}

/// Builds the credential template for `platform`, taking values from the
/// inline flags when present and asking for each field otherwise.
pub fn build_template<F>(platform: Platform, args: &CredentialArgs, mut ask: F) -> Result<Value, ConfigError>
where
    F: FnMut(&str, bool) -> Result<String, ConfigError>,
{
    let value = match platform {
        Platform::Aws => {
            let creds = match args.inline_aws() {
                Some(creds) => creds,
                None => AwsCredentials {
                    access_key_id: ask("access_key_id", false)?,
                    secret_access_key: ask("secret_access_key", true)?,
                },
            };
            serde_json::to_value(creds)?
        }
        Platform::Azure => {
            let creds = match args.inline_azure() {
                Some(creds) => creds,
                None => AzureCredentials {
                    tenant_id: ask("tenant_id", false)?,
                    client_id: ask("client_id", false)?,
                    client_secret: ask("client_secret", true)?,
                    subscription_id: ask("subscription_id", false)?,
                },
            };
            serde_json::to_value(creds)?
        }
        Platform::Gcp => {
            let service_account_file = match &args.gcp {
                Some(path) => path.clone(),
                None => PathBuf::from(ask("service_account_file", false)?),
            };
            serde_json::to_value(GcpCredentials { service_account_file })?
        }
    };
    Ok(value)
}

/// Writes the template into `dir` and returns the path written.
pub fn write_template(platform: Platform, template: &Value, dir: &Path) -> Result<PathBuf, ConfigError> {
    let path = dir.join(platform.template_file_name());
    let body = serde_json::to_string_pretty(template)?;
    fs::write(&path, body).map_err(|source| ConfigError::Write { path: path.clone(), source })?;
    Ok(path)
}
