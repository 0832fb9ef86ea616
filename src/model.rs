use crate::checks::CheckSpec;
use crate::providers::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pass,
    Fail,
    /// The provider call failed for a reason other than "not configured".
    Unknown,
    /// Informational line, not a secure/insecure verdict.
    Info,
}

impl Status {
    pub fn is_pass(&self) -> bool { matches!(self, Status::Pass) }
    pub fn is_fail(&self) -> bool { matches!(self, Status::Fail) }
    pub fn is_unknown(&self) -> bool { matches!(self, Status::Unknown) }
}

/// One finding for one check against one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub label: String,
    pub status: Status,
    pub detail: String,
}

impl CheckResult {
    pub fn new(label: &str, status: Status, detail: impl Into<String>) -> Self {
        Self { label: label.to_string(), status, detail: detail.into() }
    }

    pub fn verdict(label: &str, passed: bool, detail: impl Into<String>) -> Self {
        Self::new(label, if passed { Status::Pass } else { Status::Fail }, detail)
    }

    pub fn unknown(label: &str, err: &ProviderError) -> Self {
        Self::new(label, Status::Unknown, format!("Unknown Error {}", err))
    }
}

/// What is being audited. An empty `resource` means every resource visible
/// to the credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub scope: Option<String>,
    pub resource: String,
}

impl Target {
    pub fn new(scope: Option<String>, resource: impl Into<String>) -> Self {
        let scope = scope.filter(|s| !s.is_empty());
        Self { scope, resource: resource.into() }
    }
}

/// Configuration documents a provider knows how to fetch for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    Website,
    Encryption,
    Logging,
    Versioning,
    Acl,
    PublicAccessBlock,
    Account,
    BlobService,
    Container,
    Bucket,
}

/// Capability surface every cloud provider implements. Configuration is
/// returned as a JSON document shaped like the provider's API response.
pub trait StorageProvider {
    /// Noun used in operator-facing lines, e.g. "Bucket" or "Container".
    fn resource_noun(&self) -> &'static str;

    /// Ordered check table run against each resource.
    fn checks(&self) -> &'static [CheckSpec];

    /// One cheap authenticated call.
    fn validate_credentials(&self) -> Result<(), ProviderError>;

    /// Validates the account tier, for providers that have one.
    fn validate_scope(&self) -> Result<bool, ProviderError> { Ok(true) }

    fn list_resources(&self) -> Result<Vec<String>, ProviderError>;

    fn get_config(&self, resource: &str, kind: ConfigKind) -> Result<serde_json::Value, ProviderError>;

    /// Returns the subset of `permissions` the caller holds. `anonymous`
    /// issues the probe without credentials.
    fn test_permissions(&self, resource: &str, permissions: &[&str], anonymous: bool) -> Result<Vec<String>, ProviderError>;
}
