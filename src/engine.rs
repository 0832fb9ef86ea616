use crate::checks::{CheckSpec, Fetched, Source};
use crate::error::AuditError;
use crate::model::{CheckResult, StorageProvider, Target};
use crate::providers::ProviderError;
use crate::report::StatusReporter;
use std::io::{self, Write};
use tracing::debug;

/// Runs a provider's check table against one resource or every resource
/// visible to the credentials.
pub struct Auditor<P: StorageProvider, W: Write + Send + 'static = io::Stdout> {
    provider: P,
    target: Target,
    reporter: StatusReporter<W>,
}

impl<P: StorageProvider> Auditor<P> {
    pub fn new(provider: P, target: Target) -> Self {
        Self::with_reporter(provider, target, StatusReporter::stdout())
    }
}

impl<P: StorageProvider, W: Write + Send + 'static> Auditor<P, W> {
    pub fn with_reporter(provider: P, target: Target, reporter: StatusReporter<W>) -> Self {
        Self { provider, target, reporter }
    }

    #[cfg(test)]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn validate_credentials(&self) -> Result<(), AuditError> {
        self.provider.validate_credentials().map_err(|e| {
            debug!(code = e.code().unwrap_or("none"), "credential validation failed");
            AuditError::InvalidCredentials(e)
        })
    }

    /// True iff `name` is non-empty and present in the provider's listing.
    pub fn validate_resource(&self, name: &str) -> Result<bool, ProviderError> {
        if name.is_empty() {
            return Ok(false);
        }
        Ok(self.provider.list_resources()?.iter().any(|r| r == name))
    }

    /// Credential errors abort before any resource-scoped call and are the
    /// only error returned. Everything else is reported inline.
    pub fn run(&mut self) -> Result<Vec<CheckResult>, AuditError> {
        self.validate_credentials()?;
        let noun = self.provider.resource_noun();

        if let Some(scope) = self.target.scope.clone() {
            self.reporter.info(&format!("Selected Storage Account: {}", scope));
            self.reporter.begin("Validating Storage Account...");
            match self.provider.validate_scope() {
                Ok(true) => self.reporter.finish("Storage Account Found!", true),
                Ok(false) => {
                    self.reporter.finish("Invalid Storage Account Requested!", false);
                    return Ok(Vec::new());
                }
                Err(e) => {
                    self.reporter.finish(&format!("Unknown Error {}", e), false);
                    return Ok(Vec::new());
                }
            }
        }

        let mut results = Vec::new();
        if !self.target.resource.is_empty() {
            let name = self.target.resource.clone();
            results.extend(self.audit_resource(&name));
            return Ok(results);
        }

        self.reporter.info(&format!("No Specific {} Name Provided, Auditing All", noun));
        let resources = match self.provider.list_resources() {
            Ok(resources) => resources,
            Err(e) => {
                self.reporter.finish(&format!("Unknown Error {}", e), false);
                return Ok(results);
            }
        };
        debug!(count = resources.len(), "resources discovered");
        for name in resources {
            results.extend(self.audit_resource(&name));
        }
        Ok(results)
    }

    fn audit_resource(&mut self, name: &str) -> Vec<CheckResult> {
        let noun = self.provider.resource_noun();
        self.reporter.info(&format!("Selected {}: {}", noun, name));
        self.reporter.begin(&format!("Validating {}...", noun));
        match self.validate_resource(name) {
            Ok(true) => self.reporter.finish(&format!("{} Found!", noun), true),
            Ok(false) => {
                self.reporter.finish(&format!("Invalid {} Requested!", noun), false);
                return Vec::new();
            }
            Err(e) => {
                self.reporter.finish(&format!("Unknown Error {}", e), false);
                return Vec::new();
            }
        }
        self.run_checks(name)
    }

    /// Runs the full table in order. A failing fetch becomes one Unknown
    /// finding and the sequence continues.
    pub fn run_checks(&mut self, name: &str) -> Vec<CheckResult> {
        let mut results = Vec::new();
        for spec in self.provider.checks() {
            self.reporter.begin(spec.message);
            let findings = match self.fetch(name, spec) {
                Ok(fetched) => spec.rules.iter().flat_map(|rule| rule.evaluate(spec.id, &fetched)).collect(),
                Err(e) => {
                    debug!(check = spec.id, error = %e, "check failed");
                    vec![CheckResult::unknown(spec.id, &e)]
                }
            };
            for finding in &findings {
                self.reporter.report(finding);
            }
            results.extend(findings);
        }
        results
    }

    fn fetch(&self, name: &str, spec: &CheckSpec) -> Result<Fetched, ProviderError> {
        match spec.source {
            Source::Config(kind) => match self.provider.get_config(name, kind) {
                Ok(doc) => Ok(Fetched::Config(Some(doc))),
                Err(e) if e.code().is_some_and(|code| spec.not_configured.contains(&code)) => Ok(Fetched::Config(None)),
                Err(e) => Err(e),
            },
            Source::Permissions { permissions, anonymous } => {
                self.provider.test_permissions(name, permissions, anonymous).map(Fetched::Held)
            }
        }
    }
}

/// Per-status totals for the closing summary line.
pub fn summarize(results: &[CheckResult]) -> (usize, usize, usize) {
    let pass = results.iter().filter(|r| r.status.is_pass()).count();
    let fail = results.iter().filter(|r| r.status.is_fail()).count();
    let unknown = results.iter().filter(|r| r.status.is_unknown()).count();
    (pass, fail, unknown)
}
