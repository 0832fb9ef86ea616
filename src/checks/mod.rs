//! Check tables and the generic rule evaluator.
//!
//! Each provider ships a constant slice of [`CheckSpec`]s. A spec says what
//! to fetch, which provider error codes mean "this feature has no
//! configuration", and which [`Rule`]s turn the fetched document into
//! findings.

pub mod aws;
pub mod azure;
pub mod gcp;

use crate::model::{CheckResult, ConfigKind, Status};
use serde_json::Value;

/// Where a check gets its input from.
#[derive(Debug, Clone, Copy)]
pub enum Source {
    Config(ConfigKind),
    Permissions { permissions: &'static [&'static str], anonymous: bool },
}

#[derive(Debug, Clone, Copy)]
pub struct CheckSpec {
    pub id: &'static str,
    /// Spinner text while the fetch is in flight.
    pub message: &'static str,
    pub source: Source,
    pub not_configured: &'static [&'static str],
    pub rules: &'static [Rule],
}

/// Input handed to rules once the fetch succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// `None` when the provider reported the feature as not configured.
    Config(Option<Value>),
    Held(Vec<String>),
}

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Pointer present (or the whole document when `pointer` is empty).
    Presence { pointer: &'static str, secure: bool, present: &'static str, absent: &'static str },
    /// String status field, reported as "<label> <value>.".
    Status { pointer: &'static str, expected: &'static str, label: &'static str },
    /// Boolean flag; absent counts as `false`.
    Flag { pointer: &'static str, secure: bool, pass: &'static str, fail: &'static str },
    Equals { pointer: &'static str, expected: &'static str, absent_passes: bool, pass: &'static str, fail: &'static str },
    /// Passes unless the field holds `rejected`.
    NotEquals { pointer: &'static str, rejected: &'static str, pass: &'static str, fail: &'static str },
    NonEmpty { pointer: &'static str, pass: &'static str, fail: &'static str },
    /// S3-style ACL: one failure per grant to a public group.
    PublicGrants,
    /// Informational list of held permissions.
    Held { subject: &'static str },
}

const PUBLIC_GROUPS: [&str; 2] = ["AllUsers", "AuthenticatedUsers"];

fn acl_wording(permission: &str, group: &str) -> String {
    match permission {
        "READ" => format!("{} can List Objects in the Bucket", group),
        "WRITE" => format!("{} can Create, Modify and Delete Objects in the Bucket", group),
        "READ_ACP" => format!("{} can Read Bucket ACL", group),
        "WRITE_ACP" => format!("{} can Modify the Bucket ACL", group),
        "FULL_CONTROL" => format!("{} has Full Control on the Bucket", group),
        other => format!("{} has {} permission on the Bucket", group, other),
    }
}

fn lookup<'a>(doc: Option<&'a Value>, pointer: &str) -> Option<&'a Value> {
    doc?.pointer(pointer).filter(|v| !v.is_null())
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Rule {
    pub fn evaluate(&self, label: &str, fetched: &Fetched) -> Vec<CheckResult> {
        let doc = match fetched {
            Fetched::Config(doc) => doc.as_ref(),
            Fetched::Held(held) => return self.evaluate_held(label, held),
        };
        let verdict = |passed: bool, detail: &str| vec![CheckResult::verdict(label, passed, detail)];
        match *self {
            Rule::Presence { pointer, secure, present, absent } => {
                if lookup(doc, pointer).is_some() {
                    verdict(secure, present)
                } else {
                    verdict(!secure, absent)
                }
            }
            Rule::Status { pointer, expected, label: name } => match lookup(doc, pointer) {
                Some(value) => {
                    let value = as_text(value);
                    vec![CheckResult::verdict(label, value == expected, format!("{} {}.", name, value))]
                }
                None => vec![CheckResult::verdict(label, false, format!("{} not configured.", name))],
            },
            Rule::Flag { pointer, secure, pass, fail } => {
                let value = lookup(doc, pointer).and_then(Value::as_bool).unwrap_or(false);
                if value == secure { verdict(true, pass) } else { verdict(false, fail) }
            }
            Rule::Equals { pointer, expected, absent_passes, pass, fail } => {
                let passed = match lookup(doc, pointer) {
                    Some(value) => as_text(value).eq_ignore_ascii_case(expected),
                    None => absent_passes,
                };
                if passed { verdict(true, pass) } else { verdict(false, fail) }
            }
            Rule::NotEquals { pointer, rejected, pass, fail } => {
                let hit = lookup(doc, pointer).map(|v| as_text(v).eq_ignore_ascii_case(rejected)).unwrap_or(false);
                if hit { verdict(false, fail) } else { verdict(true, pass) }
            }
            Rule::NonEmpty { pointer, pass, fail } => {
                let populated = match lookup(doc, pointer) {
                    Some(Value::Array(items)) => !items.is_empty(),
                    Some(Value::Object(map)) => !map.is_empty(),
                    Some(Value::String(s)) => !s.is_empty(),
                    Some(_) => true,
                    None => false,
                };
                if populated { verdict(true, pass) } else { verdict(false, fail) }
            }
            Rule::PublicGrants => public_grants(label, doc),
            Rule::Held { .. } => Vec::new(),
        }
    }

    fn evaluate_held(&self, label: &str, held: &[String]) -> Vec<CheckResult> {
        let Rule::Held { subject } = *self else { return Vec::new() };
        if held.is_empty() {
            return vec![CheckResult::new(label, Status::Info, format!("{} hold none of the tested permissions", subject))];
        }
        held.iter()
            .map(|p| CheckResult::new(label, Status::Info, format!("{} hold {}", subject, p)))
            .collect()
    }
}

fn public_grants(label: &str, doc: Option<&Value>) -> Vec<CheckResult> {
    let Some(grants) = lookup(doc, "/Grants").and_then(Value::as_array) else {
        return vec![CheckResult::verdict(label, false, "Bucket ACL not configured.")];
    };
    let mut results = Vec::new();
    for grant in grants {
        let grantee = &grant["Grantee"];
        if grantee["Type"].as_str() != Some("Group") {
            continue;
        }
        let group = grantee["URI"].as_str().and_then(|uri| uri.rsplit('/').next()).unwrap_or_default();
        if PUBLIC_GROUPS.contains(&group) {
            let permission = grant["Permission"].as_str().unwrap_or("UNKNOWN");
            results.push(CheckResult::verdict(label, false, acl_wording(permission, group)));
        }
    }
    if results.is_empty() {
        results.push(CheckResult::verdict(label, true, "Bucket ACLs configured properly."));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(v: Value) -> Fetched { Fetched::Config(Some(v)) }

    fn spec(table: &[CheckSpec], id: &str) -> CheckSpec {
        *table.iter().find(|c| c.id == id).unwrap()
    }

    fn run(spec: &CheckSpec, fetched: &Fetched) -> Vec<CheckResult> {
        spec.rules.iter().flat_map(|r| r.evaluate(spec.id, fetched)).collect()
    }

    #[test]
    fn versioning_and_mfa_enabled_both_pass() {
        let s = spec(aws::S3_CHECKS, "versioning");
        let out = run(&s, &config(json!({"Status": "Enabled", "MFADelete": "Enabled"})));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.status.is_pass()));
        assert_eq!(out[0].detail, "Object Versioning Enabled.");
        assert_eq!(out[1].detail, "MFA Delete Enabled.");
    }

    #[test]
    fn versioning_absent_reports_not_configured() {
        let s = spec(aws::S3_CHECKS, "versioning");
        let out = run(&s, &config(json!({})));
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|r| r.status.is_fail()));
        assert_eq!(out[0].detail, "Object Versioning not configured.");
        assert_eq!(out[1].detail, "MFA Delete not configured.");
    }

    #[test]
    fn suspended_versioning_names_the_status() {
        let s = spec(aws::S3_CHECKS, "versioning");
        let out = run(&s, &config(json!({"Status": "Suspended", "MFADelete": "Disabled"})));
        assert_eq!(out[0].detail, "Object Versioning Suspended.");
        assert!(out[0].status.is_fail());
        assert_eq!(out[1].detail, "MFA Delete Disabled.");
    }

    #[test]
    fn website_absent_passes() {
        let s = spec(aws::S3_CHECKS, "website");
        let out = run(&s, &Fetched::Config(None));
        assert_eq!(out, vec![CheckResult::verdict("website", true, "Static Website Hosting not configured.")]);
        let out = run(&s, &config(json!({"IndexDocument": {"Suffix": "index.html"}})));
        assert!(out[0].status.is_fail());
    }

    #[test]
    fn logging_requires_logging_enabled_section() {
        let s = spec(aws::S3_CHECKS, "logging");
        assert!(run(&s, &config(json!({"LoggingEnabled": {"TargetBucket": "logs"}})))[0].status.is_pass());
        let out = run(&s, &config(json!({})));
        assert!(out[0].status.is_fail());
        assert_eq!(out[0].detail, "Audit Logging not configured.");
    }

    #[test]
    fn public_read_grant_yields_single_failure() {
        let doc = json!({"Grants": [
            {"Grantee": {"Type": "CanonicalUser", "ID": "abc"}, "Permission": "FULL_CONTROL"},
            {"Grantee": {"Type": "Group", "URI": "http://acs.amazonaws.com/groups/global/AllUsers"}, "Permission": "READ"}
        ]});
        let out = Rule::PublicGrants.evaluate("acl", &config(doc));
        assert_eq!(out.len(), 1);
        assert!(out[0].status.is_fail());
        assert!(out[0].detail.contains("AllUsers"));
        assert!(out[0].detail.contains("List Objects"));
    }

    #[test]
    fn private_acl_passes_and_missing_grants_fails() {
        let doc = json!({"Grants": [{"Grantee": {"Type": "Group", "URI": "http://acs.amazonaws.com/groups/s3/LogDelivery"}, "Permission": "WRITE"}]});
        let out = Rule::PublicGrants.evaluate("acl", &config(doc));
        assert_eq!(out[0].detail, "Bucket ACLs configured properly.");
        let out = Rule::PublicGrants.evaluate("acl", &config(json!({})));
        assert_eq!(out[0].detail, "Bucket ACL not configured.");
        assert!(out[0].status.is_fail());
    }

    #[test]
    fn azure_network_rules() {
        let doc = config(json!({"properties": {
            "allowBlobPublicAccess": true,
            "networkAcls": {"defaultAction": "Allow", "ipRules": []}
        }}));
        assert!(run(&spec(azure::BLOB_CHECKS, "public_access"), &doc)[0].status.is_fail());
        assert!(run(&spec(azure::BLOB_CHECKS, "firewall"), &doc)[0].status.is_fail());
        assert!(run(&spec(azure::BLOB_CHECKS, "default_action"), &doc)[0].status.is_fail());
        assert!(run(&spec(azure::BLOB_CHECKS, "customer_managed_key"), &doc)[0].status.is_fail());

        let doc = config(json!({"properties": {
            "networkAcls": {"defaultAction": "Deny", "ipRules": [{"value": "10.0.0.1", "action": "Allow"}]},
            "encryption": {"keyVaultProperties": {"keyname": "k"}}
        }}));
        assert!(run(&spec(azure::BLOB_CHECKS, "public_access"), &doc)[0].status.is_pass());
        assert!(run(&spec(azure::BLOB_CHECKS, "firewall"), &doc)[0].status.is_pass());
        assert!(run(&spec(azure::BLOB_CHECKS, "default_action"), &doc)[0].status.is_pass());
        assert!(run(&spec(azure::BLOB_CHECKS, "customer_managed_key"), &doc)[0].status.is_pass());
    }

    #[test]
    fn container_public_access_level() {
        let s = spec(azure::BLOB_CHECKS, "container_public_access");
        assert!(run(&s, &config(json!({"properties": {"publicAccess": "None"}})))[0].status.is_pass());
        assert!(run(&s, &config(json!({"properties": {}})))[0].status.is_pass());
        assert!(run(&s, &config(json!({"properties": {"publicAccess": "Container"}})))[0].status.is_fail());
    }

    #[test]
    fn public_access_block_not_configured_fails_all_four() {
        let s = spec(aws::S3_CHECKS, "public_access_block");
        assert_eq!(s.not_configured, &["NoSuchPublicAccessBlockConfiguration"]);
        let out = run(&s, &Fetched::Config(None));
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|r| r.status.is_fail()));
        assert_eq!(out[0].detail, "Public ACLs not blocked.");
        assert_eq!(out[3].detail, "Public Bucket access not restricted.");

        let all = config(json!({
            "BlockPublicAcls": true, "IgnorePublicAcls": true,
            "BlockPublicPolicy": true, "RestrictPublicBuckets": true
        }));
        assert!(run(&s, &all).iter().all(|r| r.status.is_pass()));
    }

    #[test]
    fn azure_secure_transfer() {
        let s = spec(azure::BLOB_CHECKS, "secure_transfer");
        let out = run(&s, &config(json!({"properties": {"supportsHttpsTrafficOnly": true}})));
        assert_eq!(out, vec![CheckResult::verdict("secure_transfer", true, "Secure Transfer required.")]);
        assert!(run(&s, &config(json!({"properties": {"supportsHttpsTrafficOnly": false}})))[0].status.is_fail());
        assert!(run(&s, &config(json!({"properties": {}})))[0].status.is_fail());
    }

    #[test]
    fn azure_blob_versioning_and_soft_delete() {
        let s = spec(azure::BLOB_CHECKS, "versioning");
        let doc = config(json!({"properties": {
            "isVersioningEnabled": true,
            "deleteRetentionPolicy": {"enabled": false, "days": 7}
        }}));
        let out = run(&s, &doc);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].detail, "Blob Versioning Enabled.");
        assert!(out[0].status.is_pass());
        assert_eq!(out[1].detail, "Blob Soft Delete not configured.");
        assert!(out[1].status.is_fail());

        let out = run(&s, &config(json!({"properties": {}})));
        assert!(out.iter().all(|r| r.status.is_fail()));
    }

    #[test]
    fn gcs_uniform_access() {
        let s = spec(gcp::GCS_CHECKS, "uniform_access");
        let on = config(json!({"iamConfiguration": {"uniformBucketLevelAccess": {"enabled": true}}}));
        assert!(run(&s, &on)[0].status.is_pass());
        let off = config(json!({"iamConfiguration": {"uniformBucketLevelAccess": {"enabled": false}}}));
        assert_eq!(run(&s, &off)[0].detail, "Uniform Bucket Level Access not configured.");
        assert!(run(&s, &config(json!({})))[0].status.is_fail());
    }

    #[test]
    fn gcs_public_access_prevention_must_be_enforced() {
        let s = spec(gcp::GCS_CHECKS, "public_access_prevention");
        let enforced = config(json!({"iamConfiguration": {"publicAccessPrevention": "enforced"}}));
        assert!(run(&s, &enforced)[0].status.is_pass());
        let inherited = config(json!({"iamConfiguration": {"publicAccessPrevention": "inherited"}}));
        assert!(run(&s, &inherited)[0].status.is_fail());
        let out = run(&s, &config(json!({"iamConfiguration": {}})));
        assert_eq!(out[0].detail, "Public Access Prevention not enforced.");
        assert!(out[0].status.is_fail());
    }

    #[test]
    fn gcs_customer_managed_key() {
        let s = spec(gcp::GCS_CHECKS, "encryption");
        let cmek = config(json!({"encryption": {"defaultKmsKeyName": "projects/p/locations/l/keyRings/r/cryptoKeys/k"}}));
        assert!(run(&s, &cmek)[0].status.is_pass());
        let out = run(&s, &config(json!({"name": "assets"})));
        assert_eq!(out[0].detail, "Customer Managed Encryption Key not configured.");
        assert!(out[0].status.is_fail());
    }

    #[test]
    fn held_permissions_are_informational() {
        let rule = Rule::Held { subject: "Unauthenticated users" };
        let out = rule.evaluate("anon", &Fetched::Held(vec!["storage.objects.list".into()]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, Status::Info);
        assert!(out[0].detail.contains("storage.objects.list"));
        let out = rule.evaluate("anon", &Fetched::Held(Vec::new()));
        assert_eq!(out[0].status, Status::Info);
    }

    #[test]
    fn every_spec_yields_a_finding() {
        for table in [aws::S3_CHECKS, azure::BLOB_CHECKS, gcp::GCS_CHECKS] {
            for s in table {
                let fetched = match s.source {
                    Source::Config(_) => Fetched::Config(None),
                    Source::Permissions { .. } => Fetched::Held(Vec::new()),
                };
                assert!(!run(s, &fetched).is_empty(), "{} produced no findings", s.id);
            }
        }
    }
}
