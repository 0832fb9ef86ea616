//! S3 through the AWS SDK. The SDK is async; every call is driven to
//! completion on a private current-thread runtime so the auditor stays a
//! plain sequential loop.

use super::ProviderError;
use crate::checks::{aws::S3_CHECKS, CheckSpec};
use crate::config::AwsCredentials;
use crate::model::{ConfigKind, StorageProvider};
use aws_config::meta::region::RegionProviderChain;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::get_bucket_acl::GetBucketAclOutput;
use aws_sdk_s3::operation::get_bucket_encryption::GetBucketEncryptionOutput;
use aws_sdk_s3::operation::get_bucket_logging::GetBucketLoggingOutput;
use aws_sdk_s3::operation::get_bucket_versioning::GetBucketVersioningOutput;
use aws_sdk_s3::operation::get_bucket_website::GetBucketWebsiteOutput;
use aws_sdk_s3::operation::get_public_access_block::GetPublicAccessBlockOutput;
use aws_sdk_s3::types::BucketLocationConstraint;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const FALLBACK_REGION: &str = "us-east-1";

pub struct S3Provider {
    runtime: Runtime,
    sdk_config: SdkConfig,
    s3: aws_sdk_s3::Client,
    sts: aws_sdk_sts::Client,
    /// S3 clients keyed by region; buckets must be read from their own region.
    regional: RefCell<HashMap<String, aws_sdk_s3::Client>>,
    bucket_regions: RefCell<HashMap<String, String>>,
}

impl S3Provider {
    /// Without explicit keys the SDK default credential chain is used.
    pub fn connect(creds: Option<&AwsCredentials>, region: Option<&str>, timeout: Duration) -> Result<Self, ProviderError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Other(format!("failed to start runtime: {}", e)))?;

        let region = RegionProviderChain::first_try(region.map(|r| Region::new(r.to_string())))
            .or_default_provider()
            .or_else(Region::new(FALLBACK_REGION));
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region)
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        if let Some(creds) = creds {
            loader = loader.credentials_provider(aws_credential_types::Credentials::new(
                creds.access_key_id.as_str(),
                creds.secret_access_key.as_str(),
                None,
                None,
                "storage-audit",
            ));
        }
        let sdk_config = runtime.block_on(loader.load());
        debug!(region = ?sdk_config.region(), "aws sdk configured");

        Ok(Self {
            s3: aws_sdk_s3::Client::new(&sdk_config),
            sts: aws_sdk_sts::Client::new(&sdk_config),
            sdk_config,
            runtime,
            regional: RefCell::new(HashMap::new()),
            bucket_regions: RefCell::new(HashMap::new()),
        })
    }

    fn block<T, E, R, F>(&self, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, SdkError<E, R>>>,
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug + Send + Sync + 'static,
    {
        self.runtime.block_on(fut).map_err(sdk_error)
    }

    fn regional_client(&self, region: &str) -> aws_sdk_s3::Client {
        if self.sdk_config.region().map(|r| r.as_ref()) == Some(region) {
            return self.s3.clone();
        }
        self.regional
            .borrow_mut()
            .entry(region.to_string())
            .or_insert_with(|| {
                let conf = aws_sdk_s3::config::Builder::from(&self.sdk_config)
                    .region(Region::new(region.to_string()))
                    .build();
                aws_sdk_s3::Client::from_conf(conf)
            })
            .clone()
    }

    /// Location lookups go through us-east-1, which answers for every region.
    fn bucket_region(&self, bucket: &str) -> Result<String, ProviderError> {
        if let Some(region) = self.bucket_regions.borrow().get(bucket) {
            return Ok(region.clone());
        }
        let locator = self.regional_client(FALLBACK_REGION);
        let out = self.block(locator.get_bucket_location().bucket(bucket).send())?;
        let region = location_region(out.location_constraint());
        debug!(bucket, region = %region, "bucket region resolved");
        self.bucket_regions.borrow_mut().insert(bucket.to_string(), region.clone());
        Ok(region)
    }

    /// Client for the bucket's home region. If the location cannot be read,
    /// the configured region is used and any redirect surfaces per check.
    fn client_for(&self, bucket: &str) -> aws_sdk_s3::Client {
        match self.bucket_region(bucket) {
            Ok(region) => self.regional_client(&region),
            Err(e) => {
                debug!(bucket, error = %e, "bucket location unavailable");
                self.s3.clone()
            }
        }
    }
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if let Some(service) = err.as_service_error() {
        if let Some(code) = service.code() {
            return ProviderError::api(code, service.message().unwrap_or_default());
        }
    }
    ProviderError::Other(DisplayErrorContext(&err).to_string())
}

/// An empty constraint is us-east-1 and the legacy `EU` value is eu-west-1.
fn location_region(constraint: Option<&BucketLocationConstraint>) -> String {
    match constraint.map(|c| c.as_str()) {
        None | Some("") => FALLBACK_REGION.to_string(),
        Some("EU") => "eu-west-1".to_string(),
        Some(region) => region.to_string(),
    }
}

fn website_document(out: &GetBucketWebsiteOutput) -> Value {
    json!({
        "IndexDocument": out.index_document().is_some(),
        "RedirectAllRequestsTo": out.redirect_all_requests_to().is_some(),
    })
}

fn encryption_document(out: &GetBucketEncryptionOutput) -> Value {
    let rules: Vec<Value> = out
        .server_side_encryption_configuration()
        .map(|c| c.rules())
        .unwrap_or_default()
        .iter()
        .filter_map(|r| r.apply_server_side_encryption_by_default())
        .map(|d| json!({"SSEAlgorithm": d.sse_algorithm().as_str(), "KMSMasterKeyID": d.kms_master_key_id()}))
        .collect();
    json!({ "Rules": rules })
}

fn logging_document(out: &GetBucketLoggingOutput) -> Value {
    match out.logging_enabled() {
        Some(l) => json!({"LoggingEnabled": {"TargetBucket": l.target_bucket(), "TargetPrefix": l.target_prefix()}}),
        None => json!({}),
    }
}

/// Keys are only present when S3 reported them; a never-versioned bucket
/// yields an empty document.
fn versioning_document(out: &GetBucketVersioningOutput) -> Value {
    let mut doc = Map::new();
    if let Some(status) = out.status() {
        doc.insert("Status".into(), status.as_str().into());
    }
    if let Some(mfa) = out.mfa_delete() {
        doc.insert("MFADelete".into(), mfa.as_str().into());
    }
    Value::Object(doc)
}

fn acl_document(out: &GetBucketAclOutput) -> Value {
    let grants: Vec<Value> = out
        .grants()
        .iter()
        .map(|g| {
            json!({
                "Grantee": g.grantee().map(|e| json!({"Type": e.r#type().as_str(), "URI": e.uri()})),
                "Permission": g.permission().map(|p| p.as_str()),
            })
        })
        .collect();
    json!({ "Grants": grants })
}

fn public_access_block_document(out: &GetPublicAccessBlockOutput) -> Value {
    match out.public_access_block_configuration() {
        Some(c) => json!({
            "BlockPublicAcls": c.block_public_acls(),
            "IgnorePublicAcls": c.ignore_public_acls(),
            "BlockPublicPolicy": c.block_public_policy(),
            "RestrictPublicBuckets": c.restrict_public_buckets(),
        }),
        None => json!({}),
    }
}

impl StorageProvider for S3Provider {
    fn resource_noun(&self) -> &'static str { "Bucket" }

    fn checks(&self) -> &'static [CheckSpec] { S3_CHECKS }

    fn validate_credentials(&self) -> Result<(), ProviderError> {
        let ident = self.block(self.sts.get_caller_identity().send())?;
        debug!(account = ident.account().unwrap_or_default(), "caller identity resolved");
        Ok(())
    }

    fn list_resources(&self) -> Result<Vec<String>, ProviderError> {
        let out = self.block(self.s3.list_buckets().send())?;
        Ok(out.buckets().iter().filter_map(|b| b.name().map(str::to_string)).collect())
    }

    fn get_config(&self, bucket: &str, kind: ConfigKind) -> Result<Value, ProviderError> {
        debug!(bucket, ?kind, "fetching bucket configuration");
        let s3 = || self.client_for(bucket);
        let doc = match kind {
            ConfigKind::Website => website_document(&self.block(s3().get_bucket_website().bucket(bucket).send())?),
            ConfigKind::Encryption => encryption_document(&self.block(s3().get_bucket_encryption().bucket(bucket).send())?),
            ConfigKind::Logging => logging_document(&self.block(s3().get_bucket_logging().bucket(bucket).send())?),
            ConfigKind::Versioning => versioning_document(&self.block(s3().get_bucket_versioning().bucket(bucket).send())?),
            ConfigKind::Acl => acl_document(&self.block(s3().get_bucket_acl().bucket(bucket).send())?),
            ConfigKind::PublicAccessBlock => {
                public_access_block_document(&self.block(s3().get_public_access_block().bucket(bucket).send())?)
            }
            other => return Err(ProviderError::Other(format!("{:?} is not an S3 configuration", other))),
        };
        Ok(doc)
    }

    fn test_permissions(&self, _bucket: &str, _permissions: &[&str], _anonymous: bool) -> Result<Vec<String>, ProviderError> {
        Err(ProviderError::Other("permission probes are not supported for S3".into()))
    }
}
