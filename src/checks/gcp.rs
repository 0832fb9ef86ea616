use super::{CheckSpec, Rule, Source};
use crate::model::ConfigKind;

/// Permissions probed with `testIamPermissions`.
pub const PROBED_PERMISSIONS: &[&str] = &[
    "storage.buckets.get",
    "storage.buckets.getIamPolicy",
    "storage.buckets.setIamPolicy",
    "storage.buckets.update",
    "storage.buckets.delete",
    "storage.objects.list",
    "storage.objects.get",
    "storage.objects.create",
    "storage.objects.delete",
];

pub const GCS_CHECKS: &[CheckSpec] = &[
    CheckSpec {
        id: "versioning",
        message: "Checking Object Versioning...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Flag {
            pointer: "/versioning/enabled",
            secure: true,
            pass: "Object Versioning Enabled.",
            fail: "Object Versioning not configured.",
        }],
    },
    CheckSpec {
        id: "logging",
        message: "Checking Audit Logging...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Presence {
            pointer: "/logging/logBucket",
            secure: true,
            present: "Audit Logging configured.",
            absent: "Audit Logging not configured.",
        }],
    },
    CheckSpec {
        id: "encryption",
        message: "Checking Customer Managed Encryption Key...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Presence {
            pointer: "/encryption/defaultKmsKeyName",
            secure: true,
            present: "Customer Managed Encryption Key configured.",
            absent: "Customer Managed Encryption Key not configured.",
        }],
    },
    CheckSpec {
        id: "uniform_access",
        message: "Checking Uniform Bucket Level Access...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Flag {
            pointer: "/iamConfiguration/uniformBucketLevelAccess/enabled",
            secure: true,
            pass: "Uniform Bucket Level Access Enabled.",
            fail: "Uniform Bucket Level Access not configured.",
        }],
    },
    CheckSpec {
        id: "public_access_prevention",
        message: "Checking Public Access Prevention...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Equals {
            pointer: "/iamConfiguration/publicAccessPrevention",
            expected: "enforced",
            absent_passes: false,
            pass: "Public Access Prevention enforced.",
            fail: "Public Access Prevention not enforced.",
        }],
    },
    CheckSpec {
        id: "website",
        message: "Checking Static Website Hosting...",
        source: Source::Config(ConfigKind::Bucket),
        not_configured: &[],
        rules: &[Rule::Presence {
            pointer: "/website",
            secure: false,
            present: "Static Website Hosting configured.",
            absent: "Static Website Hosting not configured.",
        }],
    },
    CheckSpec {
        id: "unauthenticated_permissions",
        message: "Checking Unauthenticated Permissions...",
        source: Source::Permissions { permissions: PROBED_PERMISSIONS, anonymous: true },
        not_configured: &[],
        rules: &[Rule::Held { subject: "Unauthenticated users" }],
    },
    CheckSpec {
        id: "authenticated_permissions",
        message: "Checking Authenticated Permissions...",
        source: Source::Permissions { permissions: PROBED_PERMISSIONS, anonymous: false },
        not_configured: &[],
        rules: &[Rule::Held { subject: "These credentials" }],
    },
];
