use super::{CheckSpec, Rule, Source};
use crate::model::ConfigKind;

pub const S3_CHECKS: &[CheckSpec] = &[
    CheckSpec {
        id: "website",
        message: "Checking Static Website Hosting...",
        source: Source::Config(ConfigKind::Website),
        not_configured: &["NoSuchWebsiteConfiguration"],
        rules: &[Rule::Presence {
            pointer: "",
            secure: false,
            present: "Static Website Hosting configured.",
            absent: "Static Website Hosting not configured.",
        }],
    },
    CheckSpec {
        id: "encryption",
        message: "Checking Server Side Encryption...",
        source: Source::Config(ConfigKind::Encryption),
        not_configured: &["ServerSideEncryptionConfigurationNotFoundError"],
        rules: &[Rule::Presence {
            pointer: "",
            secure: true,
            present: "Server Side Encryption configured.",
            absent: "Server Side Encryption not configured.",
        }],
    },
    CheckSpec {
        id: "logging",
        message: "Checking Audit Logging...",
        source: Source::Config(ConfigKind::Logging),
        not_configured: &[],
        rules: &[Rule::Presence {
            pointer: "/LoggingEnabled",
            secure: true,
            present: "Audit Logging configured.",
            absent: "Audit Logging not configured.",
        }],
    },
    CheckSpec {
        id: "versioning",
        message: "Checking Object Versioning and MFA...",
        source: Source::Config(ConfigKind::Versioning),
        not_configured: &[],
        rules: &[
            Rule::Status { pointer: "/Status", expected: "Enabled", label: "Object Versioning" },
            Rule::Status { pointer: "/MFADelete", expected: "Enabled", label: "MFA Delete" },
        ],
    },
    CheckSpec {
        id: "acl",
        message: "Checking Bucket ACL...",
        source: Source::Config(ConfigKind::Acl),
        not_configured: &[],
        rules: &[Rule::PublicGrants],
    },
    CheckSpec {
        id: "public_access_block",
        message: "Checking Public Access Block...",
        source: Source::Config(ConfigKind::PublicAccessBlock),
        not_configured: &["NoSuchPublicAccessBlockConfiguration"],
        rules: &[
            Rule::Flag { pointer: "/BlockPublicAcls", secure: true, pass: "Public ACLs blocked.", fail: "Public ACLs not blocked." },
            Rule::Flag { pointer: "/IgnorePublicAcls", secure: true, pass: "Public ACLs ignored.", fail: "Public ACLs not ignored." },
            Rule::Flag { pointer: "/BlockPublicPolicy", secure: true, pass: "Public Bucket Policies blocked.", fail: "Public Bucket Policies not blocked." },
            Rule::Flag { pointer: "/RestrictPublicBuckets", secure: true, pass: "Public Bucket access restricted.", fail: "Public Bucket access not restricted." },
        ],
    },
];
