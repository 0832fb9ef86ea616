use super::{CheckSpec, Rule, Source};
use crate::model::ConfigKind;

pub const BLOB_CHECKS: &[CheckSpec] = &[
    CheckSpec {
        id: "public_access",
        message: "Checking Storage Account Public Access...",
        source: Source::Config(ConfigKind::Account),
        not_configured: &[],
        rules: &[Rule::Flag {
            pointer: "/properties/allowBlobPublicAccess",
            secure: false,
            pass: "Public Access disabled on Storage Account.",
            fail: "Public Access allowed on Storage Account.",
        }],
    },
    CheckSpec {
        id: "firewall",
        message: "Checking Storage Account Firewall...",
        source: Source::Config(ConfigKind::Account),
        not_configured: &[],
        rules: &[Rule::NonEmpty {
            pointer: "/properties/networkAcls/ipRules",
            pass: "Firewall IP Rules configured.",
            fail: "Firewall IP Rules not configured.",
        }],
    },
    CheckSpec {
        id: "default_action",
        message: "Checking Default Network Action...",
        source: Source::Config(ConfigKind::Account),
        not_configured: &[],
        rules: &[Rule::NotEquals {
            pointer: "/properties/networkAcls/defaultAction",
            rejected: "Allow",
            pass: "Default Network Action set to Deny.",
            fail: "Default Network Action set to Allow.",
        }],
    },
    CheckSpec {
        id: "customer_managed_key",
        message: "Checking Customer Managed Key...",
        source: Source::Config(ConfigKind::Account),
        not_configured: &[],
        rules: &[Rule::Presence {
            pointer: "/properties/encryption/keyVaultProperties",
            secure: true,
            present: "Customer Managed Key configured.",
            absent: "Customer Managed Key not configured.",
        }],
    },
    CheckSpec {
        id: "secure_transfer",
        message: "Checking Secure Transfer...",
        source: Source::Config(ConfigKind::Account),
        not_configured: &[],
        rules: &[Rule::Flag {
            pointer: "/properties/supportsHttpsTrafficOnly",
            secure: true,
            pass: "Secure Transfer required.",
            fail: "Secure Transfer not required.",
        }],
    },
    CheckSpec {
        id: "versioning",
        message: "Checking Blob Versioning and Soft Delete...",
        source: Source::Config(ConfigKind::BlobService),
        not_configured: &[],
        rules: &[
            Rule::Flag {
                pointer: "/properties/isVersioningEnabled",
                secure: true,
                pass: "Blob Versioning Enabled.",
                fail: "Blob Versioning not configured.",
            },
            Rule::Flag {
                pointer: "/properties/deleteRetentionPolicy/enabled",
                secure: true,
                pass: "Blob Soft Delete Enabled.",
                fail: "Blob Soft Delete not configured.",
            },
        ],
    },
    CheckSpec {
        id: "container_public_access",
        message: "Checking Container Public Access...",
        source: Source::Config(ConfigKind::Container),
        not_configured: &[],
        rules: &[Rule::Equals {
            pointer: "/properties/publicAccess",
            expected: "None",
            absent_passes: true,
            pass: "Container Public Access disabled.",
            fail: "Container Public Access enabled.",
        }],
    },
];
