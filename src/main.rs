mod checks;
mod config;
mod engine;
mod error;
mod model;
mod providers;
mod report;

use crate::config::{CredentialArgs, Platform};
use crate::engine::{summarize, Auditor};
use crate::error::ConfigError;
use crate::model::{StorageProvider, Target};
use crate::providers::{aws::S3Provider, azure::BlobProvider, gcp::GcsProvider};
use crate::report::{paint, Outcome};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "storage-audit", version, about = "A cross cloud platform storage security auditor")]
struct Cli {
    /// The platform to audit
    #[arg(value_enum, ignore_case = true)]
    platform: PlatformArg,

    /// Bucket/container to audit (omit to audit all)
    #[arg(short, long = "bucket-name", value_name = "BUCKET", default_value = "")]
    bucket_name: String,

    /// Storage account holding the containers (Azure only)
    #[arg(short, long = "storage-acct-name", value_name = "ACCOUNT")]
    storage_acct_name: Option<String>,

    /// AWS access key id and secret access key
    #[arg(long, num_args = 2, value_names = ["ACCESS_KEY_ID", "SECRET_ACCESS_KEY"])]
    aws_creds: Option<Vec<String>>,

    /// Path to a GCP service-account JSON key file
    #[arg(long, value_name = "JSON_PATH")]
    gcp_creds: Option<PathBuf>,

    /// Azure service principal and an active subscription id
    #[arg(long, num_args = 4, value_names = ["TENANT_ID", "CLIENT_ID", "CLIENT_SECRET", "SUBSCRIPTION_ID"])]
    az_creds: Option<Vec<String>>,

    /// Credential file written by --gen-config
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// AWS region (defaults to the SDK region chain, then us-east-1)
    #[arg(long)]
    region: Option<String>,

    /// Timeout for each provider call
    #[arg(long, value_parser = humantime::parse_duration, default_value = "30s")]
    timeout: Duration,

    /// Write a credential template for the platform and exit
    #[arg(long, default_value_t = false)]
    gen_config: bool,

    /// Debug logging on stderr
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum PlatformArg {
    Aws,
    Gcp,
    Az,
}

impl From<PlatformArg> for Platform {
    fn from(value: PlatformArg) -> Self {
        match value {
            PlatformArg::Aws => Platform::Aws,
            PlatformArg::Gcp => Platform::Gcp,
            PlatformArg::Az => Platform::Azure,
        }
    }
}

impl Cli {
    fn credential_args(&self) -> CredentialArgs {
        CredentialArgs {
            aws: self.aws_creds.clone(),
            gcp: self.gcp_creds.clone(),
            az: self.az_creds.clone(),
            config: self.config.clone(),
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{}", paint(Outcome::Failure, &format!("{:#}", err)));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let platform: Platform = cli.platform.into();
    let creds = cli.credential_args();

    if cli.gen_config {
        return gen_config(platform, &creds);
    }

    let target = Target::new(cli.storage_acct_name.clone(), cli.bucket_name.clone());
    match platform {
        Platform::Aws => {
            let keys = creds.aws()?;
            let provider = S3Provider::connect(keys.as_ref(), cli.region.as_deref(), cli.timeout)?;
            audit(provider, target)
        }
        Platform::Gcp => {
            let account = creds.gcp()?;
            audit(GcsProvider::connect(account, cli.timeout)?, target)
        }
        Platform::Azure => {
            let account = target
                .scope
                .clone()
                .ok_or_else(|| ConfigError::MissingArgument("--storage-acct-name is required for az".into()))?;
            let sp = creds.azure()?;
            audit(BlobProvider::connect(sp, &account, cli.timeout)?, target)
        }
    }
}

fn audit<P: StorageProvider>(provider: P, target: Target) -> anyhow::Result<()> {
    let mut auditor = Auditor::new(provider, target);
    let results = auditor.run()?;
    let (pass, fail, unknown) = summarize(&results);
    info!(pass, fail, unknown, "audit finished");
    if !results.is_empty() {
        println!("Summary: PASS={}, FAIL={}, UNKNOWN={}", pass, fail, unknown);
    }
    Ok(())
}

fn gen_config(platform: Platform, creds: &CredentialArgs) -> anyhow::Result<()> {
    println!("{}", paint(Outcome::Info, "Generating Config..."));
    let has_inline = match platform {
        Platform::Aws => creds.aws.is_some(),
        Platform::Gcp => creds.gcp.is_some(),
        Platform::Azure => creds.az.is_some(),
    };
    if !has_inline {
        let notice = format!("Enter the Following Information for {} Platform", platform.key().to_uppercase());
        println!("{}", paint(Outcome::Info, &notice));
    }
    let template = config::build_template(platform, creds, config::ask)?;
    let dir = std::env::current_dir().context("unable to resolve the current directory")?;
    let path = config::write_template(platform, &template, &dir)?;
    println!("{}", paint(Outcome::Success, &format!("File Written at Path: {}", path.display())));
    println!("{}", paint(Outcome::Info, "Use this file next time to authenticate"));
    Ok(())
}
