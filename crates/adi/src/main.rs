use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use adi_bucket::{S3BucketStore, S3Config};
use adi_core::config::{
    CredentialRefs, DatabaseTarget, DatePolicy, ImportOptions, ImportRequest, SourceLocation,
    DEFAULT_DB_PORT,
};
use adi_core::error::ConfigError;
use adi_core::importer::{ImportReport, Importer};
use adi_core::logging::{self, LogFormat, LogLevel};
use adi_core::secrets::SsmSecretStore;
use adi_repository::MongoConnector;
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

/// Exit status for a failed import.
const EXIT_IMPORT_FAILED: u8 = 1;
/// Exit status for bad startup configuration, matching clap's usage errors.
const EXIT_CONFIG: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "adi",
    author,
    version,
    about = "Import assessment data from a JSON file in an S3 bucket into a Mongo database",
    long_about = None
)]
struct Cli {
    /// The AWS S3 bucket containing the assessment data file
    #[arg(long, value_name = "BUCKET")]
    s3_bucket: String,
    /// The name of the file containing the assessment data in the S3 bucket
    #[arg(long, value_name = "FILE")]
    data_filename: String,
    /// The hostname that has the database to store the assessment data in
    #[arg(long, value_name = "HOST")]
    db_hostname: String,
    /// The port that the database server is listening on
    #[arg(long, value_name = "PORT", default_value_t = DEFAULT_DB_PORT)]
    db_port: u16,
    /// The SSM parameter holding the name of the database
    #[arg(long, value_name = "DB")]
    ssm_db_name: String,
    /// The SSM parameter holding the database username
    #[arg(long, value_name = "USER")]
    ssm_db_user: String,
    /// The SSM parameter holding the database password
    #[arg(long, value_name = "PASSWORD")]
    ssm_db_password: String,
    /// One of debug, info, warning, error or critical
    #[arg(long, value_name = "LEVEL", default_value = "warning")]
    log_level: String,
    /// json or text
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    log_format: String,
    /// Custom S3 endpoint, e.g. a local MinIO
    #[arg(long, value_name = "URL")]
    s3_endpoint: Option<String>,
    #[arg(long, value_name = "REGION")]
    s3_region: Option<String>,
    #[arg(long)]
    s3_force_path_style: bool,
    /// Directory for the temporary local copy of the data file
    #[arg(long, value_name = "DIR")]
    staging_dir: Option<PathBuf>,
    /// Fail the whole import on a malformed date instead of skipping the record
    #[arg(long)]
    abort_on_bad_date: bool,
}

impl Cli {
    fn logging(&self) -> Result<(LogLevel, LogFormat), ConfigError> {
        Ok((self.log_level.parse()?, self.log_format.parse()?))
    }

    fn request(&self) -> ImportRequest {
        ImportRequest {
            source: SourceLocation {
                bucket: self.s3_bucket.clone(),
                key: self.data_filename.clone(),
            },
            database: DatabaseTarget {
                host: self.db_hostname.clone(),
                port: self.db_port,
                secrets: CredentialRefs {
                    db_name: self.ssm_db_name.clone(),
                    username: self.ssm_db_user.clone(),
                    password: self.ssm_db_password.clone(),
                },
            },
        }
    }

    fn options(&self) -> ImportOptions {
        ImportOptions {
            staging_dir: self.staging_dir.clone(),
            date_policy: if self.abort_on_bad_date {
                DatePolicy::AbortRun
            } else {
                DatePolicy::SkipRecord
            },
        }
    }

    fn s3_config(&self) -> S3Config {
        S3Config {
            region: self.s3_region.clone(),
            endpoint: self.s3_endpoint.clone(),
            force_path_style: self.s3_force_path_style,
            ..S3Config::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let (level, format) = match cli.logging() {
        Ok(settings) => settings,
        Err(err) => {
            // Report with default settings; nothing has been touched yet.
            if logging::init(LogLevel::default(), LogFormat::default()).is_err() {
                eprintln!("{err}");
            }
            error!("{err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if let Err(err) = logging::init(level, format) {
        eprintln!("{err}");
        return ExitCode::from(EXIT_CONFIG);
    }

    match run(&cli).await {
        Ok(report) => {
            info!(
                total = report.total,
                imported = report.imported,
                skipped = report.skipped.len(),
                "Assessment data import complete"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(EXIT_IMPORT_FAILED)
        }
    }
}

async fn run(cli: &Cli) -> Result<ImportReport> {
    let bucket = S3BucketStore::new(cli.s3_config())
        .await
        .context("failed to configure S3 client")?;
    let secrets = SsmSecretStore::from_env().await;

    let importer = Importer::new(
        Arc::new(bucket),
        Arc::new(secrets),
        Arc::new(MongoConnector),
        cli.options(),
    );

    let request = cli.request();
    importer.run(&request).await.with_context(|| {
        format!(
            "failed to import {} from S3 bucket {}",
            request.source.key, request.source.bucket
        )
    })
}
