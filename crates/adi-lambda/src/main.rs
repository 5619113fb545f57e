mod handler;

use std::sync::Arc;

use adi_bucket::S3BucketStore;
use adi_core::config::{ImportOptions, TriggerConfig};
use adi_core::importer::Importer;
use adi_core::logging;
use adi_core::secrets::SsmSecretStore;
use adi_repository::MongoConnector;
use aws_config::BehaviorVersion;
use handler::{function_handler, HandlerState};
use lambda_runtime::{run, service_fn, Error};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = TriggerConfig::from_env()?;
    logging::init(config.log_level, config.log_format)?;

    let shared_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let importer = Importer::new(
        Arc::new(S3BucketStore::from_client(aws_sdk_s3::Client::new(&shared_config))),
        Arc::new(SsmSecretStore::from_client(aws_sdk_ssm::Client::new(&shared_config))),
        Arc::new(MongoConnector),
        ImportOptions::default(),
    );
    let state = HandlerState::new(importer, config.request);

    run(service_fn(|event| function_handler(event, &state))).await
}
