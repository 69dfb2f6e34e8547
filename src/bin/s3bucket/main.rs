use std::fmt::Debug;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, trace};

use s3bucket_rs::config::Config;
use s3bucket_rs::config::args::Command;
use s3bucket_rs::{
    Bucket, CLIArgs, CopyFileParams, ListFilesParams, ListVersionsParams, UploadUrlParams,
    create_listing_cancellation_token, exit_code_from_error, is_cancelled_error,
};

mod ctrl_c_handler;
mod tracing_init;

/// s3bucket - Amazon S3 bucket convenience client.
///
/// This binary is a thin wrapper over the s3bucket-rs library.
#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = load_config_exit_if_err();

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    if let Err(e) = run(config, command).await {
        if is_cancelled_error(&e) {
            debug!("operation cancelled by user.");
            return Ok(());
        }
        error!("{:?}", e);
        std::process::exit(exit_code_from_error(&e));
    }

    Ok(())
}

fn load_config_exit_if_err() -> (Config, Command) {
    let args = CLIArgs::parse();
    let command = args.command.clone();
    match Config::try_from(args) {
        Ok(config) => (config, command),
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    let Some(tracing_config) = config.tracing_config.as_ref() else {
        return false;
    };

    tracing_init::init_tracing(tracing_config);
    true
}

async fn run(config: Config, command: Command) -> Result<()> {
    let cancellation_token = create_listing_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    debug!(command = ?command, "s3bucket start.");

    let bucket = Bucket::from_config(config)
        .await
        .with_cancellation_token(cancellation_token.clone());
    let result = execute(&bucket, command).await;

    // Lets the Ctrl+C handler task finish.
    cancellation_token.cancel();

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    debug!(duration_sec = duration_sec, "s3bucket has been completed.");

    result
}

async fn execute(bucket: &Bucket, command: Command) -> Result<()> {
    match command {
        Command::ListBuckets => print_records(&bucket.get_all_buckets().await?),
        Command::ListVersions { key, limit, delay } => {
            let listing = bucket
                .list_file_versions(ListVersionsParams {
                    key: Some(key),
                    limit,
                    delay,
                    marker: None,
                })
                .await?;
            print_records(&listing.versions);
            print_records(&listing.delete_markers);
        }
        Command::ListFiles {
            prefix,
            limit,
            delay,
        } => {
            let files = bucket
                .list_files(ListFilesParams {
                    prefix,
                    limit,
                    delay,
                    ..Default::default()
                })
                .await?;
            print_records(&files);
        }
        Command::DeleteAllVersions { key } => print_record(&bucket.delete_all_versions(&key).await?),
        Command::DeleteAllMarkers { key } => print_record(&bucket.delete_all_markers(&key).await?),
        Command::DeleteAllVersionsAndMarkers { key } => {
            print_record(&bucket.delete_all_versions_and_markers(&key).await?)
        }
        Command::DeleteFiles { keys } => print_record(&bucket.delete_files(keys).await?),
        Command::Upload { files } => print_records(&bucket.upload_multiple_files(&files).await?),
        Command::Copy { source, key } => print_record(
            &bucket
                .copy_file(CopyFileParams {
                    copy_source: Some(source),
                    key: Some(key),
                    acl: None,
                })
                .await?,
        ),
        Command::UploadUrl {
            key,
            content_type,
            expires,
        } => print_record(
            &bucket
                .get_upload_url(UploadUrlParams {
                    key: Some(key),
                    content_type: Some(content_type),
                    expires: Some(expires),
                    acl: None,
                })
                .await?,
        ),
    }

    Ok(())
}

fn print_record<T: Debug>(record: &T) {
    println!("{record:#?}");
}

fn print_records<T: Debug>(records: &[T]) {
    for record in records {
        println!("{record:?}");
    }
}
