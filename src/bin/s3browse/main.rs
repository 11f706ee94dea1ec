use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing::{debug, error, trace};

use s3browse_rs::config::{Config, Operation};
use s3browse_rs::{
    CLIArgs, ListQuery, SearchQuery, StorageClient, create_request_cancellation_token,
    exit_code_from_error, is_cancelled_error,
};

mod ctrl_c_handler;
mod render;
mod tracing_init;

/// s3browse - Browse, search and share objects in an S3 bucket.
///
/// This binary is a thin wrapper over the s3browse-rs library.
/// All core functionality is implemented in the library crate.
#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config_exit_if_err();

    if let Some(shell) = config.auto_complete_shell {
        generate(
            shell,
            &mut CLIArgs::command(),
            "s3browse",
            &mut std::io::stdout(),
        );

        return Ok(());
    }

    start_tracing_if_necessary(&config);

    trace!("config = {:?}", config);

    if let Err(e) = run(config).await {
        if is_cancelled_error(&e) {
            debug!("request cancelled by user.");
            return Ok(());
        }
        error!("{e:#}");
        std::process::exit(exit_code_from_error(&e));
    }

    Ok(())
}

fn load_config_exit_if_err() -> Config {
    match Config::try_from(CLIArgs::parse()) {
        Ok(config) => config,
        Err(error_message) => {
            clap::Error::raw(clap::error::ErrorKind::ValueValidation, error_message).exit()
        }
    }
}

fn start_tracing_if_necessary(config: &Config) -> bool {
    match config.tracing_config.as_ref() {
        Some(tracing_config) => {
            tracing_init::init_tracing(tracing_config);
            true
        }
        None => false,
    }
}

/// The listing query the CLI flags describe for the target prefix.
fn build_list_query(config: &Config) -> ListQuery {
    ListQuery {
        prefix: config.prefix().to_string(),
        delimiter: config.delimiter.clone(),
        max_keys: config.max_keys,
        continuation_token: config.continuation_token.clone(),
    }
}

/// Search always walks the flat key space under the prefix.
fn build_search_query(config: &Config, query: &str) -> SearchQuery {
    SearchQuery::new(config.prefix(), query)
        .with_list_query(build_list_query(config).without_delimiter())
}

async fn run(config: Config) -> Result<()> {
    let cancellation_token = create_request_cancellation_token();
    ctrl_c_handler::spawn_ctrl_c_handler(cancellation_token.clone());

    let start_time = tokio::time::Instant::now();
    let client = StorageClient::new(config.clone()).with_cancellation_token(cancellation_token);

    match &config.operation {
        Operation::List => {
            let page = client.list(&build_list_query(&config)).await?;
            render::write_listing_page(&mut std::io::stdout().lock(), &page)?;
        }
        Operation::Search { query } => {
            let page = client
                .search_page(&build_search_query(&config, query))
                .await?;
            render::write_search_page(&mut std::io::stdout().lock(), &page)?;
        }
        Operation::Presign { key } => {
            let url = client.sign(key, config.presign_ttl_seconds).await?;
            render::write_signed_url(&mut std::io::stdout().lock(), &url)?;
        }
    }

    let duration_sec = format!("{:.3}", start_time.elapsed().as_secs_f32());
    debug!(duration_sec = duration_sec, "s3browse has been completed.");

    Ok(())
}
