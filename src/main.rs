//! Study assistant entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (`STUDY_CONFIG` or config/default.toml); missing
//!      credentials are fatal here
//!   3. Init logger (`RUST_LOG` > `STUDY_LOG_LEVEL` > config)
//!   4. Build the LLM and web-search providers
//!   5. Spawn Ctrl-C → shutdown watcher
//!   6. Start the comms channels and wait for them to exit

use tokio_util::sync::CancellationToken;
use tracing::info;

use study_assistant::{assistant::StudyAssistant, comms, config, error::AppError, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    let filter = logger::init(&config.log_level)?;

    info!(
        llm = %config.llm.provider,
        search = %config.search.provider,
        query_source = ?config.assistant.query_source,
        log_filter = %filter.directives,
        log_source = %filter.source,
        pty = config.comms_pty_should_load(),
        http = config.comms_http_should_load(),
        "config loaded"
    );

    let assistant = StudyAssistant::from_config(&config)?;

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    let result = comms::start(&config, assistant, shutdown).join().await;
    info!("shutdown complete");
    result
}
