use anyhow::Result;
use chrono::Local;
use std::path::PathBuf;
use tracing::{error, info};

use newsdigest::config::AppConfig;
use newsdigest::environment::get_env_var_or;
use newsdigest::logging::configure_logging;
use newsdigest::pipeline;
use newsdigest::rss::HttpFeedReader;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    configure_logging(&PathBuf::from(get_env_var_or("LOG_DIR", "logs")));

    let started = Local::now();
    info!("Starting news digest run at {}", started.format("%Y-%m-%d %H:%M"));

    let config = AppConfig::from_env().inspect_err(|e| error!("Invalid configuration: {:#}", e))?;
    // a missing model credential stops the run before any feed is touched
    let llm_params = config
        .llm
        .build_params()
        .inspect_err(|e| error!("Cannot start summarization client: {:#}", e))?;
    let reader = HttpFeedReader::new(config.feed_timeout)?;

    let summary = pipeline::run(&config, &reader, &llm_params, started).await?;

    match &summary.digest_path {
        Some(path) => info!(
            "Run complete: {} articles, digest at {}, {} old digests removed",
            summary.articles,
            path.display(),
            summary.archived
        ),
        None => info!("Run complete: no new articles, {} old digests removed", summary.archived),
    }

    Ok(())
}
