use anyhow::Context;
use edgerank_service::{Config, FeedContext, Session, SnapshotStore};
use event_store::{CsvEventSource, EventSource};
use tokio::io::BufReader;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing; logs go to stderr so the menu owns stdout
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env().context("Failed to load config")?;
    let as_of = config.reference_time()?;
    let snapshots = SnapshotStore::new(&config.snapshot_dir);

    info!(
        data_dir = %config.data_dir.display(),
        partitions = %config.dataset_partitions,
        as_of = %as_of,
        "Starting edgerank-service"
    );

    let context = if config.load_snapshot {
        let snapshot = snapshots
            .load()
            .await
            .with_context(|| format!("Failed to load snapshot from {}", snapshots.dir().display()))?;
        FeedContext::from_snapshot(snapshot, as_of)
    } else {
        let source = CsvEventSource::new(&config.data_dir, config.partitions());
        let store = source.load().await.context("Failed to load dataset")?;

        // Graph building is CPU-bound; keep it off the async workers
        let context = tokio::task::spawn_blocking(move || FeedContext::build(store, as_of))
            .await
            .context("Feed build task failed")?;

        if config.write_snapshot {
            if let Err(err) = context.write_snapshot(&snapshots).await {
                warn!(error = %err, "Failed to write snapshot");
            }
        }
        context
    };

    let stats = context.stats();
    info!(
        users = stats.users,
        posts = stats.posts,
        interactions = stats.interactions,
        graph_nodes = stats.graph_nodes,
        base_edges = stats.base_edges,
        propagated_edges = stats.propagated_edges,
        indexed_words = stats.indexed_words,
        "Feed ready"
    );

    let stdin = BufReader::new(tokio::io::stdin());
    let mut session = Session::new(&context, stdin, tokio::io::stdout(), config.result_limit);
    session.run().await.context("Session I/O failed")?;

    Ok(())
}
