use std::sync::Arc;

use migration::{Migrator, MigratorTrait};
use settings::Database;
use tokio::io::AsyncBufReadExt;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "soquy={level},ledger={level},migration={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.database).await?;

    let mut builder = ledger::Ledger::builder()
        .database(db)
        .local_balance(&settings.balance_file)
        .allowed_senders(settings.ingestion.allowed_senders.clone());
    if let Some(remote) = &settings.remote {
        tracing::info!("Found remote balance settings...");
        builder = builder.documents(Arc::new(ledger::HttpDocuments::new(&remote.base_url)?));
    }
    let ledger = builder.build().await?;

    let refresh: ledger::ChangeListener = Arc::new(|| {
        tracing::debug!("ledger changed, consumers should refresh derived sums");
    });
    ledger.subscribe(refresh);

    let owner = ledger::Owner::Anonymous;
    tracing::info!("Reading messages from stdin, one `sender<TAB>text` per line...");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some((sender, body)) = line.split_once('\t') else {
            tracing::warn!("skipping line without a sender field");
            continue;
        };
        match ledger.ingest_message(&owner, sender, body).await {
            Ok(Some(id)) => tracing::info!(id, "recorded transaction from message"),
            Ok(None) => tracing::debug!("message ignored"),
            Err(err) => tracing::error!("failed to record message: {err}"),
        }
    }

    ledger.contexts().main.flush().await;
    Ok(())
}

async fn parse_database(
    config: &Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
