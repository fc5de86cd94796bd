use std::{env, fs::File, path::Path};

use escrow_engine::dlq::StdErrDLQ;
use escrow_engine::engine::Engine;
use escrow_engine::ingestion::CsvReader;
use escrow_engine::store::InMemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so the stdout balances report stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args();
    let file_path = args.nth(1).expect("usage: escrow_engine <operations.csv>");
    let file_path = Path::new(&file_path);
    let file = File::open(file_path)?;

    let ingestion = CsvReader::new(file)?;
    let dlq = StdErrDLQ::new();
    let mut engine = Engine::new(InMemoryStore::new());

    engine.replay(ingestion, &dlq).await?;
    engine.write_balances(&mut std::io::stdout().lock())?;

    Ok(())
}
