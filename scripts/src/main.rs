use clap::Parser;
use scripts::{artifacts::ArtifactStore, cli::Cli, client::setup_client, errors::ScriptError};

#[tokio::main]
async fn main() -> Result<(), ScriptError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().pretty().init();

    let config = cli.network_config();
    let client = setup_client(&cli.priv_key, &cli.rpc_url).await?;
    let artifacts = ArtifactStore::new(&cli.artifacts);

    cli.command.run(client, artifacts, config).await
}
