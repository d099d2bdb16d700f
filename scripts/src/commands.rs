//! Implementations of the deploy scripts

use tracing::info;

use crate::{
    artifacts::ArtifactStore,
    cli::{ChangeOwnerArgs, DeployArgs},
    client::DeployClient,
    config::{GeneratorAddresses, NetworkConfig},
    errors::ScriptError,
    orchestrator::Orchestrator,
    plan::{change_owner_plan, full_deployment_plan},
    verify::EtherscanVerifier,
};

/// Run the full deployment, then verify the deployed sources unless skipped
pub async fn deploy(
    args: DeployArgs,
    client: impl DeployClient,
    artifacts: ArtifactStore,
    config: NetworkConfig,
) -> Result<(), ScriptError> {
    let plan = full_deployment_plan(&config, !args.skip_verify)?;
    let verifier = match (args.etherscan_url, args.etherscan_api_key) {
        (Some(url), Some(key)) => Some(EtherscanVerifier::new(url, key)),
        _ => None,
    };

    let mut orchestrator = Orchestrator::init(client, verifier, artifacts, &config).await?;
    let report = orchestrator.execute(&plan).await?;
    info!("Deployment complete\n{report}");

    Ok(())
}

/// Attach to the generators and hand each one to the new owner
pub async fn change_owner(
    args: ChangeOwnerArgs,
    client: impl DeployClient,
    artifacts: ArtifactStore,
    config: NetworkConfig,
) -> Result<(), ScriptError> {
    let generators = resolve_generators(&args, &config)?;
    let plan = change_owner_plan(&generators, config.new_owner)?;

    let mut orchestrator =
        Orchestrator::<_, EtherscanVerifier>::init(client, None, artifacts, &config).await?;
    let report = orchestrator.execute(&plan).await?;
    info!("Ownership transferred to {:#x}\n{report}", config.new_owner);

    Ok(())
}

/// Take each generator address from the CLI, falling back to the address
/// known for the network
fn resolve_generators(
    args: &ChangeOwnerArgs,
    config: &NetworkConfig,
) -> Result<GeneratorAddresses, ScriptError> {
    let known = config.generators;
    let missing = |flag: &str| {
        ScriptError::Config(format!(
            "no known generator address on {}, pass --{flag}",
            config.network
        ))
    };

    Ok(GeneratorAddresses {
        distributor_generator: args
            .distributor_generator
            .or(known.map(|g| g.distributor_generator))
            .ok_or_else(|| missing("distributor-generator"))?,
        tax_receiver_generator: args
            .tax_receiver_generator
            .or(known.map(|g| g.tax_receiver_generator))
            .ok_or_else(|| missing("tax-receiver-generator"))?,
        token_generator: args
            .token_generator
            .or(known.map(|g| g.token_generator))
            .ok_or_else(|| missing("token-generator"))?,
    })
}
