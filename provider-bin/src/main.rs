use color_eyre::eyre::{self, WrapErr};
use daytona_client::{PlatformClient, ProviderConfig, ProviderSettings};
use daytona_common::{Diagnostic, OpContext};
use daytona_snapshot::{DockerEngine, PollSettings, SnapshotResource};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

mod envelope;

use envelope::{dispatch, Request, Response};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    // stdout carries the response envelope
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .wrap_err("Failed to read request from stdin")?;
    let request: Request = serde_json::from_str(&input).wrap_err("Malformed request envelope")?;
    info!(operation = ?request.operation, "Starting {}", SnapshotResource::type_name());

    let response = match build_resource(&request) {
        Ok((resource, config)) => {
            let (ctx, cancel) = OpContext::with_cancel();
            let ctx = ctx.with_timeout(config.operation_timeout);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling operation");
                    cancel.cancel();
                }
            });
            dispatch(&resource, &ctx, request).await
        }
        Err(diagnostic) => Response::failed(diagnostic),
    };

    println!("{}", serde_json::to_string(&response)?);
    if response.has_error() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_resource(request: &Request) -> Result<(SnapshotResource, ProviderConfig), Diagnostic> {
    let config = ProviderConfig::from_env(ProviderSettings {
        token: request.token.clone(),
        organization_id: request.organization_id.clone(),
    })
    .map_err(|e| Diagnostic::error(e.summary(), e.to_string()))?;
    let client = PlatformClient::new(&config).map_err(|e| Diagnostic::error(e.summary(), e.to_string()))?;

    let resource = match DockerEngine::connect() {
        Ok(engine) => SnapshotResource::new(Arc::new(client), Arc::new(engine)),
        Err(e) => {
            warn!(error = %e, "Docker is not reachable; create will fail");
            SnapshotResource::without_engine(Arc::new(client), e.to_string())
        }
    };

    Ok((
        resource.with_poll_settings(PollSettings::with_interval(config.poll_interval)),
        config,
    ))
}
