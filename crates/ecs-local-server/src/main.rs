use color_eyre::eyre::WrapErr;
use ecs_local_common::Settings;
use ecs_local_credentials::{CredentialsService, HttpCredentialProvider};
use ecs_local_metadata::{DockerRuntime, MetadataService};
use ecs_local_server::{create_app, AppState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting local container endpoints");
    let settings = Settings::from_env();

    let runtime = DockerRuntime::connect_with_local_defaults()
        .wrap_err("Failed to create Metadata Service")?;
    let metadata = MetadataService::new(Arc::new(runtime), settings.clone());
    metadata
        .check_runtime()
        .await
        .wrap_err("Failed to create Metadata Service")?;

    let provider = HttpCredentialProvider::new(settings.clone())
        .wrap_err("Failed to create Credentials Service")?;
    let credentials = CredentialsService::new(Arc::new(provider), settings.clone());

    let app = create_app(AppState::new(metadata, credentials));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port()?));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
