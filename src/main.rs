use anyhow::Context;
use physicsbot::agent::QueryService;
use physicsbot::api::{self, AppState};
use physicsbot::ingestion::IngestionService;
use physicsbot::metrics::ServiceMetrics;
use physicsbot::pinecone::PineconeService;
use physicsbot::{config, embedding, logging};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::init_config().context("Failed to load configuration")?;
    logging::init_tracing();

    let embedding_client =
        embedding::get_embedding_client().context("Failed to build embedding client")?;
    let index = Arc::new(PineconeService::new(config).context("Failed to build Pinecone client")?);
    let ingestion = IngestionService::from_config(config, embedding_client.clone(), index.clone())
        .context("Failed to load ingestion models")?;
    let query = QueryService::from_config(config, embedding_client, index)
        .context("Failed to load query graph")?;

    let app = api::create_router(AppState {
        ingestion: Arc::new(ingestion),
        query: Arc::new(query),
        metrics: Arc::new(ServiceMetrics::new()),
    });

    let (listener, port) = bind_listener(config.server_port)
        .await
        .context("Failed to bind listener")?;
    tracing::info!("Listening on http://0.0.0.0:{}", port);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

const FALLBACK_PORTS: std::ops::RangeInclusive<u16> = 8000..=8099;

/// Bind `SERVER_PORT` when configured, otherwise the first free port in [`FALLBACK_PORTS`].
async fn bind_listener(configured: Option<u16>) -> std::io::Result<(TcpListener, u16)> {
    let any = std::net::Ipv4Addr::UNSPECIFIED;
    if let Some(port) = configured {
        let listener = TcpListener::bind((any, port)).await?;
        return Ok((listener, port));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((any, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "port taken");
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        format!(
            "no free port between {} and {}",
            FALLBACK_PORTS.start(),
            FALLBACK_PORTS.end()
        ),
    ))
}
