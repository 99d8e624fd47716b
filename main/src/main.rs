use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    error::AppError,
    storage::store::{create_job_store, run_expiry_sweeper, DynJobStore},
    utils::config::{get_config, AppConfig, DispatchKind},
};
use search_pipeline::{
    dispatch::DynDispatcher, job_queue, run_worker_loop, HttpDispatcher, JobDispatcher, JobQueue,
    JobSettings, OpenAiResourceSearcher, ResourceSearcher, SearchWorker,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let store = create_job_store(&config).await?;
    let searcher: Arc<dyn ResourceSearcher> =
        Arc::new(OpenAiResourceSearcher::from_config(&config));

    let Services { app, queue, worker } = build_services(&config, store.clone(), searcher)?;

    let worker_handle = tokio::spawn(run_worker_loop(
        queue,
        worker,
        config.worker_concurrency,
    ));
    let sweeper_handle = tokio::spawn(run_expiry_sweeper(
        store,
        config.expiry_sweep_interval(),
    ));

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    // The router owned the queue senders, so the worker loop drains and exits.
    sweeper_handle.abort();
    if let Err(e) = worker_handle.await {
        error!("Worker loop panicked: {:?}", e);
    }

    Ok(())
}

struct Services {
    app: Router,
    queue: JobQueue,
    worker: Arc<SearchWorker>,
}

fn build_services(
    config: &AppConfig,
    store: DynJobStore,
    searcher: Arc<dyn ResourceSearcher>,
) -> Result<Services, AppError> {
    let (local_queue, queue) = job_queue(config.queue_capacity);

    let dispatcher: DynDispatcher = match config.dispatch {
        DispatchKind::Channel => Arc::new(local_queue.clone()),
        DispatchKind::Http => Arc::new(HttpDispatcher::from_config(config)?),
    };
    info!(dispatcher = dispatcher.name(), "Job dispatcher initialized");

    let worker = Arc::new(SearchWorker::new(
        store.clone(),
        searcher,
        JobSettings::from_config(config),
    ));

    let api_state = ApiState::new(config, store, dispatcher, local_queue);

    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .layer(TraceLayer::new_for_http())
        .with_state(api_state);

    Ok(Services { app, queue, worker })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
