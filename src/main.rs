use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use voxlink::application::{
    CallDependencies, CallOrchestrator, CallOrchestratorHandle, OrchestratorConfig,
};
use voxlink::config::{Config, CONFIG_PATH_ENV};
use voxlink::domain::backend::CallSetupBackend;
use voxlink::domain::call::{CallState, CapabilityProfile};
use voxlink::domain::telephony::{ProviderConfiguration, TelephonyProvider};
use voxlink::infrastructure::audio::{AudioPathController, LoopbackAudioSession};
use voxlink::infrastructure::backend::{
    FixedCallSetupBackend, HttpCallSetupBackend, InMemorySettings,
};
use voxlink::infrastructure::media::{LoopbackRoomConnector, MediaTransportClient};
use voxlink::infrastructure::telephony::{
    LoopbackTelephonyProvider, ReservationBehavior, TelephonyAdapter,
};
use voxlink::interface::api::{build_router, init_metrics};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok());
    let config = Config::load(config_path.as_deref())?;
    config.validate()?;

    // Initialize tracing; RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Voxlink");
    info!("Configuration loaded: {:?}", config);

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics()?;

    let deps = build_dependencies(&config)?;
    let orchestrator_config = OrchestratorConfig {
        connect_timeout: config.connect_timeout(),
        purpose: config.call.purpose,
    };
    let (handle, orchestrator_task) = CallOrchestrator::spawn(orchestrator_config, deps);

    let app = build_router(handle.clone(), prometheus_handle);
    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    info!("REST API server started on {}", config.bind_address());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(handle.clone()))
        .await?;

    drop(handle);
    if let Err(e) = orchestrator_task.await {
        warn!("Call orchestrator task ended abnormally: {}", e);
    }

    info!("Voxlink stopped");
    Ok(())
}

/// Wire the leaf collaborators from configuration
fn build_dependencies(config: &Config) -> anyhow::Result<CallDependencies> {
    let profile = CapabilityProfile::detect(&config.device(), config.telephony.mode);
    let provider: Option<Arc<dyn TelephonyProvider>> = if profile.telephony_supported() {
        let configuration = ProviderConfiguration {
            display_name: config.telephony.display_name.clone(),
            ..ProviderConfiguration::default()
        };
        Some(Arc::new(LoopbackTelephonyProvider::new(
            configuration,
            ReservationBehavior::default(),
        )))
    } else {
        None
    };

    let backend: Arc<dyn CallSetupBackend> = match &config.backend.base_url {
        Some(base_url) => {
            info!("Using call-setup backend at {}", base_url);
            Arc::new(HttpCallSetupBackend::new(
                base_url.clone(),
                config.backend.auth_token.clone(),
                config.request_timeout(),
            )?)
        }
        None => {
            info!(
                "No call-setup backend configured, using fixed endpoint {}",
                config.backend.transport_url
            );
            Arc::new(FixedCallSetupBackend::new(
                config.backend.transport_url.clone(),
                config.backend.transport_token.clone(),
            ))
        }
    };

    Ok(CallDependencies {
        telephony: Arc::new(TelephonyAdapter::new(profile, provider)),
        audio: Arc::new(AudioPathController::new(
            Arc::new(LoopbackAudioSession::new()),
            config.audio.prefer_speaker,
        )),
        media: Arc::new(MediaTransportClient::new(Arc::new(
            LoopbackRoomConnector::new(),
        ))),
        backend,
        settings: Arc::new(InMemorySettings::new(config.call.logging_enabled)),
    })
}

/// Wait for Ctrl-C, then end any call in progress
async fn shutdown_signal(handle: CallOrchestratorHandle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");

    if !handle.state().is_busy() {
        return;
    }
    if let Err(e) = handle.end_call().await {
        warn!("Could not end the active call: {}", e);
        return;
    }
    if let Err(e) = handle.wait_for_state(CallState::Idle).await {
        warn!("Call did not finish tearing down: {}", e);
    }
}
