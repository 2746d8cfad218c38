//! Wiring for `chatrelay run`: sink, pipeline, worker, sources and gateway.

use std::{sync::Arc, time::Duration};

use {
    anyhow::bail,
    chatrelay_channels::{AdapterRegistry, EventEmitter},
    chatrelay_config::{RelayConfig, Severity, SourcesConfig, validate},
    chatrelay_gateway::GatewayState,
    chatrelay_ntfy::NtfySink,
    chatrelay_pipeline::{DeliveryWorker, Pipeline},
    chatrelay_streamlabs::{ChatboxPoller, SocketListener},
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

/// How long stopped tasks get to wind down before the process exits anyway.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let validation = validate(&config);
    for d in &validation.diagnostics {
        match d.severity {
            Severity::Error => error!(path = d.path, "{}", d.message),
            Severity::Warning => warn!(path = d.path, "{}", d.message),
        }
    }
    if validation.has_errors() {
        bail!("invalid configuration; run `chatrelay config check` for details");
    }

    #[cfg(feature = "metrics")]
    let metrics_handle =
        chatrelay_metrics::init_metrics(chatrelay_metrics::MetricsRecorderConfig {
            enabled: config.metrics.enabled,
            global_labels: vec![("service".into(), "chatrelay".into())],
        })?;

    let sink = NtfySink::new(&config.sink)?;
    info!(endpoint = sink.endpoint(), "ntfy sink ready");

    let pipeline = Arc::new(Pipeline::new(&config.relay));
    let worker = DeliveryWorker::new(pipeline.queue(), Arc::new(sink), &config.relay);
    let stats = worker.stats();

    let cancel = CancellationToken::new();
    let mut tasks = vec![
        tokio::spawn(worker.run(cancel.clone())),
        pipeline.spawn_sweeper(cancel.clone()),
    ];

    let registry = build_registry(&config.sources)?;
    if !registry.is_empty() {
        info!(sources = ?registry.list(), "starting source adapters");
        let emitter: Arc<dyn EventEmitter> = pipeline.clone();
        tasks.extend(registry.spawn_all(emitter, &cancel));
    }

    if config.server.enabled {
        let state = GatewayState::new(Arc::clone(&pipeline), stats)
            .with_ingest(config.server.ingest);
        #[cfg(feature = "metrics")]
        let state = state.with_metrics_handle(metrics_handle);

        let server_config = config.server.clone();
        let cancel = cancel.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) =
                chatrelay_gateway::start_gateway(&server_config, Arc::new(state), cancel.clone())
                    .await
            {
                error!(error = %e, "gateway failed; shutting down");
                cancel.cancel();
            }
        }));
    }

    tokio::select! {
        () = shutdown_signal() => info!("shutdown signal received"),
        () = cancel.cancelled() => {},
    }
    cancel.cancel();

    let joined = tokio::time::timeout(SHUTDOWN_GRACE, async {
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "task ended abnormally");
            }
        }
    })
    .await;
    if joined.is_err() {
        warn!(
            grace_secs = SHUTDOWN_GRACE.as_secs(),
            "tasks still running after shutdown grace period, exiting anyway"
        );
    }
    info!("chatrelay stopped");
    Ok(())
}

fn build_registry(sources: &SourcesConfig) -> anyhow::Result<AdapterRegistry> {
    let mut registry = AdapterRegistry::new();
    if sources.chatbox.enabled {
        registry.register(Arc::new(ChatboxPoller::new(&sources.chatbox)?));
    }
    if sources.socket.enabled {
        registry.register(Arc::new(SocketListener::new(&sources.socket)?));
    }
    Ok(registry)
}

/// Ctrl-C, or SIGTERM from a container runtime.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
