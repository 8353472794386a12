use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tally_core::app::{checkout_worker, connect_queue};
use tally_core::checkin::{CheckinService, Punch};
use tally_core::impls::InMemorySessionRepository;
use tally_core::{Config, Queue};

type BoxError = Box<dyn Error + Send + Sync>;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Each employee id given on the command line is checked in and straight
/// back out, so the worker has something to process.
async fn punch_demo(queue: Arc<dyn Queue>, employees: &[String]) {
    let service = CheckinService::new(InMemorySessionRepository::new(), queue);
    for employee_id in employees {
        for _ in 0..2 {
            match service.process(employee_id).await {
                Ok(Punch::CheckedIn(session)) => {
                    info!(employee_id = %employee_id, session_id = session.id, "demo check-in")
                }
                Ok(Punch::CheckedOut(session)) => {
                    info!(employee_id = %employee_id, session_id = session.id, "demo check-out")
                }
                Err(e) => warn!(employee_id = %employee_id, error = %e, "demo punch failed"),
            }
        }
    }
    let status = service.queue_status().await;
    info!(pending_messages = status.pending_messages, timestamp = %status.timestamp, "queue status");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c"),
        _ = terminate => info!("received SIGTERM"),
    }
}

async fn run() -> Result<(), BoxError> {
    let config = Config::from_env()?;
    let queue = connect_queue(&config).await?;
    let worker = checkout_worker(&config, Arc::clone(&queue))?.spawn();
    info!(backend = config.backend.name(), "tally worker running");

    let employees: Vec<String> = std::env::args().skip(1).collect();
    if !employees.is_empty() {
        punch_demo(Arc::clone(&queue), &employees).await;
    }

    shutdown_signal().await;

    worker.shutdown().await;
    queue.close().await?;
    info!("shutdown complete");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "tally exited with error");
            ExitCode::FAILURE
        }
    }
}
