//! slotkeeperd - The slotkeeper background service
//!
//! Wires together:
//! - Configuration loading
//! - The slot engine
//! - The IPC server
//! - The operator calendar table on stdout

mod dispatch;

use anyhow::{Context, Result};
use clap::Parser;
use slotkeeper_api::{ClientInfo, ClientRole, ErrorCode, ErrorInfo, Event, EventPayload, Response};
use slotkeeper_config::{Settings, load_config_or_default};
use slotkeeper_core::{SlotEngine, render_calendar};
use slotkeeper_ipc::{IpcServer, ServerMessage};
use slotkeeper_util::{RateLimiter, default_config_path, socket_path_without_env};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::dispatch::handle_command;

/// slotkeeperd - Appointment slot allocation service
#[derive(Parser, Debug)]
#[command(name = "slotkeeperd")]
#[command(about = "Appointment slot allocation service", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/slotkeeper/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Socket path override (or set SLOTKEEPER_SOCKET env var)
    #[arg(short, long, env = "SLOTKEEPER_SOCKET")]
    socket: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

/// State shared by every request task
struct Shared {
    engine: RwLock<SlotEngine>,
    ipc: Arc<IpcServer>,
    print_calendar: bool,
    colored_output: bool,
}

impl Shared {
    async fn print_calendar(&self) {
        if !self.print_calendar {
            return;
        }
        let views: Vec<_> = self
            .engine
            .read()
            .await
            .snapshot()
            .iter()
            .map(|slot| slot.to_view())
            .collect();
        println!("{}", render_calendar(&views, self.colored_output));
    }
}

struct Service {
    shared: Arc<Shared>,
    rate_limiter: RateLimiter,
}

impl Service {
    async fn new(args: &Args) -> Result<Self> {
        let settings: Settings = load_config_or_default(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;

        info!(
            config_path = %args.config.display(),
            opening = %settings.calendar.opening,
            closing = %settings.calendar.closing,
            slot_minutes = settings.calendar.slot_minutes,
            horizon_days = settings.calendar.horizon_days,
            "Configuration loaded"
        );

        let socket_path = args
            .socket
            .clone()
            .or_else(|| settings.service.socket_path.clone())
            .unwrap_or_else(socket_path_without_env);

        let mut engine = SlotEngine::new(settings.calendar);
        engine.initialize();

        let mut ipc = IpcServer::new(&socket_path);
        ipc.start()
            .await
            .with_context(|| format!("Failed to bind socket {:?}", socket_path))?;

        info!(socket_path = %socket_path.display(), "IPC server started");

        let rate_limiter = RateLimiter::new(
            settings.service.requests_per_second,
            Duration::from_secs(1),
        );

        Ok(Self {
            shared: Arc::new(Shared {
                engine: RwLock::new(engine),
                ipc: Arc::new(ipc),
                print_calendar: settings.service.print_calendar,
                colored_output: settings.service.colored_output,
            }),
            rate_limiter,
        })
    }

    async fn run(mut self) -> Result<()> {
        let shared = self.shared.clone();
        let mut ipc_messages = shared
            .ipc
            .take_message_receiver()
            .await
            .context("IPC message receiver already taken")?;

        shared.print_calendar().await;

        let ipc_accept = shared.ipc.clone();
        tokio::spawn(async move {
            if let Err(e) = ipc_accept.run().await {
                error!(error = %e, "IPC server error");
            }
        });

        let mut sigterm = signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break;
                }

                Some(msg) = ipc_messages.recv() => {
                    self.handle_ipc_message(msg).await;
                }
            }
        }

        info!("Shutting down slotkeeperd");
        shared.ipc.broadcast_event(Event::new(EventPayload::Shutdown));
        // Give writer tasks a moment to flush the shutdown event
        tokio::time::sleep(Duration::from_millis(50)).await;
        shared.ipc.shutdown();

        info!("Shutdown complete");
        Ok(())
    }

    async fn handle_ipc_message(&mut self, msg: ServerMessage) {
        match msg {
            ServerMessage::Request { client_id, request } => {
                if !self.rate_limiter.check(&client_id) {
                    let response = Response::error(
                        request.request_id,
                        ErrorInfo::new(ErrorCode::RateLimited, "Too many requests"),
                    );
                    let _ = self.shared.ipc.send_response(&client_id, response).await;
                    return;
                }

                let shared = self.shared.clone();
                tokio::spawn(async move {
                    let info = match shared.ipc.get_client_info(&client_id).await {
                        Some(info) => info,
                        None => {
                            debug!(client_id = %client_id, "Client left before its request ran");
                            return;
                        }
                    };

                    let dispatch =
                        handle_command(&shared.engine, &info, request.request_id, request.command).await;

                    if let Err(e) = shared.ipc.send_response(&client_id, dispatch.response).await {
                        warn!(client_id = %client_id, error = %e, "Failed to send response");
                    }

                    if let Some(payload) = dispatch.event {
                        shared.ipc.broadcast_event(Event::new(payload));
                        shared.print_calendar().await;
                    }
                });
            }

            ServerMessage::ClientConnected { client_id, info } => {
                log_connection(&client_id, &info);
            }

            ServerMessage::ClientDisconnected { client_id } => {
                debug!(client_id = %client_id, "Client disconnected");
                self.rate_limiter.remove_client(&client_id);
            }
        }
    }
}

fn log_connection(client_id: &slotkeeper_util::ClientId, info: &ClientInfo) {
    match info.role {
        ClientRole::Admin => info!(client_id = %client_id, uid = ?info.uid, "Admin client connected"),
        ClientRole::Client => debug!(client_id = %client_id, uid = ?info.uid, "Client connected"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "slotkeeperd starting");

    let service = Service::new(&args).await?;
    service.run().await
}
