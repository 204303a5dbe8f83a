use clap::Parser;
use simple_logger::SimpleLogger;
use tokio::runtime;

use proxy_catalog::api::{ApiConfig, ApiServer};
use proxy_catalog::argument::Cli;
use proxy_catalog::config::Settings;
use proxy_catalog::scheduler::Scheduler;
use proxy_catalog::state::AppState;
use proxy_catalog::utils::error::{ProxyError, ProxyResult};
use proxy_catalog::utils::shutdown::{init_shutdown_manager, register_for_shutdown, setup_signal_handlers};

fn main() -> ProxyResult<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.env_file {
        if let Err(e) = dotenvy::from_path(path) {
            eprintln!("failed to load env file {:?}: {}", path, e);
        }
    }

    let log_level = match cli.log_level.as_str() {
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    SimpleLogger::new()
        .with_level(log::LevelFilter::Off)
        .with_module_level("proxy_catalog", log_level)
        .without_timestamps()
        .init()
        .map_err(|e| ProxyError::Config(format!("failed to initialize logger: {}", e)))?;

    init_shutdown_manager();

    let runtime = runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| ProxyError::Config(format!("failed to create runtime: {}", e)))?;

    runtime.block_on(async move {
        let mut settings = Settings::load()?;
        if let Some(host) = cli.host {
            settings.api_host = host;
        }
        if let Some(port) = cli.port {
            settings.api_port = port;
        }
        if cli.no_scheduler {
            settings.scheduler_enabled = false;
        }

        let state = AppState::new(settings)?;

        let _signal_handle = tokio::spawn(setup_signal_handlers());
        let mut scheduler_shutdown_rx = register_for_shutdown("scheduler".to_string()).await;
        let mut api_shutdown_rx = register_for_shutdown("api_server".to_string()).await;

        let scheduler = std::sync::Arc::new(Scheduler::new(state.clone()));
        let scheduler_for_task = scheduler.clone();
        let scheduler_handle = tokio::spawn(async move {
            tokio::select! {
                _ = scheduler_for_task.run() => {}
                reason = scheduler_shutdown_rx.recv() => {
                    if let Some(reason) = reason {
                        log::info!("scheduler stopping: {:?}", reason);
                    }
                    scheduler_for_task.stop();
                }
            }
        });

        let api_config = ApiConfig {
            host: state.settings.api_host.clone(),
            port: state.settings.api_port,
            cors_origins: vec!["*".to_string()],
            request_timeout_ms: 30_000,
        };

        log::info!("proxy-catalog {} starting", proxy_catalog::VERSION);
        let server = ApiServer::new(api_config, state);
        tokio::select! {
            result = server.start() => {
                if let Err(e) = result {
                    log::error!("API server failed: {}", e);
                }
            }
            reason = api_shutdown_rx.recv() => {
                if let Some(reason) = reason {
                    log::info!("API server stopping: {:?}", reason);
                }
            }
        }

        scheduler.stop();
        let _ = scheduler_handle.await;

        Ok(())
    })
}
