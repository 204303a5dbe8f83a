//! Thin wrapper around the axum app: builds the router from shared state and binds it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::state::AppState;

use super::{routes, ApiConfig};

pub struct ApiServer {
    config: ApiConfig,
    app: Router,
}

impl ApiServer {
    pub fn new(config: ApiConfig, state: Arc<AppState>) -> Self {
        let app = routes::build(state, &config);
        Self { config, app }
    }

    pub async fn start(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port).parse()?;
        let listener = TcpListener::bind(addr).await?;
        log::info!("API server listening on http://{}", addr);
        axum::serve(listener, self.app).await?;
        Ok(())
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[tokio::test]
    async fn server_builds_from_default_config() {
        let settings = Settings::load().expect("settings load from defaults");
        let state = AppState::new(settings).expect("state builds");
        let server = ApiServer::new(ApiConfig::default(), state);
        assert_eq!(server.config().port, 3000);
    }
}
