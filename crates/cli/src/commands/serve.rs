//! Serve command handler.
//!
//! Starts the browser UI on the configured bind address.

use clap::Args;
use docu_core::{config::AppConfig, AppResult};
use docu_knowledge::Trainer;
use docu_web::{create_router, AppState, SessionStore};
use std::time::Duration;

/// Start the browser UI
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Port to listen on, overriding the port of the bind address
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let bind = self.bind_address(&config.bind);

        let trainer = Trainer::from_config(config)?;
        let sessions = SessionStore::with_limits(
            config.max_sessions,
            Duration::from_secs(config.session_idle_secs),
        );
        let app = create_router(AppState::new(trainer)?.with_sessions(sessions));

        let listener = tokio::net::TcpListener::bind(&bind).await?;
        let addr = listener.local_addr()?;
        tracing::info!("Docu Assistant listening on http://{}", addr);
        eprintln!("Open http://{} in your browser", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    fn bind_address(&self, configured: &str) -> String {
        match self.port {
            Some(port) => {
                let host = configured
                    .rsplit_once(':')
                    .map(|(host, _)| host)
                    .unwrap_or(configured);
                format!("{}:{}", host, port)
            }
            None => configured.to_string(),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_port_override() {
        let cmd = ServeCommand { port: Some(9000) };
        assert_eq!(cmd.bind_address("127.0.0.1:8501"), "127.0.0.1:9000");

        let cmd = ServeCommand { port: None };
        assert_eq!(cmd.bind_address("0.0.0.0:8501"), "0.0.0.0:8501");
    }
}
