//! Trickle push client entry point
//!
//! Run with:
//! ```bash
//! cargo run -p trickle-client
//! ```
//!
//! Configuration is loaded from environment variables. The binary connects
//! to the push gateway, optionally joins a workspace room, and logs every
//! data-changed signal until interrupted.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info, warn};

use trickle_client::{ClientConfig, ClientState, PushClient, ReconnectPolicy};
use trickle_common::{
    decode_claims, try_init_tracing, AppConfig, Credentials, MemorySecretStore, SecretStore,
};

const SECRET_SERVICE: &str = "trickle-gateway";
const SECRET_ACCOUNT: &str = "default";

#[tokio::main]
async fn main() {
    // Initialize tracing
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    // Run the client
    if let Err(e) = run().await {
        error!(error = %e, "Client failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting trickle push client...");

    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        env = ?config.app.env,
        gateway = %config.gateway.url,
        "Configuration loaded"
    );

    // Peek at the bearer token claims for operator-friendly logs
    match decode_claims(&config.gateway.auth_token) {
        Ok(claims) if claims.is_expired() => warn!(
            sub = %claims.sub,
            expires_at = ?claims.expires_at(),
            "Bearer token is expired; the gateway will likely reject it"
        ),
        Ok(claims) => info!(
            sub = %claims.sub,
            expires_at = ?claims.expires_at(),
            "Bearer token decoded"
        ),
        Err(e) => warn!(error = %e, "Could not inspect bearer token claims"),
    }

    // Seed the credential store the way the full application would
    let secrets = MemorySecretStore::new();
    secrets
        .put(
            SECRET_SERVICE,
            SECRET_ACCOUNT,
            Credentials::new(
                config.gateway.auth_token.clone(),
                config.gateway.user_id.clone(),
            ),
        )
        .await?;
    let credentials = secrets.get(SECRET_SERVICE, SECRET_ACCOUNT).await?;

    let mut client_config = ClientConfig::new(config.gateway.url.clone());
    client_config.connect_timeout = config.gateway.connect_timeout();
    client_config.reconnect = ReconnectPolicy {
        max_attempts: config.reconnect.max_attempts,
        delay: config.reconnect.delay(),
    };

    let client = PushClient::new(client_config).await?;
    client
        .initialize(credentials.token, credentials.user_id)
        .await?;

    if let (Some(workspace_id), Some(member_id)) = (
        config.gateway.workspace_id.clone(),
        config.gateway.member_id.clone(),
    ) {
        info!(workspace_id = %workspace_id, "Joining workspace room");
        client.join_room(workspace_id, member_id).await?;
    }

    let mut changes = client.data_changed();
    let mut states = client.state_changes();

    loop {
        tokio::select! {
            changed = changes.recv() => match changed {
                Ok(()) => info!("Workspace content changed"),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Missed change signals");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            result = states.changed() => {
                if result.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                info!(state = %state, "Connection state changed");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    client.close().await?;
    let _ = tokio::time::timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == ClientState::Disconnected),
    )
    .await;

    info!("Client stopped");
    Ok(())
}
