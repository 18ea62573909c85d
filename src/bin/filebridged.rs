//! Binary entry point: loads configuration, authenticates every configured
//! bot client, builds one [`transfer::ParallelTransferrer`] per client, and
//! serves the HTTP surface until shutdown is requested.

use std::collections::HashMap;
use std::sync::Arc;

use cache::{FileInfoResolver, GrammersFileInfoSource};
use dispatcher::Dispatcher;
use grammers_client::{Client, Config, InitParams};
use grammers_session::Session;
use gwcore::config::AppConfig;
use gwcore::error::GatewayError;
use http::AppState;
use senders::grammers_adapter::GrammersMainClient;
use senders::remote::{AuthKey, MainClient};
use senders::SenderPool;
use tracing::{error, info};
use transfer::ParallelTransferrer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    logging::init(logging::Verbosity::from_flags(config.debug, config.ext_debug))
        .expect("tracing subscriber installs exactly once");

    info!(bind_addr = %config.bind_addr, "starting up");

    let mut clients = HashMap::new();
    let (main_id, main_client_for_lookups) =
        sign_in_and_register(&config, &config.bot_token, &mut clients).await?;
    for token in &config.multi_tokens {
        match sign_in_and_register(&config, token, &mut clients).await {
            Ok(_) => {}
            Err(err) => error!(error = %err, "failed to start an auxiliary client, skipping it"),
        }
    }
    info!(client_count = clients.len(), main_id, "all clients started");

    let dispatcher = Dispatcher::new(clients);
    let source = GrammersFileInfoSource::new(main_client_for_lookups, config.bin_channel);
    let resolver = FileInfoResolver::new(source, config.cache_size);
    let state = AppState::new(dispatcher, resolver, config.download_part_size);
    let router = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(public_url = %config.public_url, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutdown complete");
    Ok(())
}

/// Signs `token` in, resolves its own DC, and registers a
/// [`ParallelTransferrer`] for it in `clients`. Returns the client's user id
/// and a cloned handle to the authenticated client, so the caller can reuse
/// the main bot's session for file-info lookups without a second sign-in.
async fn sign_in_and_register(
    config: &AppConfig,
    token: &str,
    clients: &mut HashMap<i64, Arc<ParallelTransferrer>>,
) -> Result<(i64, Client), GatewayError> {
    let client = main_client_handle(config, token).await.map_err(|e| {
        GatewayError::UpstreamTransient(format!("sign-in failed: {e}"))
    })?;

    let me = client
        .invoke(&grammers_tl_types::functions::users::GetFullUser {
            id: grammers_tl_types::enums::InputUser::UserSelf,
        })
        .await
        .map_err(|e| GatewayError::UpstreamTransient(e.to_string()))?;
    let user_id = extract_user_id(&me).ok_or_else(|| {
        GatewayError::UpstreamTransient("GetFullUser reply carried no user record".into())
    })?;

    let grammers_tl_types::enums::Config::Config(remote_config) = client
        .invoke(&grammers_tl_types::functions::help::GetConfig {})
        .await
        .map_err(|e| GatewayError::UpstreamTransient(e.to_string()))?;
    let home_dc_id = remote_config.this_dc as u8;

    let home_auth_key = AuthKey(client.session().save());
    let main_client: Arc<dyn MainClient> =
        Arc::new(GrammersMainClient::new(client.clone(), home_auth_key, home_dc_id));

    let pool = Arc::new(SenderPool::new(main_client, config.connection_limit));
    pool.publish_home_auth_key().await;
    clients.insert(user_id, Arc::new(ParallelTransferrer::new(pool)));
    Ok((user_id, client))
}

/// Pulls the signed-in bot's own id out of the `users` list `GetFullUser`
/// returns alongside the full-user record.
fn extract_user_id(reply: &grammers_tl_types::enums::users::UserFull) -> Option<i64> {
    let grammers_tl_types::enums::users::UserFull::Full(full) = reply;
    full.users.iter().find_map(|u| match u {
        grammers_tl_types::enums::User::User(user) => Some(user.id),
        grammers_tl_types::enums::User::Empty(_) => None,
    })
}

async fn main_client_handle(config: &AppConfig, token: &str) -> Result<Client, String> {
    let client = Client::connect(Config {
        session: Session::new(),
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: InitParams::default(),
    })
    .await
    .map_err(|e| e.to_string())?;

    if !client.is_authorized().await.unwrap_or(false) {
        client.bot_sign_in(token).await.map_err(|e| e.to_string())?;
    }
    Ok(client)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("shutdown signal received, draining in-flight requests");
}
