use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;

use axum_server::tls_rustls::RustlsConfig;
use clap::{Parser, Subcommand};
use http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tokio::net::TcpListener;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use anyhow::anyhow;

use realtime_portal::{KnowledgeBase, ServerConfig, ToolProfile, routes, state::AppState};

/// Realtime Portal - credential broker and realtime session client
#[derive(Parser, Debug)]
#[command(name = "realtime-portal")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to serving the broker)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the credential broker server
    Serve,

    /// Print the tool registration event for a profile
    Tools {
        /// Tool profile (color-palette, website-attendant, all)
        #[arg(short = 'p', long = "profile", default_value = "color-palette")]
        profile: String,

        /// Knowledge base JSON file
        #[arg(short = 'k', long = "knowledge-base")]
        knowledge_base: Option<PathBuf>,
    },

    /// Open a text session with the model from the terminal
    #[cfg(feature = "webrtc-transport")]
    Chat {
        /// Broker token endpoint
        #[arg(short = 'b', long = "broker", default_value = "http://127.0.0.1:3000/token")]
        broker_url: String,

        /// Tool profile (color-palette, website-attendant, all)
        #[arg(short = 'p', long = "profile", default_value = "color-palette")]
        profile: String,

        /// Knowledge base JSON file (falls back to KNOWLEDGE_BASE_PATH)
        #[arg(short = 'k', long = "knowledge-base")]
        knowledge_base: Option<PathBuf>,
    },
}

fn knowledge_base_path(arg: Option<PathBuf>) -> Option<PathBuf> {
    arg.or_else(|| std::env::var("KNOWLEDGE_BASE_PATH").ok().map(PathBuf::from))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Must run before any TLS connection is attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Tools {
            profile,
            knowledge_base,
        }) => print_tools(&profile, knowledge_base_path(knowledge_base)),
        #[cfg(feature = "webrtc-transport")]
        Some(Commands::Chat {
            broker_url,
            profile,
            knowledge_base,
        }) => chat::run(broker_url, &profile, knowledge_base_path(knowledge_base)).await,
        Some(Commands::Serve) | None => serve(cli.config).await,
    }
}

fn print_tools(profile: &str, knowledge_base: Option<PathBuf>) -> anyhow::Result<()> {
    let profile = ToolProfile::from_str_or_default(profile);
    let kb = match knowledge_base {
        Some(path) => KnowledgeBase::from_file(path)?,
        None => KnowledgeBase::default(),
    };
    let registry = profile.build_registry(kb)?;
    let event = registry.session_update(&profile.tool_choice())?;
    println!("{}", serde_json::to_string_pretty(&event)?);
    Ok(())
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = if let Some(config_path) = config_path {
        println!("Loading configuration from {}", config_path.display());
        ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))?
    } else {
        ServerConfig::from_env().map_err(|e| anyhow!(e.to_string()))?
    };

    if config.openai_api_key.is_some() {
        info!("OpenAI API key loaded");
    } else {
        tracing::warn!("OPENAI_API_KEY is not set; /token will fail until it is configured");
    }

    let address = config.address();
    let tls_config = config.tls.clone();
    let rate_limit_rps = config.rate_limit_requests_per_second;
    let rate_limit_burst = config.rate_limit_burst_size;
    let cors_origins = config.cors_allowed_origins.clone();
    println!("Starting server on {address}");

    let app_state = AppState::new(config).await;

    // Rate limiting (disabled when rate >= 100000 for load testing)
    let governor_layer = if rate_limit_rps < 100000 {
        let governor_config = GovernorConfigBuilder::default()
            .per_second(rate_limit_rps as u64)
            .burst_size(rate_limit_burst)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow!("Failed to build rate limiter config"))?;
        Some(GovernorLayer::new(governor_config))
    } else {
        println!("Rate limiting disabled (rate >= 100000/s)");
        None
    };

    let cors_layer = if let Some(ref origins) = cors_origins {
        if origins == "*" {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(false)
        } else {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::OPTIONS])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE])
                .allow_credentials(true)
        }
    } else {
        info!(
            "CORS not configured, defaulting to same-origin only. \
             Set CORS_ALLOWED_ORIGINS to enable cross-origin access."
        );
        CorsLayer::new()
            .allow_methods([Method::GET, Method::OPTIONS])
            .allow_headers([AUTHORIZATION, CONTENT_TYPE])
            .allow_credentials(false)
    };

    let security_headers = tower::ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_CONTENT_TYPE_OPTIONS,
            http::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            http::header::X_FRAME_OPTIONS,
            http::HeaderValue::from_static("DENY"),
        ));

    let app = routes::api::create_public_router()
        .merge(routes::api::create_api_router())
        .with_state(app_state)
        .layer(cors_layer)
        .layer(tower::util::option_layer(governor_layer))
        .layer(security_headers);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    if let Some(tls) = tls_config {
        let rustls_config = RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path)
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to load TLS certificates from {} and {}: {}",
                    tls.cert_path.display(),
                    tls.key_path.display(),
                    e
                )
            })?;

        println!("Server listening on https://{} (TLS enabled)", socket_addr);

        axum_server::bind_rustls(socket_addr, rustls_config)
            .serve(app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|e| anyhow!("TLS server error: {}", e))?;
    } else {
        println!("Server listening on http://{}", socket_addr);

        let listener = TcpListener::bind(&socket_addr).await?;
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;
    }

    Ok(())
}

#[cfg(feature = "webrtc-transport")]
mod chat {
    use std::path::PathBuf;
    use std::sync::Arc;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::sync::broadcast::error::RecvError;
    use tracing::warn;

    use realtime_portal::core::realtime::webrtc::{SampleMediaSource, WebRtcConnector};
    use realtime_portal::core::realtime::{
        ChannelNotice, ClientConfig, EventDirection, RealtimeClient,
    };
    use realtime_portal::core::tools::ToolProfile;

    pub async fn run(
        broker_url: String,
        profile: &str,
        knowledge_base_path: Option<PathBuf>,
    ) -> anyhow::Result<()> {
        let config = ClientConfig {
            broker_url,
            tool_profile: ToolProfile::from_str_or_default(profile),
            knowledge_base_path,
            ..Default::default()
        };
        let client = RealtimeClient::new(
            config,
            Arc::new(SampleMediaSource),
            Arc::new(WebRtcConnector::default()),
        )?;

        let session = client.start_session().await?;
        println!("Session {} started. Type a message, or /quit to exit.", session.id());

        let mut notices = session.channel().subscribe();
        let printer = tokio::spawn(async move {
            loop {
                match notices.recv().await {
                    Ok(ChannelNotice::Opened) => println!("[channel open]"),
                    Ok(ChannelNotice::Closed) => {
                        println!("[channel closed]");
                        break;
                    }
                    Ok(ChannelNotice::Logged(entry)) => {
                        let arrow = match entry.direction {
                            EventDirection::Outbound => "->",
                            EventDirection::Inbound => "<-",
                        };
                        println!("{arrow} {}", entry.event.event_type());
                    }
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                line = lines.next_line() => match line {
                    Ok(Some(line)) if line.trim() == "/quit" => break,
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => {
                        if let Err(e) = client.send_text_message(line) {
                            warn!(error = %e, "Message not sent");
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
        }

        client.stop_session().await;
        printer.abort();
        Ok(())
    }
}
