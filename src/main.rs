use anyhow::{Context, Result};
use rmcp::{
    ServiceExt,
    transport::{
        stdio,
        streamable_http_server::tower::{StreamableHttpServerConfig, StreamableHttpService},
    },
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// Axum HTTP server for remote MCP
use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    middleware,
    response::IntoResponse,
};

use flightchat::TravelAssistant;
use flightchat::config::Config;
use flightchat::service::FlightChatService;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout belongs to the stdio transport
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load().context("Failed to load configuration")?);
    let assistant = Arc::new(TravelAssistant::new(&config)?);
    let service = FlightChatService::new(config.clone(), assistant);

    // Choose transport: stdio (default) or http
    let transport = std::env::var("FLIGHTCHAT_TRANSPORT").unwrap_or_else(|_| "stdio".to_string());
    match transport.as_str() {
        "http" | "streamable_http" => {
            let bind: SocketAddr = std::env::var("FLIGHTCHAT_HTTP_BIND")
                .unwrap_or_else(|_| "127.0.0.1:8787".to_string())
                .parse()
                .context("Invalid FLIGHTCHAT_HTTP_BIND (expected host:port)")?;
            let path = std::env::var("FLIGHTCHAT_HTTP_PATH").unwrap_or_else(|_| "/mcp".to_string());
            let bearer_token = std::env::var("FLIGHTCHAT_BEARER_TOKEN")
                .ok()
                .filter(|t| !t.is_empty());

            let svc_factory_service = service.clone();
            let session_manager: rmcp::transport::streamable_http_server::session::local::LocalSessionManager = Default::default();
            let http_service: StreamableHttpService<FlightChatService, _> =
                StreamableHttpService::new(
                    move || Ok(svc_factory_service.clone()),
                    Arc::new(session_manager),
                    StreamableHttpServerConfig {
                        stateful_mode: true,
                        sse_keep_alive: Some(Duration::from_secs(15)),
                    },
                );

            let mut router = Router::new().nest_service(path.as_str(), http_service);
            if let Some(expected) = bearer_token.clone() {
                router = router.layer(middleware::from_fn_with_state(
                    Arc::new(expected),
                    require_bearer,
                ));
            }
            let router = router.route("/health", axum::routing::get(|| async { "ok" }));

            let listener = tokio::net::TcpListener::bind(bind).await?;
            tracing::info!(
                %bind,
                path = %path,
                auth = %bearer_token.as_deref().map(|_| "bearer").unwrap_or("none"),
                "Starting Streamable HTTP MCP server"
            );

            axum::serve(listener, router).await?;
            Ok(())
        }
        _ => {
            tracing::info!("main: starting server on stdio transport");
            let server = service.serve(stdio()).await?;
            server.waiting().await?;
            tracing::info!("main: server connection closed");
            Ok(())
        }
    }
}

fn query_token_matches(query: Option<&str>, expected: &str) -> bool {
    // For clients that cannot set headers: ?access_token=... or ?token=...
    query.is_some_and(|q| {
        q.split('&').any(|pair| {
            pair.split_once('=')
                .is_some_and(|(k, v)| (k == "access_token" || k == "token") && v == expected)
        })
    })
}

async fn require_bearer(
    State(expected): State<Arc<String>>,
    req: Request<Body>,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path().eq("/health") {
        return next.run(req).await;
    }
    let headers: &HeaderMap = req.headers();
    let authorized = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {}", expected.as_str()))
        || query_token_matches(req.uri().query(), expected.as_str());
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(req).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_token() {
        assert!(query_token_matches(Some("token=abc"), "abc"));
        assert!(query_token_matches(Some("x=1&access_token=abc"), "abc"));
        assert!(!query_token_matches(Some("token=abd"), "abc"));
        assert!(!query_token_matches(Some("session=abc"), "abc"));
        assert!(!query_token_matches(None, "abc"));
    }
}
