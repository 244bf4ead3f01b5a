//! CPF Authorizer Server
//!
//! Authorizes people by CPF and manages their profile records.
//!
//! # Modes
//!
//! - **Lambda** (production): detected through `AWS_LAMBDA_RUNTIME_API`; requests
//!   arrive as API Gateway proxy events
//! - **HTTP** (development): default; HTTP server on `PORT` for curl testing

use anyhow::{Context, Result};
use cpf_authorizer::authorization::AuthorizationService;
use cpf_authorizer::aws::build_store;
use cpf_authorizer::config::{AppConfig, RunMode};
use cpf_authorizer::http::Router;
use cpf_authorizer::lambda::into_router_request;
use cpf_authorizer::repository::ProfileRepository;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming, Request};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

async fn run_http_server(router: Router, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(address = %addr, "HTTP server listening");

    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let router = router.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req: Request<Incoming>| {
                let router = router.clone();
                async move {
                    let response = router.dispatch(req).await;
                    Ok::<_, Infallible>(response.into_response(Full::new))
                }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!(remote_addr = %remote_addr, error = %e, "Connection error");
            }
        });
    }
}

/// API Gateway proxy events through the Lambda runtime
async fn run_lambda(router: Router) -> Result<()> {
    lambda_http::run(lambda_http::service_fn(move |event: lambda_http::Request| {
        let router = router.clone();
        async move {
            let response = router.dispatch(into_router_request(event)).await;
            Ok::<_, lambda_http::Error>(
                response.into_response(|body| lambda_http::Body::from(body.to_vec())),
            )
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("lambda runtime failed: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!(mode = ?config.mode, "Cold start");

    let store = build_store(&config).await;
    let repository = ProfileRepository::new(store);
    let router = Router::new(AuthorizationService::new(repository));

    match config.mode {
        RunMode::Lambda => {
            info!("Running under the Lambda runtime");
            run_lambda(router).await
        }
        RunMode::Http { port } => run_http_server(router, port).await,
    }
}
