#![warn(clippy::pedantic, clippy::all, clippy::nursery)]
#![allow(clippy::single_match_else)]

use crate::{config::RuntimeConfiguration, routes::router, state::BursarState};
use tokio::{net::TcpListener, signal};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[macro_use]
extern crate tracing;

mod config;
mod data;
mod error;
mod routes;
mod state;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    warn!("signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
    .expect("unable to set tracing subscriber");

    info!("`tracing` online");

    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            info!("no .env file found, using the environment as-is");
        } else {
            warn!(?e, "unable to load .env file");
        }
    }

    let config = RuntimeConfiguration::new().expect("unable to create config");

    let upload_config = config.upload_config();
    upload_config
        .create_directory()
        .await
        .expect("unable to create upload directory");

    let state = BursarState::new(config.clone())
        .await
        .expect("unable to create state");
    state
        .run_migrations()
        .await
        .expect("unable to migrate database");
    info!(db = config.db_config().url(), upload_dir = ?upload_config.directory(), "Storage ready");

    let server_ip = config.server_ip();
    let listener = TcpListener::bind(server_ip)
        .await
        .expect("unable to listen on server ip");

    info!(?server_ip, "Listening");
    serve_until(listener, state, shutdown_signal())
        .await
        .expect("unable to serve app");
}

async fn serve_until(
    listener: TcpListener,
    state: BursarState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let result = axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await;

    //only once every in-flight request has drained
    state.sensible_shutdown().await;
    info!("database pool closed");

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::test_state;
    use std::time::Duration;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpStream,
        sync::oneshot,
    };

    #[tokio::test]
    async fn requests_in_flight_at_shutdown_still_reach_the_database() {
        let test = test_state().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve_until(listener, test.state.clone(), async move {
            let _ = stop_rx.await;
        }));

        let body = r#"{"first_name":"Ada","last_name":"Lovelace","dob":"1815-12-10","amount_due":1.5}"#;
        let (head, tail) = body.split_at(10);

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                format!(
                    "POST /students HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{head}",
                    body.len()
                )
                .as_bytes(),
            )
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        stop_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!test.state.is_closed());

        stream.write_all(tail.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 201"), "{response}");

        server.await.unwrap().unwrap();
        assert!(test.state.is_closed());
    }
}
