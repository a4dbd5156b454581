//! Console front end: runs the server until `stop` is typed or Ctrl+C is pressed.

use std::sync::Arc;
use log::{error, info};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

use tcphttp::server::DEFAULT_PORT;
use tcphttp::{root_page, HttpServer, Router, ServerConfig};

/// Port from the first argument, then `TCPHTTP_PORT`, then the default.
fn configured_port() -> Result<u16, Box<dyn std::error::Error>> {
    let raw = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("TCPHTTP_PORT").ok());
    match raw {
        Some(port) => Ok(port.parse()?),
        None => Ok(DEFAULT_PORT),
    }
}

/// Wait for a `stop` line on stdin; other input is ignored.
async fn wait_for_stop_command() {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim() == "stop" => return,
            Ok(Some(_)) => continue,
            // Stdin closed: keep serving until Ctrl+C
            Ok(None) => std::future::pending::<()>().await,
            Err(e) => {
                error!("Error reading stdin: {e}");
                std::future::pending::<()>().await
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::with_port(configured_port()?);
    let root = root_page("Home", "Hello");
    let handler = Router::new()
        .route("/", Vec::new(), move |req| root(req))
        .into_handler();

    let server = Arc::new(HttpServer::new(config, handler));
    server.bind().await?;

    let mut accept_loop = tokio::spawn({
        let server = server.clone();
        async move { server.start().await }
    });

    let finished = tokio::select! {
        _ = wait_for_stop_command() => None,
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Error setting up Ctrl+C handler: {e}");
            }
            None
        }
        result = &mut accept_loop => Some(result),
    };

    let result = match finished {
        Some(result) => result,
        None => {
            info!("Stopping server...");
            server.request_stop();
            accept_loop.await
        }
    };
    if let Ok(Err(e)) = &result {
        error!("Accept loop failed: {e}");
    }

    server.shutdown().await;
    result??;
    Ok(())
}
