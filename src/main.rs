use std::sync::Arc;

use plainhttp::config::Config;
use plainhttp::handler::{EchoHandler, FileServer, Logger, Recovery};
use plainhttp::router::Router;
use plainhttp::server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;

    let mut router = Router::new("/");
    router
        .use_middleware(Logger)
        .use_middleware(Recovery::new(cfg.debug_panic_response));
    router.get("/echo/", EchoHandler)?;
    if let Some(files) = &cfg.static_files {
        router.get(files.prefix.clone(), FileServer::new(&files.root, &files.prefix))?;
    }

    let server = Arc::new(Server::new(router).with_options(cfg.server_options()));

    let tls = async {
        match &cfg.tls {
            Some(tls) => {
                tracing::info!("Listening (TLS) on {}", tls.listen_addr);
                Arc::clone(&server)
                    .listen_and_serve_tls(&tls.listen_addr, &tls.cert_path, &tls.key_path)
                    .await
            }
            None => std::future::pending::<anyhow::Result<()>>().await,
        }
    };

    tracing::info!("Listening on {}", cfg.listen_addr);

    tokio::select! {
        res = Arc::clone(&server).listen_and_serve(&cfg.listen_addr) => {
            res?;
        }

        res = tls => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
