use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use signlink::handlers::{handle_request, AppState};
use signlink::infrastructure::{DocumentRepository, FsContentStore, SqliteRepository};
use signlink::ServiceConfig;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    info!(db_path = %config.db_path, storage_dir = %config.storage_dir.display(), "starting signing service");

    let repository = Arc::new(SqliteRepository::new(&config.db_path)?);
    info!(
        documents = repository.count_documents()?,
        "database initialized"
    );
    let store = Arc::new(FsContentStore::new(&config.storage_dir)?);
    let state = Arc::new(AppState::new(repository, store, config.engine.clone()));

    let make_svc = make_service_fn(move |conn: &AddrStream| {
        let state = state.clone();
        let remote_addr = conn.remote_addr();
        async move {
            Ok::<_, Infallible>(service_fn(move |req| {
                handle_request(state.clone(), Some(remote_addr), req)
            }))
        }
    });

    let addr: SocketAddr = config.listen_addr.parse()?;
    let server = Server::bind(&addr).serve(make_svc);
    info!(addr = %server.local_addr(), "listening");
    server.await?;

    Ok(())
}
