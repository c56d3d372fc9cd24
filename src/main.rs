use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use upload_mirror::config::StorageConfig;
use upload_mirror::server::serve;

#[derive(Parser, Debug)]
#[command(name = "upload-mirror")]
#[command(about = "HTTP upload node that mirrors stored files to its peers")]
struct Args {
    /// JSON configuration file
    #[arg(long = "conf", short = 'c', env = "UPLOAD_MIRROR_CONF")]
    conf: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("upload_mirror=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // 1. Configuration:
    let config = match StorageConfig::load(&args.conf) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!("Cannot start without a valid configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server is starting: {}", config.addr);
    tracing::info!("Server upload path: {}", config.path);
    if config.peers().is_empty() {
        tracing::info!("No replication peers configured");
    } else {
        tracing::info!("Server rsync addrs: {}", config.peers().join(","));
    }

    // 2. Start HTTP server:
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!("HTTP server listening on {}", listener.local_addr()?);

    serve(listener, config).await?;

    Ok(())
}
