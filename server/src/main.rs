use anyhow::Result;
use axum::Router;
use clap::Parser;
use engine::{CatalogOptions, EngineConfig, VectorizerConfig};
use server::{build_app, ModelSource};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Catalog CSV path
    #[arg(long, default_value = "./data/games.csv")]
    catalog: PathBuf,
    /// Serve a prebuilt snapshot directory instead of fitting the catalog
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Column holding the serialized tag list
    #[arg(long, default_value = "genres")]
    tag_column: String,
    /// Stem tag terms before weighting
    #[arg(long, default_value_t = false)]
    stem: bool,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8000)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let source = match args.snapshot {
        Some(dir) => ModelSource::Snapshot(dir),
        None => ModelSource::Catalog {
            path: args.catalog,
            config: EngineConfig {
                catalog: CatalogOptions { tag_column: args.tag_column },
                vectorizer: VectorizerConfig { stem: args.stem, ..VectorizerConfig::default() },
            },
        },
    };
    let app: Router = build_app(source)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
