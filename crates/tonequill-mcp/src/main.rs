use clap::Parser;
use rmcp::ServiceExt;
use tonequill_mcp::tools::TonequillMcp;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tonequill-mcp", about = "JSON-RPC tool server for a symbolic-music document")]
struct Args {
    /// Working directory the server runs in (only consulted for resolving
    /// relative `export_midi` paths; the document itself holds no files).
    #[arg(long, default_value = ".")]
    project_dir: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    std::env::set_current_dir(&args.project_dir)?;

    tracing::info!("starting tonequill-mcp in {}", args.project_dir);

    let service = TonequillMcp::new()
        .serve(rmcp::transport::io::stdio())
        .await?;
    service.waiting().await?;
    Ok(())
}
