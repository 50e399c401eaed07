mod cli;

use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pillminder=info")),
        )
        .init();

    let (addr, config) = match cli::run() {
        cli::RunOutcome::Serve(addr, config) => (addr, config),
        cli::RunOutcome::Exit(code) => std::process::exit(code),
    };

    if let Err(err) = pillminder::serve(addr, config).await {
        tracing::error!(%err, "server error");
        std::process::exit(1);
    }
}
