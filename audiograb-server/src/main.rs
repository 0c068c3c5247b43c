use audiograb_server::{serve, telemetry, Cli};
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json);

    if let Err(e) = serve(cli).await {
        tracing::error!(error = %e, "server exited with error");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
