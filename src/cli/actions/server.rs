use crate::{api, cli::telemetry, gate::GateConfig};
use anyhow::Result;
use secrecy::SecretString;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub gate: GateConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the gate configuration is invalid or the server fails
/// to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        public_base_url = args.gate.public_base_url(),
        "Starting server"
    );

    let result = api::new(args.port, &args.dsn, &args.gate).await;

    telemetry::shutdown_tracer();

    result
}
