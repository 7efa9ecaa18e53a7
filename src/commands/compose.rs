//! Handler for the `compose-run` subcommand.

use anyhow::Result;

use easel_core::flows::{FlowRequest, compose_flow};
use easel_core::DriveConfig;

/// Composes a flow document and prints where it landed.
pub async fn run_compose_command(
    config: &DriveConfig,
    prompt: String,
    model: Option<String>,
    steps: u32,
) -> Result<()> {
    let mut request = FlowRequest::new(prompt);
    request.model = model;
    request.steps = steps;

    let (path, _flow) = compose_flow(&request, config).await?;
    println!("Composed flow at {}", path.display());
    Ok(())
}
