use std::sync::Arc;

use anyhow::Context;
use cactus_client::HttpInstanceApi;
use cactus_panel::command::{CommandError, PanelCommand, HELP};
use cactus_panel::console::{self, ConsoleView, Flow};
use cactus_panel::{InstancePanelController, PanelSettings};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    // Logs go to stderr so they do not interleave with the rendered panel.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let settings = PanelSettings::from_env();
    let api = HttpInstanceApi::new(
        &settings.api_base_url,
        settings.http_connect_timeout,
        settings.http_timeout,
    )
    .with_context(|| format!("cannot use API base url {}", settings.api_base_url))?;
    tracing::info!(base_url = %api.base_url(), hub_port = settings.hub_port, "cactus panel started");

    let view = ConsoleView::new();
    let controller = InstancePanelController::new(Arc::new(api), view.surfaces(), &settings);
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match line.parse::<PanelCommand>() {
            Ok(command) => {
                if console::dispatch(&controller, &view, command) == Flow::Quit {
                    break;
                }
            }
            Err(CommandError::Empty) => {}
            Err(e) => eprintln!("{}", e),
        }
    }

    controller.shutdown();
    Ok(())
}
