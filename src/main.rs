use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    cartpilot_cli::cli::app::run().await
}
