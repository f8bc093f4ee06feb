use eyre::Result;

mod cli;
mod config;
mod daemon;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
