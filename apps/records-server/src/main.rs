#[tokio::main]
async fn main() -> anyhow::Result<()> {
    records_server::run_server().await
}
