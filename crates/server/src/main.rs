#[tokio::main]
async fn main() -> anyhow::Result<()> {
    linkstash_server::start().await
}
