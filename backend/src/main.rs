#[tokio::main]
async fn main() -> anyhow::Result<()> {
    madad::start_server().await
}
