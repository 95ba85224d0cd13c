#[tokio::main]
async fn main() -> anyhow::Result<()> {
    gemini_relay_lib::run().await
}
