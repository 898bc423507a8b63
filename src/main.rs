#[cfg(feature = "server")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pintu_kerja::server::run().await
}
