// Stand-in actuator controllers: answers readiness queries on
// `ackermann/ctrl/*/state` and prints every command the runtime publishes.
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    let queryable = session.declare_queryable("ackermann/ctrl/*/state").await?;
    let commands = session.declare_subscriber("ackermann/ctrl/*/command").await?;
    info!("Answering readiness queries and echoing commands");

    loop {
        tokio::select! {
            Ok(query) = queryable.recv_async() => {
                let key = query.key_expr().clone();
                query.reply(key, "running").await?;
            }
            Ok(sample) = commands.recv_async() => {
                let payload = sample.payload().to_bytes();
                info!("{} <- {}", sample.key_expr(), String::from_utf8_lossy(&payload));
            }
            else => break,
        }
    }

    Ok(())
}
