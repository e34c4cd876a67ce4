use order_server::{Server, ServerError, run_backfill, setup_environment};

fn parse_millis(value: Option<String>, name: &str) -> Result<i64, ServerError> {
    let raw = value.ok_or_else(|| ServerError::Usage(format!("missing <{name}>")))?;
    raw.parse()
        .map_err(|_| ServerError::Usage(format!("<{name}> must be epoch milliseconds, got {raw}")))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 设置环境 (dotenv, 配置, 日志)
    let config = setup_environment()?;

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("backfill") => {
            let from = parse_millis(args.next(), "from_ms")?;
            let to = parse_millis(args.next(), "to_ms")?;
            tracing::info!(from, to, "Running test-order backfill");

            let report = run_backfill(&config, from, to).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Some(other) => {
            return Err(ServerError::Usage(format!(
                "unknown command {other}; usage: order-server [backfill <from_ms> <to_ms>]"
            ))
            .into());
        }
        None => {
            tracing::info!("Order server starting...");
            let server = Server::new(config);
            if let Err(e) = server.run().await {
                tracing::error!("Server error: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
