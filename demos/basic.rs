use modeltrace::{CallRecord, Client, ClientConfig, NoopTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() {
    let config = ClientConfig::new("mt-demo-key")
        .with_batch_size(10)
        .with_flush_interval(Duration::from_secs(2));

    // Swap NoopTransport for Client::from_config(..) to ship to a real
    // collector endpoint.
    let client = Client::new(config, Arc::new(NoopTransport)).expect("valid config");

    for i in 0..25 {
        client
            .log(
                CallRecord::new("gpt-4o", "openai")
                    .with_input(json!({"prompt": format!("question #{i}")}))
                    .with_output(json!({"answer": "42"}))
                    .with_tokens(15, 80)
                    .with_latency_ms(420)
                    .with_tag("demo"),
            )
            .await;
    }

    println!("pending before shutdown: {}", client.pending());
    client.shutdown().await;
    println!("pending after shutdown: {}", client.pending());
}
