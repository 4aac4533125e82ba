use futures::TryStreamExt;
use http::Method;
use micro_webclient::WebClient;
use std::io;
use std::time::Duration;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

// cargo run --example get -- http://127.0.0.1:8080/
#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let uri = std::env::args().nth(1).unwrap_or_else(|| "http://127.0.0.1:8080/".to_string());
    let client = WebClient::builder().default_timeout(Duration::from_secs(5)).build();

    let response = match client.uri(uri.as_str()).method(Method::GET).retrieve() {
        Ok(response) => response,
        Err(e) => {
            error!(cause = %e, "invalid request");
            return;
        }
    };

    let mut chunks = response
        .on_status(400, |status| Some(io::Error::other(format!("client error {}: {}", status.status(), status.body_as_text()))))
        .on_status(500, |status| Some(io::Error::other(format!("server error {}", status.status()))))
        .on_header("content-type", |value| async move {
            info!(content_type = ?value, "received");
            Ok::<_, io::Error>(())
        })
        .with_timing(|elapsed| async move { info!(elapsed_ms = elapsed.as_millis(), "finished") })
        .into_stream();

    loop {
        match chunks.try_next().await {
            Ok(Some(chunk)) => println!("{}", String::from_utf8_lossy(&chunk)),
            Ok(None) => break,
            Err(e) => {
                error!(cause = %e, "request failed");
                break;
            }
        }
    }
}
