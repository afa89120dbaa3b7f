use std::time::{Duration, Instant};
use requests_sim::config::HarnessConfig;
use requests_sim::net::Credentials;
use requests_sim::Requests;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("requests_sim=debug")).init();

    // Set up a harness with a slow wire and a slow server. Each harness gets its
    // own link, server and client, so nothing leaks between runs.
    let body = r#"{"foo": ["bar", "baz"]}"#;
    let config = HarnessConfig::builder()
        .network_latency(Duration::from_millis(100))
        .server_latency(Duration::from_millis(100))
        .status(200)
        .body(body)
        .build()?;
    let requests = Requests::new(config)?;

    let endpoint = "http://example.test";
    let auth = Credentials::from([("user".to_string(), "pass".to_string())]);

    // Blocking call: returns once the full round trip has happened
    let start = Instant::now();
    let res = requests.get(endpoint, body, &auth).await?;
    println!("get       -> {} {} after {:?}", res.status_text, res.body_text(), start.elapsed());

    // Non-blocking call: the handle comes back after the wire delay, the reply later
    let start = Instant::now();
    let handle = requests.get_async(endpoint, body, &auth, 1).await?;
    println!("get_async -> handle after {:?} (timeout now {:?})", start.elapsed(), requests.client().timeout());

    let res = handle.await?;
    println!("get_async -> {} after {:?}", res.status_text, start.elapsed());

    requests.close()?;
    Ok(())
}
