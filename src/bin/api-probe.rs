use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;

/// Liveness probe for container healthchecks.
#[derive(Parser)]
#[command(name = "api-probe")]
#[command(about = "Check that the API front door answers its liveness route", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://127.0.0.1:8080/api/v1/")]
    url: String,

    /// Give up after this many seconds.
    #[arg(short, long, default_value_t = 3)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match probe(&cli.url, Duration::from_secs(cli.timeout_secs)).await {
        Ok(()) => {
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(reason) => {
            eprintln!("Error: {}", reason);
            ExitCode::FAILURE
        }
    }
}

async fn probe(url: &str, timeout: Duration) -> Result<(), String> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| e.to_string())?;

    let res = client.get(url).send().await.map_err(|e| e.to_string())?;
    let status = res.status().as_u16();
    let body: Option<Value> = res.json().await.ok();
    evaluate(status, body.as_ref())
}

fn evaluate(status: u16, body: Option<&Value>) -> Result<(), String> {
    if status != 200 {
        return Err(format!("liveness route returned status {}", status));
    }
    match body.and_then(|b| b.get("status")).and_then(Value::as_str) {
        Some("ok") => Ok(()),
        Some(other) => Err(format!("liveness status is {:?}", other)),
        None => Err("liveness body has no status field".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evaluate() {
        assert!(evaluate(200, Some(&json!({"status": "ok"}))).is_ok());
        assert!(evaluate(503, Some(&json!({"status": "ok"}))).is_err());
        assert!(evaluate(200, Some(&json!({"status": "degraded"}))).is_err());
        assert!(evaluate(200, None).is_err());
    }
}
