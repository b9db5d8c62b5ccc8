use std::time::{Duration, Instant};

use tracing::debug;

use crate::models::{ProbeOutcome, ProbeSuccess};

/// Constant pause between failed attempts. Injected here as a module constant
/// so the retry policy can change without touching the probe contract.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Fetches `url` with bounded retries and reports the outcome as a value.
///
/// Total attempts = `max_retries` + 1, run sequentially with a pause between
/// failures (none after the last). Redirects are followed by the client, so
/// the recorded final URL reflects the last hop. Latency covers the full
/// request including body download, matching what a browser user would feel.
pub async fn probe(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    max_retries: u32,
) -> ProbeOutcome {
    let attempts_total = max_retries + 1;
    let mut last_error = String::new();

    for attempt in 1..=attempts_total {
        let start = Instant::now();
        match client.get(url).timeout(timeout).send().await {
            Ok(response) => {
                let status_code = response.status().as_u16();
                let final_url = response.url().to_string();
                match response.bytes().await {
                    Ok(body) => {
                        let latency_ms = round2(start.elapsed().as_secs_f64() * 1000.0);
                        return ProbeOutcome::Success(ProbeSuccess {
                            status_code,
                            latency_ms,
                            final_url,
                            body: body.to_vec(),
                            attempts: attempt,
                        });
                    }
                    Err(err) => {
                        last_error =
                            format!("body read failed (attempt {attempt}/{attempts_total}): {err}");
                    }
                }
            }
            Err(err) => last_error = describe_failure(&err, attempt, attempts_total),
        }

        debug!("Probe attempt {attempt}/{attempts_total} for {url} failed: {last_error}");
        if attempt < attempts_total {
            tokio::time::sleep(RETRY_PAUSE).await;
        }
    }

    ProbeOutcome::Failure {
        attempts: attempts_total,
        message: format!("All {attempts_total} attempts failed. Last error: {last_error}"),
    }
}

/// Classifies a failed attempt for the diagnostic message only; every class
/// is retried identically.
fn describe_failure(err: &reqwest::Error, attempt: u32, total: u32) -> String {
    if err.is_timeout() {
        format!("request timed out (attempt {attempt}/{total})")
    } else if is_tls_error(err) {
        format!("TLS error (attempt {attempt}/{total}): {err}")
    } else if err.is_connect() {
        format!("connection failed (attempt {attempt}/{total}): {err}")
    } else {
        format!("request error (attempt {attempt}/{total}): {err}")
    }
}

fn is_tls_error(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        let text = inner.to_string().to_ascii_lowercase();
        if text.contains("certificate") || text.contains("tls") || text.contains("handshake") {
            return true;
        }
        source = inner.source();
    }
    false
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
