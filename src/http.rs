use std::thread;
use std::time::Duration;

pub(crate) const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const READ_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const PROBE_ATTEMPTS: usize = 2;
pub(crate) const RETRY_DELAY: Duration = Duration::from_millis(500);

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

fn build_agent(connect_timeout: Duration, read_timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(connect_timeout)
        .timeout_read(read_timeout)
        .timeout_write(read_timeout)
        .build()
}

pub(crate) fn get_text_with_retries(
    url: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
    attempts: usize,
    retry_delay: Duration,
) -> Result<String, String> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let agent = build_agent(connect_timeout, read_timeout);
        match agent.get(url).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => return Ok(body),
                Err(err) => {
                    return Err(format!("request failed: response decode failed: {err}"));
                }
            },
            Err(ureq::Error::Status(status, _)) => {
                if should_retry_http_status(status) && attempt < attempts {
                    thread::sleep(retry_delay);
                    continue;
                }
                if should_retry_http_status(status) {
                    return Err(format!(
                        "request failed after {attempts} attempt(s): HTTP status {status}"
                    ));
                }
                return Err(format!("request failed: HTTP status {status}"));
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    thread::sleep(retry_delay);
                    continue;
                }
                return Err(format!(
                    "request failed after {attempts} attempt(s): transport error: {err}"
                ));
            }
        }
    }

    Err("request failed: exhausted attempts without a concrete error".to_string())
}

// Existence probe for a candidate page resource. A definitive "not there"
// (4xx) is a successful negative answer, not an error; only transport
// failures and exhausted retryable statuses report failure.
pub(crate) fn head_exists_with_retries(
    url: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
    attempts: usize,
    retry_delay: Duration,
) -> Result<bool, String> {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let agent = build_agent(connect_timeout, read_timeout);
        match agent.head(url).call() {
            Ok(_) => return Ok(true),
            Err(ureq::Error::Status(status, _)) => {
                if should_retry_http_status(status) {
                    if attempt < attempts {
                        thread::sleep(retry_delay);
                        continue;
                    }
                    return Err(format!(
                        "probe failed after {attempts} attempt(s): HTTP status {status}"
                    ));
                }
                return Ok(false);
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    thread::sleep(retry_delay);
                    continue;
                }
                return Err(format!(
                    "probe failed after {attempts} attempt(s): transport error: {err}"
                ));
            }
        }
    }

    Err("probe failed: exhausted attempts without a concrete error".to_string())
}
