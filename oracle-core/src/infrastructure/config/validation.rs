use crate::infrastructure::config::types::AppConfig;

const MIN_RSA_KEY_BITS: usize = 1024;
const MAX_RSA_KEY_BITS: usize = 8192;
const MAX_TASK_WORKERS: usize = 64;

fn check_url(errors: &mut Vec<String>, field: &str, url: &str) {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        errors.push(format!("{field} must not be empty"));
    } else if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        errors.push(format!("{field} must be an http(s) url: {trimmed}"));
    }
}

impl AppConfig {
    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.service.rsa_key_bits < MIN_RSA_KEY_BITS || self.service.rsa_key_bits > MAX_RSA_KEY_BITS {
            errors.push(format!("service.rsa_key_bits must be within {}..={}", MIN_RSA_KEY_BITS, MAX_RSA_KEY_BITS));
        }
        if self.service.private_keys.iter().any(|key| key.trim().is_empty()) {
            errors.push("service.private_keys must not contain empty entries".to_string());
        }

        check_url(&mut errors, "bitcoind.rpc_url", &self.bitcoind.rpc_url);
        check_url(&mut errors, "bitmessage.api_url", &self.bitmessage.api_url);
        check_url(&mut errors, "price_feed.url", &self.price_feed.url);

        if self.runtime.scheduler_interval_secs == 0 {
            errors.push("runtime.scheduler_interval_secs must be > 0".to_string());
        }
        if self.runtime.inbox_poll_secs == 0 {
            errors.push("runtime.inbox_poll_secs must be > 0".to_string());
        }
        if self.runtime.task_workers == 0 || self.runtime.task_workers > MAX_TASK_WORKERS {
            errors.push(format!("runtime.task_workers must be within 1..={}", MAX_TASK_WORKERS));
        }
        if self.runtime.external_call_timeout_secs == 0 {
            errors.push("runtime.external_call_timeout_secs must be > 0".to_string());
        }
        if self.runtime.pricecheck_retry_interval_secs == 0 {
            errors.push("runtime.pricecheck_retry_interval_secs must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
