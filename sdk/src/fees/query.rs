//! Fee estimation against the mirror REST service.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use url::Url;

use super::response::{FeeEstimateMode, FeeEstimateResponse};
use crate::client::Client;
use crate::config;
use crate::error::{is_transient_http_status, Error, Result};
use crate::execution::{execute_with_retry, AttemptOutcome, HttpResponse, HttpTransport, RetryPolicy};
use crate::transaction::{Transaction, TransactionData};

/// Asks the mirror what a transaction would cost.
///
/// ```ignore
/// let estimate = FeeEstimateQuery::new()
///     .set_transaction(&tx)?
///     .set_mode(FeeEstimateMode::Intrinsic)
///     .execute(&client)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct FeeEstimateQuery {
    transaction_bytes: Option<Vec<u8>>,
    mode: FeeEstimateMode,
    max_attempts: u32,
    max_backoff: Duration,
}

impl Default for FeeEstimateQuery {
    fn default() -> Self {
        Self {
            transaction_bytes: None,
            mode: FeeEstimateMode::default(),
            max_attempts: config::DEFAULT_MAX_ATTEMPTS,
            max_backoff: config::DEFAULT_MAX_BACKOFF,
        }
    }
}

impl FeeEstimateQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Estimates for `transaction`, sending its first signed entry. Drafts
    /// work too.
    pub fn set_transaction<D: TransactionData>(
        &mut self,
        transaction: &Transaction<D>,
    ) -> Result<&mut Self> {
        self.transaction_bytes = Some(transaction.first_signed_frame()?);
        Ok(self)
    }

    /// Estimates for bytes encoded elsewhere.
    pub fn set_transaction_bytes(&mut self, bytes: Vec<u8>) -> &mut Self {
        self.transaction_bytes = Some(bytes);
        self
    }

    pub fn set_mode(&mut self, mode: FeeEstimateMode) -> &mut Self {
        self.mode = mode;
        self
    }

    pub fn set_max_attempts(&mut self, max_attempts: u32) -> Result<&mut Self> {
        if max_attempts == 0 {
            return Err(Error::argument("maxAttempts must be greater than zero"));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Ceiling for one retry delay. Retries start at 500 ms, so anything
    /// lower is refused.
    pub fn set_max_backoff(&mut self, max_backoff: Duration) -> Result<&mut Self> {
        if max_backoff < config::FEE_ESTIMATE_MIN_BACKOFF {
            return Err(Error::argument(format!(
                "maxBackoff must be at least {} ms",
                config::FEE_ESTIMATE_MIN_BACKOFF.as_millis()
            )));
        }
        self.max_backoff = max_backoff;
        Ok(self)
    }

    pub fn mode(&self) -> FeeEstimateMode {
        self.mode
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    fn retry_policy(&self, client: &Client) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_backoff: config::FEE_ESTIMATE_MIN_BACKOFF,
            max_backoff: self.max_backoff,
            request_timeout: client.retry_policy().request_timeout,
        }
    }

    /// POSTs the transaction to the client's first mirror and parses the
    /// estimate, retrying transient failures.
    pub async fn execute(&self, client: &Client) -> Result<FeeEstimateResponse> {
        let body = self
            .transaction_bytes
            .clone()
            .ok_or_else(|| Error::state("transaction must be set before executing fee estimate"))?;
        let address = client
            .mirror_network()
            .first()
            .ok_or_else(|| Error::state("client has no mirror network configured"))?;
        let url = fee_estimate_url(address, self.mode)?;
        let policy = self.retry_policy(client);
        policy.validate()?;

        let transport: Arc<dyn HttpTransport> = Arc::clone(client.http_transport());
        execute_with_retry(&policy, "fee estimate", |attempt| {
            let transport = Arc::clone(&transport);
            let url = url.clone();
            let body = body.clone();
            async move {
                debug!(url = %url, attempt, "requesting fee estimate");
                match transport
                    .post(&url, config::FEE_ESTIMATE_CONTENT_TYPE, body)
                    .await
                {
                    Ok(response) => classify(response),
                    Err(error) if error.is_retryable() => AttemptOutcome::Retry(error),
                    Err(error) => AttemptOutcome::Fatal(error),
                }
            }
        })
        .await
    }
}

fn classify(response: HttpResponse) -> AttemptOutcome<FeeEstimateResponse> {
    if response.is_success() {
        return match serde_json::from_str::<FeeEstimateResponse>(&response.body) {
            Ok(parsed) if parsed.is_consistent() => AttemptOutcome::Success(parsed),
            Ok(parsed) => AttemptOutcome::Retry(Error::ResponseParse(format!(
                "total {} does not match the component sum {}",
                parsed.total,
                parsed.expected_total()
            ))),
            Err(e) => AttemptOutcome::Retry(Error::ResponseParse(e.to_string())),
        };
    }
    if is_transient_http_status(response.status) {
        AttemptOutcome::Retry(Error::HttpStatus {
            status: response.status,
            body: response.body,
        })
    } else {
        AttemptOutcome::Fatal(Error::HttpRejected {
            status: response.status,
            body: response.body,
        })
    }
}

/// Base URL of a mirror REST service. Addresses that already carry a scheme
/// are used as given. Local addresses get `http`, everything else `https`.
pub fn mirror_base_url(address: &str) -> Result<Url> {
    let with_scheme = if address.contains("://") {
        address.to_string()
    } else if address.starts_with("localhost") || address.starts_with("127.0.0.1") {
        format!("http://{address}")
    } else {
        format!("https://{address}")
    };
    Url::parse(&with_scheme)
        .map_err(|e| Error::argument(format!("invalid mirror address `{address}`: {e}")))
}

fn fee_estimate_url(address: &str, mode: FeeEstimateMode) -> Result<Url> {
    let base = mirror_base_url(address)?;
    let full = format!(
        "{}{}{}",
        base.as_str().trim_end_matches('/'),
        config::MIRROR_REST_PATH,
        config::FEE_ESTIMATE_PATH
    );
    let mut url = Url::parse(&full)
        .map_err(|e| Error::argument(format!("invalid fee estimate url `{full}`: {e}")))?;
    url.query_pairs_mut().append_pair("mode", mode.as_str());
    Ok(url)
}
