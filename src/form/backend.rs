use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use futures_timer::Delay;
use thiserror::Error;

use super::values::FormValues;

pub const DEFAULT_SUBMIT_DELAY: Duration = Duration::from_millis(1_500);

/// A submission the backend refused. The entered values are kept.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct SubmitError {
    pub message: String,
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type BoxedSubmitFuture<'a> =
    Pin<Box<dyn Future<Output = Result<(), SubmitError>> + Send + 'a>>;

/// Receives the validated values of a form.
pub trait SubmissionBackend: Send + Sync + 'static {
    fn submit<'a>(&'a self, values: &'a FormValues) -> BoxedSubmitFuture<'a>;
}

impl<F> SubmissionBackend for F
where
    F: for<'a> Fn(&'a FormValues) -> BoxedSubmitFuture<'a> + Send + Sync + 'static,
{
    fn submit<'a>(&'a self, values: &'a FormValues) -> BoxedSubmitFuture<'a> {
        (self)(values)
    }
}

/// Stands in for a server round trip: waits, then accepts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SimulatedSubmission {
    delay: Duration,
}

impl SimulatedSubmission {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedSubmission {
    fn default() -> Self {
        Self::new(DEFAULT_SUBMIT_DELAY)
    }
}

impl SubmissionBackend for SimulatedSubmission {
    fn submit<'a>(&'a self, _values: &'a FormValues) -> BoxedSubmitFuture<'a> {
        let delay = self.delay;
        Box::pin(async move {
            if !delay.is_zero() {
                Delay::new(delay).await;
            }
            Ok(())
        })
    }
}

#[cfg(feature = "http")]
pub use http::HttpSubmission;

#[cfg(feature = "http")]
mod http {
    use tracing::warn;

    use super::{BoxedSubmitFuture, SubmissionBackend, SubmitError};
    use crate::form::FormValues;

    /// POSTs the values as a JSON object.
    #[derive(Clone, Debug)]
    pub struct HttpSubmission {
        client: reqwest::Client,
        url: String,
    }

    impl HttpSubmission {
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                url: url.into(),
            }
        }

        pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
            Self {
                client,
                url: url.into(),
            }
        }
    }

    impl SubmissionBackend for HttpSubmission {
        fn submit<'a>(&'a self, values: &'a FormValues) -> BoxedSubmitFuture<'a> {
            Box::pin(async move {
                let response = self
                    .client
                    .post(&self.url)
                    .json(values)
                    .send()
                    .await
                    .map_err(|error| SubmitError::new(error.to_string()))?;
                let status = response.status();
                if status.is_success() {
                    Ok(())
                } else {
                    warn!(url = %self.url, status = status.as_u16(), "submission rejected");
                    Err(SubmitError::new(format!("Submission failed ({status})")))
                }
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::time::Instant;

    #[test]
    fn simulated_submission_waits_for_its_delay() {
        let backend = SimulatedSubmission::new(Duration::from_millis(30));
        let started = Instant::now();
        block_on(backend.submit(&FormValues::new())).expect("simulated submit");
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn closures_act_as_backends() {
        fn reject(_values: &FormValues) -> BoxedSubmitFuture<'_> {
            Box::pin(async { Err(SubmitError::new("offline")) })
        }
        let result = block_on(SubmissionBackend::submit(&reject, &FormValues::new()));
        assert_eq!(result, Err(SubmitError::new("offline")));
    }
}
