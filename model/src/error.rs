use snafu::Snafu;
use std::path::PathBuf;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for the conformance harness.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Check failed: {}", description))]
    CheckFailed { description: String },

    #[snafu(display("{} of {} checks failed:\n{}", failures.len(), total, failures.join("\n")))]
    ChecksFailed { total: usize, failures: Vec<String> },

    #[snafu(display("Unable to clean up {} resources:\n{}", failures.len(), failures.join("\n")))]
    Cleanup { failures: Vec<String> },

    #[snafu(display(
        "'oc {}' failed with exit status '{}': {}",
        action,
        code.unwrap_or(1),
        output
    ))]
    Command {
        action: String,
        code: Option<i32>,
        output: String,
    },

    #[snafu(display("Expected a value for {} but it was empty", what))]
    Empty { what: String },

    #[snafu(display("Unable to write '{}': {}", path.display(), source))]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unable to {}: {}", action, source))]
    Http {
        action: String,
        source: reqwest::Error,
    },

    #[snafu(display("Unable to parse {} as json: {}", what, source))]
    JsonParse {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("'{}' is not a valid sample value: {}", value, source))]
    InvalidSample {
        value: String,
        source: std::num::ParseFloatError,
    },

    #[snafu(display("'{}' is not a valid version", version))]
    InvalidVersion { version: String },

    #[snafu(display("Unable to {}: {}", action, source))]
    Kube { action: String, source: kube::Error },

    #[snafu(display("Unable to read kubeconfig: {}", source))]
    KubeconfigRead {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to create client from kubeconfig: {}", source))]
    KubeconfigClient {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Missing '{}' in {}", field, what))]
    MissingField { field: String, what: String },

    #[snafu(display("Unable to find {}", what))]
    NotFound { what: String },

    #[snafu(display("'{}' is not tracked", what))]
    NotTracked { what: String },

    #[snafu(display("Prometheus query returned status '{}': {}", status, message))]
    PrometheusQuery { status: String, message: String },

    #[snafu(display("Invalid regex: {}", source))]
    Regex { source: regex::Error },

    #[snafu(display("Unable to spawn '{}': {}", command, source))]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("Timed out after {:?} waiting for {}", timeout, what))]
    Timeout { what: String, timeout: Duration },

    #[snafu(display("Watch of {} failed: {}", what, message))]
    Watch { what: String, message: String },
}
