/*!

This library provides the building blocks of the OpenShift conformance suites: a wrapper around
the `oc` binary, fixed-interval polling and poll based checks, per test case bookkeeping of the
objects a case creates, descriptions of OLM objects, and typed clients for the cluster and its
Prometheus.

!*/

#![deny(
    clippy::expect_used,
    clippy::get_unwrap,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::panicking_unwrap,
    clippy::unwrap_in_result,
    clippy::unwrap_used
)]

pub use check::{Check, CheckList, CheckMethod, Match};
pub use cluster::ClusterClient;
pub use error::{Error, Result};
pub use events::{EventKind, ProjectEvents};
pub use oc::{CommandOutput, CommandRunner, Oc, OcConfig, ProcessRunner, Role, Scope};
pub use prometheus::{PrometheusClient, QueryData};
pub use tracker::{CaseResources, ResourceHandle, SuiteResources};
pub use version::VersionInfo;

pub mod check;
mod cluster;
pub mod constants;
mod error;
pub mod events;
#[cfg(test)]
mod mock;
pub mod oauth;
pub mod oc;
pub mod olm;
mod prometheus;
pub mod release;
pub mod template;
pub mod tracker;
pub mod util;
pub mod version;
pub mod wait;
