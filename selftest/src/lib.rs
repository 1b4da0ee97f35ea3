/*!

Provides utilities for running the conformance suites against a live cluster: settings passed in
through environment variables and a [`Cluster`] handle that owns a throwaway project for the
duration of a test.

!*/

pub mod cluster;
mod test_settings;

pub use cluster::Cluster;
pub use test_settings::TestSettings;
