use anyhow::{Context, Result};
use clap::Parser;
use octest_model::{ClusterClient, Oc, PrometheusClient};

/// Evaluate an instant PromQL query and print the result as JSON.
#[derive(Debug, Parser)]
pub(crate) struct Query {
    /// The PromQL expression, e.g. `up`.
    query: String,
}

impl Query {
    pub(crate) async fn run(self, oc: &Oc) -> Result<()> {
        let cluster = match oc
            .config()
            .admin_kubeconfig
            .as_ref()
            .or(oc.config().kubeconfig.as_ref())
        {
            Some(path) => ClusterClient::new_from_kubeconfig_path(path)
                .await
                .context(format!("Unable to create client from path '{:?}'", path))?,
            None => ClusterClient::new()
                .await
                .context("Unable to create default client")?,
        };
        let prometheus = PrometheusClient::via_route(&cluster)
            .await
            .context("Unable to reach prometheus")?;
        let data = prometheus
            .query(&self.query)
            .await
            .context(format!("Query '{}' failed", self.query))?;
        println!(
            "{}",
            serde_json::to_string_pretty(&data.result).context("Unable to serialize result")?
        );
        Ok(())
    }
}
