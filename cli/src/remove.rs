use crate::get::{role, scope};
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use octest_model::Oc;

/// Delete a resource and wait until `oc get` reports it gone.
#[derive(Debug, Parser)]
pub(crate) struct Remove {
    /// Run as the regular user instead of cluster-admin.
    #[clap(long)]
    user: bool,

    /// Pass the current project to `oc`.
    #[clap(long)]
    namespaced: bool,

    /// The arguments passed to `oc delete`, after `--`.
    #[clap(last = true, required = true)]
    resource: Vec<String>,
}

impl Remove {
    pub(crate) async fn run(self, oc: &Oc) -> Result<()> {
        let params: Vec<&str> = self.resource.iter().map(String::as_str).collect();
        oc.remove_resource(role(self.user), scope(self.namespaced), &params)
            .await
            .context(format!("Unable to remove '{}'", self.resource.join(" ")))?;
        info!("Removed '{}'", self.resource.join(" "));
        Ok(())
    }
}
