use anyhow::{Context, Result};
use clap::Parser;
use octest_model::util::bump_minor_version;
use octest_model::Oc;

/// Print the Kubernetes version of the cluster.
#[derive(Debug, Parser)]
pub(crate) struct Version {
    /// Print the next minor version instead, e.g. `1.25.0` for a `1.24.3` cluster.
    #[clap(long = "next-minor")]
    next_minor: bool,
}

impl Version {
    pub(crate) async fn run(self, oc: &Oc) -> Result<()> {
        let version = oc
            .kubernetes_version()
            .await
            .context("Unable to get the Kubernetes version")?;
        if self.next_minor {
            println!("{}", bump_minor_version(&version)?);
        } else {
            println!("{}", version);
        }
        Ok(())
    }
}
