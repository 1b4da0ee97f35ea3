use anyhow::{Context, Result};
use clap::Parser;
use octest_model::{Oc, Role, Scope};

/// Poll `oc get` until it succeeds.
#[derive(Debug, Parser)]
pub(crate) struct Get {
    /// Run as the regular user instead of cluster-admin.
    #[clap(long)]
    user: bool,

    /// Pass the current project to `oc`.
    #[clap(long)]
    namespaced: bool,

    /// The arguments passed to `oc get`, after `--`.
    #[clap(last = true, required = true)]
    resource: Vec<String>,
}

impl Get {
    pub(crate) async fn run(self, oc: &Oc) -> Result<()> {
        let params: Vec<&str> = self.resource.iter().map(String::as_str).collect();
        let output = oc
            .get_resource(role(self.user), scope(self.namespaced), &params)
            .await
            .context(format!("Unable to get '{}'", self.resource.join(" ")))?;
        println!("{}", output);
        Ok(())
    }
}

pub(crate) fn role(user: bool) -> Role {
    if user {
        Role::User
    } else {
        Role::Admin
    }
}

pub(crate) fn scope(namespaced: bool) -> Scope {
    if namespaced {
        Scope::Namespaced
    } else {
        Scope::ClusterWide
    }
}
