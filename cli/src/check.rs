use anyhow::{Context, Result};
use clap::Parser;
use octest_model::{Check, CheckMethod, Match, Oc, Role, Scope};

/// Poll until a resource satisfies a check.
#[derive(Debug, Parser)]
pub(crate) struct CheckArgs {
    /// `present` to check whether the resource exists, `expect` to check the output of `oc get`.
    method: CheckMethod,

    /// Run as `admin` or `user`.
    #[clap(long, default_value = "admin")]
    role: Role,

    /// `namespaced` passes the current project to `oc`, `cluster-wide` does not.
    #[clap(long, default_value = "cluster-wide")]
    scope: Scope,

    /// How the output is compared with `--content`: `compare` or `contain`.
    #[clap(long, default_value = "compare")]
    matcher: Match,

    /// The expected content. Alternatives can be separated by `+2+`.
    #[clap(long, default_value = "")]
    content: String,

    /// Expect the resource to be absent, or its output not to match `--content`.
    #[clap(long)]
    negate: bool,

    /// The arguments passed to `oc get`, after `--`.
    #[clap(last = true, required = true)]
    resource: Vec<String>,
}

impl CheckArgs {
    pub(crate) async fn run(self, oc: &Oc) -> Result<()> {
        let check = Check::new(
            self.method,
            self.role,
            self.scope,
            self.matcher,
            self.content,
            !self.negate,
            self.resource,
        );
        check
            .check(oc)
            .await
            .context(format!("Check {} did not pass", check))?;
        println!("{}", check);
        Ok(())
    }
}
