/*!

A thin wrapper around the `oc` binary. Every cluster interaction of the conformance suites goes
through [`Oc`], which decides which kubeconfig is used and whether the current project is passed
along, and hands the final argument vector to a [`CommandRunner`].

!*/

mod actions;

pub use actions::content_matches;

use crate::error::{self, Result};
use async_trait::async_trait;
use log::{debug, trace};
use serde::Deserialize;
use snafu::{ensure, ResultExt};
use std::fmt::Debug;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

/// Which identity an `oc` invocation runs as.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Use the cluster-admin kubeconfig.
    Admin,
    /// Use the regular user kubeconfig.
    User,
}

serde_plain::derive_fromstr_from_deserialize!(Role);

/// Whether the current project is passed to an `oc` invocation with `--namespace`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    /// Add `--namespace=<current project>` when a project is set.
    Namespaced,
    /// Never add `--namespace`. The caller passes `-n` itself when needed.
    ClusterWide,
}

serde_plain::derive_fromstr_from_deserialize!(Scope);

/// The result of running `oc`. `output` holds stdout followed by stderr, trimmed.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success<S: Into<String>>(output: S) -> Self {
        Self {
            success: true,
            code: Some(0),
            output: output.into(),
        }
    }

    pub fn failure<S: Into<String>>(output: S) -> Self {
        Self {
            success: false,
            code: Some(1),
            output: output.into(),
        }
    }

    /// Returns the output if the command succeeded, otherwise an [`Error::Command`].
    ///
    /// [`Error::Command`]: crate::Error::Command
    pub fn into_result(self, action: &str) -> Result<String> {
        ensure!(
            self.success,
            error::CommandSnafu {
                action,
                code: self.code,
                output: self.output,
            }
        );
        Ok(self.output)
    }
}

/// Executes `oc` with a prepared argument vector. The purpose of the trait is to allow injection
/// of a scripted runner so the polling and bookkeeping logic can be tested without a cluster. In
/// practice you will use [`ProcessRunner`].
#[async_trait]
pub trait CommandRunner: Debug + Send + Sync {
    /// Run `program` with `args` and collect its output. An error is returned only if the process
    /// could not be run at all; a non-zero exit is reported through [`CommandOutput::success`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Runs `oc` as a child process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .context(error::SpawnSnafu { command: program })?;
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            output: combined.trim().to_string(),
        })
    }
}

/// Where to find `oc` and the kubeconfig files it should use.
#[derive(Debug, Clone, Deserialize, Eq, PartialEq)]
pub struct OcConfig {
    /// The path or name of the `oc` binary. Defaults to `oc` (i.e. the binary is found via
    /// `$PATH`).
    #[serde(default = "oc")]
    pub oc_path: String,
    /// The kubeconfig used for `Role::User`. When absent, `oc` falls back to its own discovery.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    /// The kubeconfig used for `Role::Admin`. Defaults to `kubeconfig`.
    #[serde(default)]
    pub admin_kubeconfig: Option<PathBuf>,
    /// The directory that processed templates and fetched definitions are written to.
    #[serde(default = "std::env::temp_dir")]
    pub output_dir: PathBuf,
}

impl Default for OcConfig {
    fn default() -> Self {
        Self {
            oc_path: oc(),
            kubeconfig: None,
            admin_kubeconfig: None,
            output_dir: std::env::temp_dir(),
        }
    }
}

impl OcConfig {
    fn kubeconfig_for(&self, role: Role) -> Option<&PathBuf> {
        match role {
            Role::Admin => self.admin_kubeconfig.as_ref().or(self.kubeconfig.as_ref()),
            Role::User => self.kubeconfig.as_ref(),
        }
    }
}

/// We need this to provide a default for serde.
fn oc() -> String {
    String::from("oc")
}

/// The `oc` client. Cloning is cheap; clones share the runner and configuration but each carries
/// its own current project.
#[derive(Debug, Clone)]
pub struct Oc {
    runner: Arc<dyn CommandRunner>,
    config: Arc<OcConfig>,
    namespace: Option<String>,
}

impl Oc {
    /// Create an `Oc` that runs the real `oc` binary.
    pub fn new(config: OcConfig) -> Self {
        Self::with_runner(config, ProcessRunner)
    }

    /// Create an `Oc` that hands its invocations to `runner`.
    pub fn with_runner<R>(config: OcConfig, runner: R) -> Self
    where
        R: CommandRunner + 'static,
    {
        Self {
            runner: Arc::new(runner),
            config: Arc::new(config),
            namespace: None,
        }
    }

    pub fn config(&self) -> &OcConfig {
        &self.config
    }

    /// The current project, if one is set.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn set_namespace<S: Into<String>>(&mut self, namespace: S) {
        self.namespace = Some(namespace.into());
    }

    /// A clone of this client with `namespace` as its current project.
    pub fn with_namespace<S: Into<String>>(&self, namespace: S) -> Self {
        let mut oc = self.clone();
        oc.set_namespace(namespace);
        oc
    }

    /// A client running through the same runner with another configuration and no current
    /// project.
    pub fn with_config(&self, config: OcConfig) -> Self {
        Self {
            runner: Arc::clone(&self.runner),
            config: Arc::new(config),
            namespace: None,
        }
    }

    /// Build the argument vector for `oc <action>`.
    pub fn args(&self, action: &str, role: Role, scope: Scope, params: &[&str]) -> Vec<String> {
        let mut args = vec![action.to_string()];
        if let Some(kubeconfig) = self.config.kubeconfig_for(role) {
            args.push(format!("--kubeconfig={}", kubeconfig.display()));
        }
        if let (Scope::Namespaced, Some(namespace)) = (scope, &self.namespace) {
            args.push(format!("--namespace={}", namespace));
        }
        args.extend(params.iter().map(|param| param.to_string()));
        args
    }

    /// Run `oc <action>` and return its output whether or not it succeeded.
    pub async fn do_action(
        &self,
        action: &str,
        role: Role,
        scope: Scope,
        params: &[&str],
    ) -> Result<CommandOutput> {
        let args = self.args(action, role, scope, params);
        debug!("Running: {} {}", self.config.oc_path, args.join(" "));
        let output = self.runner.run(&self.config.oc_path, &args).await?;
        trace!("oc {} returned {:?}", action, output);
        Ok(output)
    }

    /// Run `oc <action>` and return its output, failing if `oc` did not succeed.
    pub async fn run(
        &self,
        action: &str,
        role: Role,
        scope: Scope,
        params: &[&str],
    ) -> Result<String> {
        self.do_action(action, role, scope, params)
            .await?
            .into_result(action)
    }

    /// Run `oc <action>`, require success and write its output to `file_name` in the configured
    /// output directory. Returns the path of the written file.
    pub async fn output_to_file(
        &self,
        action: &str,
        role: Role,
        scope: Scope,
        params: &[&str],
        file_name: &str,
    ) -> Result<PathBuf> {
        let output = self.run(action, role, scope, params).await?;
        let path = self.config.output_dir.join(file_name);
        tokio::fs::write(&path, output)
            .await
            .context(error::FileWriteSnafu { path: &path })?;
        Ok(path)
    }
}
