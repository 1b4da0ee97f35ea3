use crate::TestSettings;
use anyhow::{format_err, Context, Result};
use log::info;
use octest_model::util::random_string;
use octest_model::{ClusterClient, Oc};
use std::process::Command;
use tempfile::TempDir;

/// Represents a throwaway project on the cluster under test. The `Drop` trait is implemented
/// deleting the project when it goes out of scope.
#[derive(Debug)]
pub struct Cluster {
    project: String,
    oc: Oc,
    output_dir: TempDir,
}

impl Cluster {
    /// Creates a `Cluster` while creating a project named `e2e-test-<base_name>-<random>`.
    pub fn new(base_name: &str) -> Result<Cluster> {
        let output_dir = TempDir::new()?;
        let project = format!("e2e-test-{}-{}", base_name, random_string());
        Self::oc_command(&["new-project", &project, "--skip-config-write"])?;
        info!("created project {}", project);

        let mut config = TestSettings::oc_config();
        if TestSettings::output_dir().is_none() {
            config.output_dir = output_dir.path().to_path_buf();
        }
        let oc = Oc::new(config).with_namespace(&project);
        Ok(Self {
            project,
            oc,
            output_dir,
        })
    }

    /// The name of the project owned by this `Cluster`.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// An `oc` client whose current project is the project owned by this `Cluster`.
    pub fn oc(&self) -> Oc {
        self.oc.clone()
    }

    /// An `oc` client without a current project.
    pub fn oc_without_namespace() -> Oc {
        Oc::new(TestSettings::oc_config())
    }

    /// The directory processed templates are written to unless `OCTEST_OUTPUT_DIR` is set.
    pub fn output_dir(&self) -> &std::path::Path {
        self.output_dir.path()
    }

    /// Create the k8s client for the cluster using the admin kubeconfig.
    pub async fn cluster_client(&self) -> Result<ClusterClient> {
        Ok(match TestSettings::admin_kubeconfig() {
            Some(path) => ClusterClient::new_from_kubeconfig_path(path).await?,
            None => ClusterClient::new().await?,
        })
    }

    fn oc_command(args: &[&str]) -> Result<String> {
        let (action, params) = args.split_first().context("missing oc action")?;
        let mut command = Command::new(TestSettings::oc_config().oc_path);
        command.arg(action);
        if let Some(kubeconfig) = TestSettings::admin_kubeconfig() {
            command.arg(format!("--kubeconfig={}", kubeconfig.display()));
        }
        let output = command
            .args(params)
            .output()
            .context("unable to run oc")?;
        if !output.status.success() {
            return Err(format_err!(
                "'oc {}' failed with exit status '{}'\n\n{}\n\n{}",
                args.join(" "),
                output.status.code().unwrap_or(1),
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Drop for Cluster {
    fn drop(&mut self) {
        if let Err(e) = Self::oc_command(&["delete", "project", &self.project, "--wait=false"]) {
            eprintln!("unable to delete project '{}': {}", self.project, e)
        }
    }
}
