use octest_model::OcConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Test settings provides a way to send arguments into the Rust tests using environment variables.
pub struct TestSettings {}

impl TestSettings {
    /// The `oc` configuration the suites run with.
    pub fn oc_config() -> OcConfig {
        OcConfig {
            oc_path: TEST_SETTINGS.oc_path.clone(),
            kubeconfig: TEST_SETTINGS.kubeconfig.clone(),
            admin_kubeconfig: TEST_SETTINGS.admin_kubeconfig.clone(),
            output_dir: TEST_SETTINGS
                .output_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }

    /// The directory holding the templates the suites process, e.g. `operatorgroup.yaml`.
    pub fn fixture_dir() -> &'static Path {
        TEST_SETTINGS.fixture_dir.as_path()
    }

    /// The path of the fixture `name` in [`TestSettings::fixture_dir`].
    pub fn fixture(name: &str) -> String {
        Self::fixture_dir().join(name).to_string_lossy().into_owned()
    }

    /// The output directory set through `OCTEST_OUTPUT_DIR`, if any.
    pub fn output_dir() -> Option<&'static Path> {
        TEST_SETTINGS.output_dir.as_deref()
    }

    /// The kubeconfig used for cluster-admin operations, if one was given.
    pub fn admin_kubeconfig() -> Option<&'static Path> {
        TEST_SETTINGS
            .admin_kubeconfig
            .as_deref()
            .or(TEST_SETTINGS.kubeconfig.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct Inner {
    /// The path to the `oc` binary. Defaults to `oc` (i.e. by default the binary is expected to be
    /// found via `$PATH`).
    ///
    /// # Example
    ///
    /// ```text
    /// OCTEST_OC_PATH=/wherever/oc
    /// ```
    #[serde(default = "oc")]
    oc_path: String,
    /// The kubeconfig of a regular user, e.g. `OCTEST_KUBECONFIG=/home/me/.kube/user`.
    #[serde(default)]
    kubeconfig: Option<PathBuf>,
    /// The kubeconfig of a cluster-admin. Defaults to `OCTEST_KUBECONFIG`.
    #[serde(default)]
    admin_kubeconfig: Option<PathBuf>,
    /// Where processed templates are written. Each [`Cluster`](crate::Cluster) uses its own
    /// temporary directory when this is not set.
    #[serde(default)]
    output_dir: Option<PathBuf>,
    /// Defaults to `testdata/olm` in the working directory.
    #[serde(default = "fixture_dir")]
    fixture_dir: PathBuf,
}

lazy_static::lazy_static! {
    static ref TEST_SETTINGS: Inner =
        envy::prefixed("OCTEST_")
            .from_env::<Inner>()
            .expect("Error parsing TestSettings environment variables");
}

/// We need this to provide a default for serde.
fn oc() -> String {
    String::from("oc")
}

fn fixture_dir() -> PathBuf {
    PathBuf::from("testdata").join("olm")
}
