use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use log::info;
use regex::Regex;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};

/// Released `oc` builds report a version like `4.5.0-202005291417-9933eb9`, optionally prefixed by
/// `openshift-clients-`.
const RELEASE_CLIENT_VERSION: &str =
    r"(openshift-clients-)?[\d]+\.[\d]+\.[\d]+-[\d]{12}(-[\w]+)?";

/// Build information of one side of `oc version -o json`.
#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BuildVersion {
    #[serde(default)]
    pub build_date: String,
    #[serde(default)]
    pub compiler: String,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub git_tree_state: String,
    #[serde(default)]
    pub git_version: String,
    #[serde(default)]
    pub go_version: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub minor: String,
    #[serde(default)]
    pub platform: String,
}

/// The output of `oc version -o json`. The server side is missing when `oc` cannot reach a
/// cluster.
#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub client_version: BuildVersion,
    #[serde(default)]
    pub openshift_version: Option<String>,
    #[serde(default)]
    pub server_version: Option<BuildVersion>,
}

impl VersionInfo {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context(error::JsonParseSnafu {
            what: "oc version",
        })
    }
}

/// `true` if `git_version` has the shape of a released `oc` client.
pub fn is_release_client_version(git_version: &str) -> Result<bool> {
    let regex = Regex::new(RELEASE_CLIENT_VERSION).context(error::RegexSnafu)?;
    Ok(regex.is_match(git_version))
}

impl Oc {
    /// Run `oc version -o json` as admin.
    pub async fn version(&self) -> Result<VersionInfo> {
        let output = self
            .run("version", Role::Admin, Scope::ClusterWide, &["-o=json"])
            .await?;
        VersionInfo::parse(&output)
    }

    /// The Kubernetes version of the cluster without its leading `v`, e.g. `1.24.0+b3b4e15`.
    pub async fn kubernetes_version(&self) -> Result<String> {
        let git_version = self
            .version()
            .await?
            .server_version
            .map(|server| server.git_version)
            .filter(|git_version| !git_version.is_empty())
            .context(error::MissingFieldSnafu {
                field: "serverVersion.gitVersion",
                what: "oc version",
            })?;
        info!("gitVersion is {}", git_version);
        Ok(git_version.trim_start_matches('v').to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::oc::{CommandOutput, OcConfig};

    const VERSION_JSON: &str = r#"{
  "clientVersion": {
    "major": "",
    "minor": "",
    "gitVersion": "openshift-clients-4.5.0-202005291417-9933eb9",
    "gitCommit": "9933eb9",
    "gitTreeState": "clean",
    "buildDate": "2020-05-29T14:17:21Z",
    "goVersion": "go1.13.4",
    "compiler": "gc",
    "platform": "linux/amd64"
  },
  "serverVersion": {
    "major": "1",
    "minor": "18+",
    "gitVersion": "v1.18.3+a637491",
    "gitCommit": "a637491",
    "gitTreeState": "clean",
    "buildDate": "2020-06-01T14:35:44Z",
    "goVersion": "go1.13.4",
    "compiler": "gc",
    "platform": "linux/amd64"
  },
  "openshiftVersion": "4.5.0"
}"#;

    #[test]
    fn parse_version() {
        let info = VersionInfo::parse(VERSION_JSON).unwrap();
        assert_eq!(info.openshift_version.as_deref(), Some("4.5.0"));
        assert_eq!(info.server_version.unwrap().minor, "18+");
        assert!(is_release_client_version(&info.client_version.git_version).unwrap());
    }

    #[test]
    fn client_version_shapes() {
        assert!(is_release_client_version("4.6.0-202010061132-4bc4f26").unwrap());
        assert!(!is_release_client_version("v4.2.0-alpha.0-dirty").unwrap());
    }

    #[test]
    fn client_only() {
        let info = VersionInfo::parse(r#"{"clientVersion": {"gitVersion": "4.6.0"}}"#).unwrap();
        assert!(info.server_version.is_none());
    }

    #[tokio::test]
    async fn kubernetes_version_strips_prefix() {
        let runner = ScriptedRunner::default();
        runner.respond("version -o=json", vec![CommandOutput::success(VERSION_JSON)]);
        let oc = Oc::with_runner(OcConfig::default(), runner);
        assert_eq!(oc.kubernetes_version().await.unwrap(), "1.18.3+a637491");
    }
}
