use super::merge_patch;
use crate::constants::{AUTH_TIMEOUT, POLL_INTERVAL};
use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use crate::wait::poll;
use k8s_openapi::api::rbac::v1::Role as K8sRole;
use log::info;
use serde::Serialize;
use snafu::{OptionExt, ResultExt};
use std::path::PathBuf;

/// A service account whose definition can be saved, deleted and applied again, e.g. to check
/// that OLM restores the permissions granted to it.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
    /// Set by [`ServiceAccount::fetch_definition`].
    pub definition_file: Option<PathBuf>,
}

impl ServiceAccount {
    pub fn new<S1, S2>(name: S1, namespace: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            definition_file: None,
        }
    }

    /// Save the current definition of the service account as JSON in the output directory.
    pub async fn fetch_definition(&mut self, oc: &Oc) -> Result<()> {
        let file_name = format!("{}-{}-sa-config.json", self.namespace, self.name);
        let path = oc
            .output_to_file(
                "get",
                Role::Admin,
                Scope::ClusterWide,
                &["sa", &self.name, "-n", &self.namespace, "-o=json"],
                &file_name,
            )
            .await?;
        self.definition_file = Some(path);
        Ok(())
    }

    pub async fn delete(&self, oc: &Oc) -> Result<()> {
        oc.run(
            "delete",
            Role::Admin,
            Scope::ClusterWide,
            &["sa", &self.name, "-n", &self.namespace],
        )
        .await
        .map(|_| ())
    }

    /// Apply the definition saved by [`ServiceAccount::fetch_definition`].
    pub async fn reapply(&self, oc: &Oc) -> Result<()> {
        let definition_file = self
            .definition_file
            .as_ref()
            .context(error::EmptySnafu {
                what: format!("definition file of service account {}", self.name),
            })?
            .to_string_lossy();
        oc.run(
            "apply",
            Role::Admin,
            Scope::ClusterWide,
            &["-f", &definition_file],
        )
        .await
        .map(|_| ())
    }

    /// Wait until `oc auth can-i create <resource>` as this service account answers with
    /// `expected`, e.g. `yes` or `no`.
    pub async fn check_auth(&self, oc: &Oc, expected: &str, resource: &str) -> Result<()> {
        let user = format!("system:serviceaccount:{}:{}", self.namespace, self.name);
        let params = ["--as", user.as_str(), "can-i", "create", resource];
        let params = &params;
        let what = format!("{} to answer '{}' for creating {}", user, expected, resource);
        poll(&what, POLL_INTERVAL, AUTH_TIMEOUT, move || async move {
            let output = oc
                .do_action("auth", Role::Admin, Scope::Namespaced, params)
                .await?;
            info!("the result of checkAuth:{}", output.output);
            Ok(output.output.contains(expected))
        })
        .await
    }
}

/// A namespaced RBAC role.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct RbacRole {
    pub name: String,
    pub namespace: String,
}

/// The compact form of a policy rule that is fed back into `oc patch`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompactRule<'a> {
    api_groups: &'a [String],
    resources: &'a [String],
    verbs: &'a [String],
}

impl RbacRole {
    pub fn new<S1, S2>(name: S1, namespace: S2) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub async fn patch(&self, oc: &Oc, patch: &str) -> Result<()> {
        oc.patch_resource(
            Role::Admin,
            Scope::ClusterWide,
            &merge_patch("role", &self.name, &self.namespace, patch),
        )
        .await
    }

    /// The rules of the role as a compact JSON list, e.g.
    /// `[{"apiGroups":[""],"resources":["pods"],"verbs":["get"]}]`.
    pub async fn rules(&self, oc: &Oc) -> Result<String> {
        self.filtered_rules(oc, None).await
    }

    /// Like [`RbacRole::rules`], leaving out the rules whose first API group is `api_group`.
    pub async fn rules_without(&self, oc: &Oc, api_group: &str) -> Result<String> {
        self.filtered_rules(oc, Some(api_group)).await
    }

    async fn filtered_rules(&self, oc: &Oc, without: Option<&str>) -> Result<String> {
        let output = oc
            .get_resource(
                Role::Admin,
                Scope::ClusterWide,
                &["role", &self.name, "-n", &self.namespace, "-o=json"],
            )
            .await?;
        let rules = compact_rules(&output, without)?;
        info!("rc:{}", rules);
        Ok(rules)
    }
}

fn compact_rules(role_json: &str, without: Option<&str>) -> Result<String> {
    let role: K8sRole = serde_json::from_str(role_json).context(error::JsonParseSnafu {
        what: "role",
    })?;
    let rules = role.rules.unwrap_or_default();
    let compact: Vec<CompactRule<'_>> = rules
        .iter()
        .filter(|rule| {
            let first_group = rule
                .api_groups
                .as_ref()
                .and_then(|groups| groups.first())
                .map(String::as_str);
            without.is_none() || first_group != without
        })
        .map(|rule| CompactRule {
            api_groups: rule.api_groups.as_deref().unwrap_or_default(),
            resources: rule.resources.as_deref().unwrap_or_default(),
            verbs: &rule.verbs,
        })
        .collect();
    serde_json::to_string(&compact).context(error::JsonParseSnafu { what: "role rules" })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::oc::{CommandOutput, OcConfig};

    const ROLE: &str = r#"{
  "apiVersion": "rbac.authorization.k8s.io/v1",
  "kind": "Role",
  "metadata": {"name": "scoped", "namespace": "e2e"},
  "rules": [
    {"apiGroups": [""], "resources": ["configmaps", "secrets"], "verbs": ["get", "list"]},
    {"apiGroups": ["etcd.database.coreos.com"], "resources": ["etcdclusters"], "verbs": ["*"]},
    {"nonResourceURLs": ["/healthz"], "verbs": ["get"]}
  ]
}"#;

    #[test]
    fn all_rules() {
        assert_eq!(
            compact_rules(ROLE, None).unwrap(),
            concat!(
                r#"[{"apiGroups":[""],"resources":["configmaps","secrets"],"#,
                r#""verbs":["get","list"]},"#,
                r#"{"apiGroups":["etcd.database.coreos.com"],"resources":["etcdclusters"],"#,
                r#""verbs":["*"]},{"apiGroups":[],"resources":[],"verbs":["get"]}]"#,
            )
        );
    }

    #[test]
    fn rules_without_group() {
        assert_eq!(
            compact_rules(ROLE, Some("etcd.database.coreos.com")).unwrap(),
            concat!(
                r#"[{"apiGroups":[""],"resources":["configmaps","secrets"],"#,
                r#""verbs":["get","list"]},"#,
                r#"{"apiGroups":[],"resources":[],"verbs":["get"]}]"#,
            )
        );
    }

    #[test]
    fn no_rules() {
        let role = r#"{
            "apiVersion": "rbac.authorization.k8s.io/v1",
            "kind": "Role",
            "metadata": {"name": "empty"}
        }"#;
        assert_eq!(compact_rules(role, None).unwrap(), "[]");
    }

    #[tokio::test(start_paused = true)]
    async fn check_auth_waits_for_answer() {
        let runner = ScriptedRunner::default();
        runner.respond(
            "auth",
            vec![CommandOutput::success("no"), CommandOutput::success("yes")],
        );
        let oc = Oc::with_runner(OcConfig::default(), runner.clone()).with_namespace("e2e");
        ServiceAccount::new("scoped", "e2e")
            .check_auth(&oc, "yes", "etcdclusters")
            .await
            .unwrap();
        assert_eq!(
            runner.calls()[0],
            "auth --namespace=e2e --as system:serviceaccount:e2e:scoped can-i create etcdclusters"
        );
        assert_eq!(runner.count("auth"), 2);
    }

    #[tokio::test]
    async fn definition_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        runner.respond(
            "get sa scoped",
            vec![CommandOutput::success("{\"kind\":\"ServiceAccount\"}")],
        );
        runner.respond("apply -f", vec![CommandOutput::success("created")]);
        let oc = Oc::with_runner(
            OcConfig {
                output_dir: dir.path().to_path_buf(),
                ..OcConfig::default()
            },
            runner.clone(),
        );
        let mut sa = ServiceAccount::new("scoped", "e2e");
        assert!(sa.reapply(&oc).await.is_err());
        sa.fetch_definition(&oc).await.unwrap();
        sa.reapply(&oc).await.unwrap();
        assert_eq!(
            runner.calls().last().unwrap(),
            &format!(
                "apply -f {}",
                dir.path().join("e2e-scoped-sa-config.json").display()
            )
        );
    }
}
