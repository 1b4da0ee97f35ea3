use crate::constants::{PROJECT_LIST_INTERVAL, PROJECT_LIST_TIMEOUT, REQUESTER_ANNOTATION};
use crate::error::Result;
use crate::oc::{Oc, Role, Scope};
use crate::tracker::{CaseResources, ResourceHandle};
use crate::wait::poll_immediate;
use log::{debug, info};
use std::collections::BTreeSet;

/// A project created for a case. `target_namespace` is the project `oc` switches to after
/// creating it.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Project {
    pub name: String,
    pub target_namespace: String,
}

impl Project {
    /// Recreate the project from scratch, track it, and switch `oc` to the target namespace.
    pub async fn create(&self, oc: &mut Oc, case: &mut CaseResources) -> Result<()> {
        oc.remove_resource(Role::Admin, Scope::ClusterWide, &["project", &self.name])
            .await?;
        oc.run("new-project", Role::Admin, Scope::ClusterWide, &[&self.name])
            .await?;
        case.add(ResourceHandle::new(oc, "project", &self.name, None));
        oc.run(
            "project",
            Role::Admin,
            Scope::ClusterWide,
            &[&self.target_namespace],
        )
        .await?;
        oc.set_namespace(&self.target_namespace);
        Ok(())
    }

    /// Create the project only if it does not exist yet, track it, and switch `oc` to it.
    pub async fn create_with_check(&self, oc: &mut Oc, case: &mut CaseResources) -> Result<()> {
        let output = oc
            .do_action("get", Role::Admin, Scope::ClusterWide, &["project", &self.name])
            .await?;
        if output.success {
            info!("project: {} already exist!", self.name);
            return Ok(());
        }

        info!(
            "Output: {}, cannot find the {} project, create one",
            output.output, self.name
        );
        oc.run(
            "adm",
            Role::Admin,
            Scope::ClusterWide,
            &["new-project", &self.name],
        )
        .await?;
        case.add(ResourceHandle::new(oc, "project", &self.name, None));
        oc.run("project", Role::Admin, Scope::ClusterWide, &[&self.name])
            .await?;
        oc.set_namespace(&self.name);
        Ok(())
    }

    /// Set the `env` label of the project's namespace.
    pub async fn label(&self, oc: &Oc, label: &str) -> Result<()> {
        let label = format!("env={}", label);
        oc.run(
            "label",
            Role::Admin,
            Scope::ClusterWide,
            &["ns", &self.name, &label],
        )
        .await
        .map(|_| ())
    }

    /// The user that requested the project, from its `openshift.io/requester` annotation.
    pub async fn requester(&self, oc: &Oc) -> Result<String> {
        let jsonpath = format!(
            "-o=jsonpath={{.metadata.annotations.{}}}",
            REQUESTER_ANNOTATION.replace('.', "\\.")
        );
        oc.run(
            "get",
            Role::Admin,
            Scope::ClusterWide,
            &["project", &self.name, &jsonpath],
        )
        .await
        .map(|requester| requester.trim().to_string())
    }

    /// The names of the projects `role` can list. `extra` is passed on to `oc get projects`,
    /// e.g. `--as=<user>`.
    pub async fn visible(oc: &Oc, role: Role, extra: &[&str]) -> Result<BTreeSet<String>> {
        let mut params = vec!["projects", "-o=jsonpath={.items[*].metadata.name}"];
        params.extend(extra);
        let output = oc.run("get", role, Scope::ClusterWide, &params).await?;
        Ok(output.split_whitespace().map(str::to_string).collect())
    }

    /// Wait until `role` lists exactly the `expected` projects.
    pub async fn expect_visible(
        oc: &Oc,
        role: Role,
        extra: &[&str],
        expected: &[&str],
    ) -> Result<()> {
        let expected: BTreeSet<String> = expected.iter().map(|name| name.to_string()).collect();
        let expected = &expected;
        let what = format!("projects {:?} to be listed", expected);
        poll_immediate(
            &what,
            PROJECT_LIST_INTERVAL,
            PROJECT_LIST_TIMEOUT,
            move || async move {
                let visible = Self::visible(oc, role, extra).await?;
                if &visible != expected {
                    debug!("listed {:?}, expected {:?}", visible, expected);
                }
                Ok(&visible == expected)
            },
        )
        .await
    }

    /// Delete the project without waiting for it to be gone.
    pub async fn delete(&self, oc: &Oc) -> Result<()> {
        oc.run(
            "delete",
            Role::Admin,
            Scope::ClusterWide,
            &["project", &self.name],
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::oc::{CommandOutput, OcConfig};

    fn project() -> Project {
        Project {
            name: "olm-test-1".to_string(),
            target_namespace: "e2e".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn create_recreates_and_switches() {
        let runner = ScriptedRunner::default();
        runner.respond(
            "delete project",
            vec![CommandOutput::failure(
                "Error from server (NotFound): projects.project.openshift.io \
                 \"olm-test-1\" not found",
            )],
        );
        runner.respond("new-project", vec![CommandOutput::success("Now using project")]);
        runner.respond("project e2e", vec![CommandOutput::success("Now using project")]);
        let mut oc = Oc::with_runner(OcConfig::default(), runner.clone());
        let mut case = CaseResources::new();
        project().create(&mut oc, &mut case).await.unwrap();

        assert_eq!(oc.namespace(), Some("e2e"));
        assert!(case.contains("olm-test-1", "project", None));
        assert_eq!(
            runner.calls(),
            vec![
                "delete project olm-test-1",
                "new-project olm-test-1",
                "project e2e"
            ]
        );
    }

    #[tokio::test]
    async fn create_with_check_skips_existing() {
        let runner = ScriptedRunner::default();
        runner.respond("get project", vec![CommandOutput::success("olm-test-1 Active")]);
        let mut oc = Oc::with_runner(OcConfig::default(), runner.clone());
        let mut case = CaseResources::new();
        project().create_with_check(&mut oc, &mut case).await.unwrap();
        assert!(case.is_empty());
        assert_eq!(oc.namespace(), None);
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn create_with_check_creates_missing() {
        let runner = ScriptedRunner::default();
        runner.respond("get project", vec![CommandOutput::failure("NotFound")]);
        runner.respond("adm new-project", vec![CommandOutput::success("Created")]);
        runner.respond("project olm-test-1", vec![CommandOutput::success("Now using")]);
        let mut oc = Oc::with_runner(OcConfig::default(), runner);
        let mut case = CaseResources::new();
        project().create_with_check(&mut oc, &mut case).await.unwrap();
        assert_eq!(oc.namespace(), Some("olm-test-1"));
        assert_eq!(case.len(), 1);
    }

    #[tokio::test]
    async fn requester_annotation() {
        let runner = ScriptedRunner::default();
        runner.respond("get project", vec![CommandOutput::success("bob\n")]);
        let oc = Oc::with_runner(OcConfig::default(), runner.clone());
        assert_eq!(project().requester(&oc).await.unwrap(), "bob");
        assert_eq!(
            runner.calls(),
            vec![
                "get project olm-test-1 \
                 -o=jsonpath={.metadata.annotations.openshift\\.io/requester}"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn listed_projects_settle() {
        let runner = ScriptedRunner::default();
        runner.respond(
            "get projects",
            vec![
                CommandOutput::success("one"),
                CommandOutput::success("one two"),
                CommandOutput::success("two one"),
            ],
        );
        let oc = Oc::with_runner(OcConfig::default(), runner.clone());
        Project::expect_visible(&oc, Role::User, &["--as=bob"], &["one", "two"])
            .await
            .unwrap();
        assert_eq!(runner.count("get projects"), 2);
        assert!(runner.calls()[0].ends_with("--as=bob"));
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_project_listed() {
        let runner = ScriptedRunner::default();
        runner.respond("get projects", vec![CommandOutput::success("one two three")]);
        let oc = Oc::with_runner(OcConfig::default(), runner);
        assert!(matches!(
            Project::expect_visible(&oc, Role::User, &[], &["one", "two"]).await,
            Err(crate::Error::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn label_namespace() {
        let runner = ScriptedRunner::default();
        runner.respond("label", vec![CommandOutput::success("labeled")]);
        let oc = Oc::with_runner(OcConfig::default(), runner.clone());
        project().label(&oc, "test-og").await.unwrap();
        assert_eq!(runner.calls(), vec!["label ns olm-test-1 env=test-og"]);
    }
}
