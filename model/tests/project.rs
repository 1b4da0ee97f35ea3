#![cfg(feature = "integ")]
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::{ClusterRoleBinding, RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use octest_model::oauth::{cluster_role_scope, ScopedToken, USER_LIST_SCOPED_PROJECTS};
use octest_model::olm::Project;
use octest_model::util::random_string;
use octest_model::wait::poll;
use octest_model::{
    CaseResources, Check, ClusterClient, EventKind, Match, Oc, ResourceHandle, Role, Scope,
};
use selftest::{Cluster, TestSettings};
use std::time::Duration;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Create a project as admin and track it.
async fn admin_project(oc: &Oc, case: &mut CaseResources, base_name: &str) -> String {
    let name = format!("e2e-test-{}-{}", base_name, random_string());
    oc.run(
        "adm",
        Role::Admin,
        Scope::ClusterWide,
        &["new-project", &name],
    )
    .await
    .unwrap();
    case.add(ResourceHandle::new(oc, "project", &name, None));
    name
}

async fn grant(oc: &Oc, role: &str, user: &str, project: &str) {
    oc.run(
        "adm",
        Role::Admin,
        Scope::ClusterWide,
        &["policy", "add-role-to-user", role, user, "-n", project],
    )
    .await
    .unwrap();
}

async fn revoke(oc: &Oc, role: &str, user: &str, project: &str) {
    oc.run(
        "adm",
        Role::Admin,
        Scope::ClusterWide,
        &["policy", "remove-role-from-user", role, user, "-n", project],
    )
    .await
    .unwrap();
}

async fn can_i(oc: &Oc, user: &str, verb: &str, resource: &str, project: &str) -> bool {
    let impersonate = format!("--as={}", user);
    let output = oc
        .do_action(
            "auth",
            Role::Admin,
            Scope::ClusterWide,
            &["can-i", verb, resource, "-n", project, &impersonate],
        )
        .await
        .unwrap();
    output.output.trim() == "yes"
}

async fn watch_as(user: &str, field_selector: Option<&str>) -> octest_model::ProjectEvents {
    ClusterClient::impersonating(TestSettings::admin_kubeconfig(), user)
        .await
        .unwrap()
        .watch_projects(field_selector, "0")
        .await
        .unwrap()
}

#[tokio::test]
async fn namespace_is_visible_as_project() {
    let cluster = Cluster::new("project-api").unwrap();
    let client = cluster.cluster_client().await.unwrap();
    let name = format!("e2e-test-ns-{}", random_string());
    let namespaces: Api<Namespace> = Api::all(client.k8s_client());
    let mut namespace = Namespace::default();
    namespace.metadata.name = Some(name.clone());
    namespaces
        .create(&PostParams::default(), &namespace)
        .await
        .unwrap();

    let oc = cluster.oc();
    let result = Check::expect(
        Match::Compare,
        name.as_str(),
        true,
        ["project", name.as_str(), "-o=jsonpath={.metadata.name}"],
    )
    .check(&oc)
    .await;
    namespaces
        .delete(&name, &Default::default())
        .await
        .unwrap();
    result.unwrap();
}

#[tokio::test]
async fn project_create_label_delete() {
    let cluster = Cluster::new("project-label").unwrap();
    let mut oc = cluster.oc();
    let mut case = CaseResources::new();
    let project = Project {
        name: format!("e2e-test-label-{}", random_string()),
        target_namespace: cluster.project().to_string(),
    };
    project.create_with_check(&mut oc, &mut case).await.unwrap();
    assert_eq!(oc.namespace(), Some(project.name.as_str()));
    project.label(&oc, "octest").await.unwrap();
    Check::expect(
        Match::Compare,
        "octest",
        true,
        [
            "project",
            project.name.as_str(),
            "-o=jsonpath={.metadata.labels.env}",
        ],
    )
    .check(&oc)
    .await
    .unwrap();
    case.cleanup().await.unwrap();
    Check::present(false, ["project", project.name.as_str()])
        .check(&oc)
        .await
        .unwrap();
}

#[tokio::test]
async fn project_watch_follows_access() {
    init_logger();
    let oc = Cluster::oc_without_namespace();
    let mut case = CaseResources::new();
    let user = format!("octest-watcher-{}", random_string());
    let mut events = watch_as(&user, None).await;

    let one = admin_project(&oc, &mut case, "watch-one").await;
    grant(&oc, "admin", &user, &one).await;
    events.wait_for(EventKind::Added, &one).await.unwrap();

    let two = admin_project(&oc, &mut case, "watch-two").await;
    grant(&oc, "admin", &user, &two).await;
    events.wait_for_only(EventKind::Added, &two).await.unwrap();

    // A project the user has no role in stays invisible.
    let three = admin_project(&oc, &mut case, "watch-three").await;
    events.expect_quiet(None).await.unwrap();

    revoke(&oc, "admin", &user, &one).await;
    events.wait_for_only(EventKind::Deleted, &one).await.unwrap();

    grant(&oc, "view", &user, &three).await;
    events.wait_for_only(EventKind::Added, &three).await.unwrap();

    case.remove(&two, "project", None).await.unwrap();
    events.wait_for_only(EventKind::Deleted, &two).await.unwrap();
    case.cleanup().await.unwrap();
}

#[tokio::test]
async fn project_watch_with_field_selector() {
    init_logger();
    let oc = Cluster::oc_without_namespace();
    let mut case = CaseResources::new();
    let user = format!("octest-selector-{}", random_string());
    let one = admin_project(&oc, &mut case, "select-one").await;
    let two = admin_project(&oc, &mut case, "select-two").await;
    let selector = format!("metadata.name={}", one);
    let mut events = watch_as(&user, Some(&selector)).await;

    grant(&oc, "admin", &user, &two).await;
    events.expect_quiet(None).await.unwrap();

    grant(&oc, "admin", &user, &one).await;
    events.wait_for_only(EventKind::Added, &one).await.unwrap();

    // Deleting the other project must not show up.
    case.remove(&two, "project", None).await.unwrap();
    events.expect_quiet(None).await.unwrap();

    case.remove(&one, "project", None).await.unwrap();
    events.wait_for_only(EventKind::Deleted, &one).await.unwrap();
    case.cleanup().await.unwrap();
}

#[tokio::test]
async fn scoped_token_lists_scoped_projects() {
    init_logger();
    let oc = Cluster::oc_without_namespace();
    let mut case = CaseResources::new();
    let user = format!("octest-scoped-{}", random_string());
    oc.run("create", Role::Admin, Scope::ClusterWide, &["user", &user])
        .await
        .unwrap();
    case.add(ResourceHandle::new(&oc, "user", &user, None));
    let one = admin_project(&oc, &mut case, "scoped-one").await;
    let two = admin_project(&oc, &mut case, "scoped-two").await;
    let three = admin_project(&oc, &mut case, "scoped-three").await;
    for project in [&one, &two, &three] {
        grant(&oc, "admin", &user, project).await;
    }

    let impersonate = format!("--as={}", user);
    Project::expect_visible(
        &oc,
        Role::Admin,
        &[impersonate.as_str()],
        &[one.as_str(), two.as_str(), three.as_str()],
    )
    .await
    .unwrap();

    let scopes = [
        USER_LIST_SCOPED_PROJECTS.to_string(),
        cluster_role_scope("view", &one),
        cluster_role_scope("view", &two),
    ];
    let token = ScopedToken::create(&oc, &mut case, &user, &scopes)
        .await
        .unwrap();
    let scoped = token.oc(&oc).await.unwrap();
    Project::expect_visible(&scoped, Role::User, &[], &[one.as_str(), two.as_str()])
        .await
        .unwrap();

    // The view scope does not let the token change anything.
    let output = scoped
        .do_action(
            "create",
            Role::User,
            Scope::ClusterWide,
            &["configmap", "scoped", "-n", &one],
        )
        .await
        .unwrap();
    assert!(!output.success, "{}", output.output);
    case.cleanup().await.unwrap();
}

#[tokio::test]
async fn invalid_role_refs_do_not_block_authorization() {
    init_logger();
    let cluster = Cluster::new("invalid-refs").unwrap();
    let client = cluster.cluster_client().await.unwrap();
    let oc = cluster.oc();
    let user = format!("octest-refs-{}", random_string());
    let subject = Subject {
        kind: "User".to_string(),
        name: user.clone(),
        api_group: Some("rbac.authorization.k8s.io".to_string()),
        ..Subject::default()
    };

    let binding_name = format!("missing-role-{}", random_string());
    let bindings: Api<RoleBinding> = Api::namespaced(client.k8s_client(), cluster.project());
    bindings
        .create(
            &PostParams::default(),
            &RoleBinding {
                metadata: ObjectMeta {
                    name: Some(binding_name.clone()),
                    ..ObjectMeta::default()
                },
                role_ref: RoleRef {
                    api_group: "rbac.authorization.k8s.io".to_string(),
                    kind: "Role".to_string(),
                    name: "a-role-that-does-not-exist".to_string(),
                },
                subjects: Some(vec![subject.clone()]),
            },
        )
        .await
        .unwrap();
    let cluster_bindings: Api<ClusterRoleBinding> = Api::all(client.k8s_client());
    cluster_bindings
        .create(
            &PostParams::default(),
            &ClusterRoleBinding {
                metadata: ObjectMeta {
                    name: Some(binding_name.clone()),
                    ..ObjectMeta::default()
                },
                role_ref: RoleRef {
                    api_group: "rbac.authorization.k8s.io".to_string(),
                    kind: "ClusterRole".to_string(),
                    name: "a-cluster-role-that-does-not-exist".to_string(),
                },
                subjects: Some(vec![subject]),
            },
        )
        .await
        .unwrap();
    let mut case = CaseResources::new();
    case.add(ResourceHandle::new(
        &oc,
        "clusterrolebinding",
        &binding_name,
        None,
    ));

    assert!(!can_i(&oc, &user, "get", "pods", cluster.project()).await);
    grant(&oc, "view", &user, cluster.project()).await;
    let oc_ref = &oc;
    let user_ref = user.as_str();
    let project = cluster.project();
    poll(
        "view to take effect next to dangling bindings",
        Duration::from_secs(1),
        Duration::from_secs(30),
        move || async move { Ok(can_i(oc_ref, user_ref, "get", "pods", project).await) },
    )
    .await
    .unwrap();
    case.cleanup().await.unwrap();
}

#[tokio::test]
async fn unprivileged_user_requests_project() {
    init_logger();
    let oc = Cluster::oc_without_namespace();
    let mut case = CaseResources::new();
    let name = format!("e2e-test-requested-{}", random_string());
    oc.run(
        "new-project",
        Role::User,
        Scope::ClusterWide,
        &[&name, "--skip-config-write"],
    )
    .await
    .unwrap();
    case.add(ResourceHandle::new(&oc, "project", &name, None));

    let requester = oc
        .run("whoami", Role::User, Scope::ClusterWide, &[])
        .await
        .unwrap();
    let project = Project {
        name: name.clone(),
        target_namespace: name.clone(),
    };
    assert_eq!(project.requester(&oc).await.unwrap(), requester.trim());

    let again = oc
        .do_action(
            "new-project",
            Role::User,
            Scope::ClusterWide,
            &[&name, "--skip-config-write"],
        )
        .await
        .unwrap();
    assert!(!again.success);
    assert!(again.output.contains("already exists"), "{}", again.output);
    case.cleanup().await.unwrap();
}
