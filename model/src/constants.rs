use std::time::Duration;

/// Helper macro to avoid retyping the OLM API group when creating further string constants from
/// it. When given no parameters, this returns the group. When given a string literal parameter it
/// adds `/parameter` to the end.
macro_rules! operators {
    () => {
        "operators.coreos.com"
    };
    ($s:literal) => {
        concat!(operators!(), "/", $s)
    };
}

// API groups
pub const OPERATORS_GROUP: &str = operators!();
pub const PACKAGES_GROUP: &str = concat!("packages.", operators!());
pub const OPERATORS_V1: &str = operators!("v1");
pub const OPERATORS_V1ALPHA1: &str = operators!("v1alpha1");

// Namespaces
pub const OLM_NAMESPACE: &str = "openshift-operator-lifecycle-manager";
pub const MARKETPLACE_NAMESPACE: &str = "openshift-marketplace";
pub const MONITORING_NAMESPACE: &str = "openshift-monitoring";
pub const CONFIG_NAMESPACE: &str = "openshift-config";
/// Pods in namespaces with these prefixes belong to the platform and run release images.
pub const PLATFORM_NAMESPACE_PREFIXES: [&str; 2] = ["kube-", "openshift-"];

// Names of objects owned by the platform
pub const PROMETHEUS_SERVICE: &str = "prometheus-k8s";
pub const PROMETHEUS_ROUTE: &str = "prometheus-k8s";
pub const PROMETHEUS_SECRET_PREFIX: &str = "prometheus-";
pub const OLM_DEPLOYMENTS: [&str; 3] = ["catalog-operator", "olm-operator", "packageserver"];
pub const MARKETPLACE_OPERATOR: &str = "marketplace-operator";
pub const PULL_SECRET: &str = "pull-secret";
pub const PULL_SECRET_KEY: &str = ".dockerconfigjson";
pub const MASTER_ROLE_LABEL: &str = "node-role.kubernetes.io/master";
pub const SELF_PROVISIONER_ROLE: &str = "self-provisioner";
pub const REQUESTER_ANNOTATION: &str = "openshift.io/requester";
pub const OLM_CLUSTER_OPERATORS: [&str; 3] = [
    "operator-lifecycle-manager",
    "operator-lifecycle-manager-catalog",
    "operator-lifecycle-manager-packageserver",
];

// Subscription and install plan states
pub const APPROVAL_AUTOMATIC: &str = "Automatic";
pub const STATE_AT_LATEST_KNOWN: &str = "AtLatestKnown";
pub const STATE_UPGRADE_PENDING: &str = "UpgradePending";
pub const PHASE_COMPLETE: &str = "Complete";

// Prometheus queries and metrics
/// Leader changes of etcd over the last 15 minutes, 0 when no member reports the metric.
pub const ETCD_LEADER_CHANGES_QUERY: &str = "increase((max by (job) \
    (etcd_server_leader_changes_seen_total) or 0*absent(etcd_server_leader_changes_seen_total))\
    [15m:1m])";
pub const ROLLOUT_METRIC: &str = "openshift_apps_deploymentconfigs_complete_rollouts_total";
pub const ROLLOUT_PHASES: [&str; 3] = ["available", "cancelled", "failed"];

// Markers in `oc` output
pub const NOT_FOUND: &str = "NotFound";
pub const NO_RESOURCES_FOUND: &str = "No resources found";
pub const IGNORE_NOT_FOUND: &str = "--ignore-not-found";
pub const IGNORE_UNKNOWN_PARAMETERS: &str = "--ignore-unknown-parameters=true";

/// Expected content passed to a check may hold several alternatives joined by this separator. The
/// check is satisfied by any of them.
pub const ALTERNATIVE_SEPARATOR: &str = "+2+";

// Poll intervals and timeouts
pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const GET_TIMEOUT: Duration = Duration::from_secs(120);
pub const EXEC_TIMEOUT: Duration = Duration::from_secs(6);
pub const PRESENT_TIMEOUT: Duration = Duration::from_secs(60);
pub const EXPECT_TIMEOUT: Duration = Duration::from_secs(150);
pub const REMOVE_TIMEOUT: Duration = Duration::from_secs(120);
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(15);
pub const CSV_TIMEOUT: Duration = Duration::from_secs(180);
pub const APPROVE_INTERVAL: Duration = Duration::from_secs(1);
pub const INSTALL_PLAN_TIMEOUT: Duration = Duration::from_secs(10);
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(150);
pub const OBJECT_INTERVAL: Duration = Duration::from_secs(1);
pub const OBJECT_TIMEOUT: Duration = Duration::from_secs(60);
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const TEMPLATE_INTERVAL: Duration = Duration::from_secs(1);
pub const TEMPLATE_TIMEOUT: Duration = Duration::from_secs(60);
pub const TEMPLATE_DELETE_INTERVAL: Duration = Duration::from_millis(100);
pub const TEMPLATE_DELETE_TIMEOUT: Duration = Duration::from_secs(30);
pub const WATCH_EVENT_TIMEOUT: Duration = Duration::from_secs(30);
pub const WATCH_QUIET_PERIOD: Duration = Duration::from_secs(2);
pub const PROJECT_LIST_INTERVAL: Duration = Duration::from_millis(100);
pub const PROJECT_LIST_TIMEOUT: Duration = Duration::from_secs(10);

// Routes and projects
pub const ROUTE_GROUP: &str = "route.openshift.io";
pub const ROUTE_VERSION: &str = "v1";
pub const PROJECT_GROUP: &str = "project.openshift.io";
pub const PROJECT_VERSION: &str = "v1";
pub const SERVICE_ACCOUNT_TOKEN_TYPE: &str = "kubernetes.io/service-account-token";
pub const SERVICE_ACCOUNT_TOKEN_KEY: &str = "token";

#[test]
fn operators_constants_macro_test() {
    assert_eq!("operators.coreos.com", operators!());
    assert_eq!("operators.coreos.com/v1alpha1", OPERATORS_V1ALPHA1);
    assert_eq!("packages.operators.coreos.com", PACKAGES_GROUP);
}

#[test]
fn etcd_leader_changes_query_test() {
    assert_eq!(
        ETCD_LEADER_CHANGES_QUERY,
        "increase((max by (job) (etcd_server_leader_changes_seen_total) or \
         0*absent(etcd_server_leader_changes_seen_total))[15m:1m])"
    );
}
