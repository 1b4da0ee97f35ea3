#![cfg(feature = "integ")]
use octest_model::constants::{ETCD_LEADER_CHANGES_QUERY, ROLLOUT_METRIC, ROLLOUT_PHASES};
use octest_model::wait::poll;
use octest_model::{PrometheusClient, Role, Scope};
use selftest::Cluster;
use std::time::Duration;

#[tokio::test]
async fn query_up_through_route() {
    let cluster = Cluster::new("prometheus").unwrap();
    let client = cluster.cluster_client().await.unwrap();
    let prometheus = PrometheusClient::via_route(&client).await.unwrap();
    let data = prometheus.query("up").await.unwrap();
    assert_eq!(data.result_type, "vector");
    assert!(data
        .result
        .as_array()
        .map(|samples| !samples.is_empty())
        .unwrap_or(false));
}

#[tokio::test]
async fn etcd_leader_is_stable() {
    let cluster = Cluster::new("etcd-leader").unwrap();
    let client = cluster.cluster_client().await.unwrap();
    let prometheus = PrometheusClient::via_route(&client).await.unwrap();
    let changes = prometheus
        .query(ETCD_LEADER_CHANGES_QUERY)
        .await
        .unwrap()
        .first_value()
        .unwrap();
    assert!(changes == 0.0, "etcd changed leaders {} times", changes);
}

#[tokio::test]
async fn deployment_rollouts_are_counted() {
    let _ = env_logger::builder().is_test(true).try_init();
    let cluster = Cluster::new("rollout-metrics").unwrap();
    let oc = cluster.oc();
    oc.run(
        "create",
        Role::Admin,
        Scope::Namespaced,
        &[
            "deploymentconfig",
            "rollout",
            "--image=image-registry.openshift-image-registry.svc:5000/openshift/cli:latest",
            "--",
            "sleep",
            "3600",
        ],
    )
    .await
    .unwrap();

    let client = cluster.cluster_client().await.unwrap();
    let prometheus = PrometheusClient::via_route(&client).await.unwrap();
    let query = format!(r#"{}{{namespace="{}"}}"#, ROLLOUT_METRIC, cluster.project());
    let prometheus = &prometheus;
    let query = query.as_str();
    poll(
        "the rollout to be counted as available",
        Duration::from_secs(10),
        Duration::from_secs(300),
        move || async move {
            Ok(prometheus
                .query(query)
                .await?
                .label_values("phase")
                .contains("available"))
        },
    )
    .await
    .unwrap();

    let phases = prometheus.query(ROLLOUT_METRIC).await.unwrap().label_values("phase");
    assert!(
        phases.iter().all(|phase| ROLLOUT_PHASES.contains(&phase.as_str())),
        "{:?}",
        phases
    );
}
