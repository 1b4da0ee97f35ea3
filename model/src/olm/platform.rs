//! Facts about the OLM installation of the cluster itself.

use crate::constants::{OPERATORS_GROUP, PACKAGES_GROUP};
use crate::constants::NO_RESOURCES_FOUND;
use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use log::debug;
use regex::Regex;
use snafu::{ensure, OptionExt, ResultExt};

const IPV4: &str =
    r"(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)(\.(25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)){3}";

/// How an OLM API is served.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ApiSource {
    /// By an aggregated API server registered through an `APIService`.
    ApiService,
    /// By a `CustomResourceDefinition`.
    Crd,
}

/// An API that OLM installs into the cluster.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ProvidedApi {
    pub source: ApiSource,
    pub group: &'static str,
    pub version: &'static str,
    pub plural: &'static str,
}

pub const PROVIDED_APIS: [ProvidedApi; 6] = [
    ProvidedApi {
        source: ApiSource::ApiService,
        group: PACKAGES_GROUP,
        version: "v1",
        plural: "packagemanifests",
    },
    ProvidedApi {
        source: ApiSource::Crd,
        group: OPERATORS_GROUP,
        version: "v1",
        plural: "operatorgroups",
    },
    ProvidedApi {
        source: ApiSource::Crd,
        group: OPERATORS_GROUP,
        version: "v1alpha1",
        plural: "clusterserviceversions",
    },
    ProvidedApi {
        source: ApiSource::Crd,
        group: OPERATORS_GROUP,
        version: "v1alpha1",
        plural: "catalogsources",
    },
    ProvidedApi {
        source: ApiSource::Crd,
        group: OPERATORS_GROUP,
        version: "v1alpha1",
        plural: "installplans",
    },
    ProvidedApi {
        source: ApiSource::Crd,
        group: OPERATORS_GROUP,
        version: "v1alpha1",
        plural: "subscriptions",
    },
];

/// The kinds `oc explain` must describe.
pub const EXPLAINED_KINDS: [&str; 6] = [
    "InstallPlan",
    "ClusterServiceVersion",
    "Subscription",
    "CatalogSource",
    "OperatorGroup",
    "PackageManifest",
];

impl ProvidedApi {
    /// Verify that the API is installed at `version`. An `APIService` must report the version as
    /// its `spec.version`; a CRD must serve and store it.
    pub async fn verify(&self, oc: &Oc) -> Result<()> {
        match self.source {
            ApiSource::ApiService => {
                let name = format!("{}.{}", self.version, self.group);
                let raw = oc
                    .run(
                        "get",
                        Role::Admin,
                        Scope::Namespaced,
                        &["apiservices", &name, "-o=jsonpath={.spec.version}"],
                    )
                    .await?;
                ensure!(
                    raw == self.version,
                    error::CheckFailedSnafu {
                        description: format!(
                            "apiservice {} reports version '{}' instead of '{}'",
                            name, raw, self.version
                        )
                    }
                );
            }
            ApiSource::Crd => {
                let name = format!("{}.{}", self.plural, self.group);
                let jsonpath = format!(
                    "-o=jsonpath={{.spec.versions[?(@.name==\"{}\")]}}",
                    self.version
                );
                let raw = oc
                    .run("get", Role::Admin, Scope::Namespaced, &["crds", &name, &jsonpath])
                    .await?;
                ensure!(
                    is_served_and_stored(&raw),
                    error::CheckFailedSnafu {
                        description: format!(
                            "crd {} does not serve and store {}: {}",
                            name, self.version, raw
                        )
                    }
                );
            }
        }
        Ok(())
    }
}

/// `oc` prints a version entry either as a Go map or as JSON depending on its release.
fn is_served_and_stored(version_entry: &str) -> bool {
    let compact: String = version_entry
        .chars()
        .filter(|c| *c != '"' && !c.is_whitespace())
        .collect();
    compact.contains("served:true") && compact.contains("storage:true")
}

/// `true` if `oc explain` printed an empty description.
pub fn explain_is_empty(explanation: &str) -> bool {
    explanation.contains("<empty>")
}

/// The names of the catalog sources in a `<name>,<address>` per line listing whose address host
/// is an IPv4 address.
pub fn ipv4_catalog_sources(listing: &str) -> Result<Vec<String>> {
    let ipv4 = Regex::new(IPV4).context(error::RegexSnafu)?;
    Ok(listing
        .lines()
        .filter_map(|line| line.split_once(','))
        .filter(|(_, address)| {
            let host = address.split(':').next().unwrap_or_default();
            ipv4.is_match(host)
        })
        .map(|(name, _)| name.to_string())
        .collect())
}

/// Extract the git commit from the output of `olm --version`, which ends with
/// `git commit: <sha>`. Returns `None` unless it is a full 40 character commit id.
pub fn olm_commit_id(version_output: &str) -> Option<String> {
    let commit = version_output.rsplit(':').next()?.trim();
    debug!("olm source git commit ID:{}", commit);
    (commit.len() == 40 && commit.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| commit.to_string())
}

/// The full name and node of the first pod in an `oc get pods -o wide` listing whose line
/// mentions `pod`.
pub fn pod_node(wide_listing: &str, pod: &str) -> Option<(String, String)> {
    wide_listing
        .lines()
        .filter(|line| line.contains(pod))
        .find_map(|line| {
            // NAME READY STATUS RESTARTS AGE IP NODE ...
            let fields: Vec<&str> = line.split_whitespace().collect();
            Some((fields.first()?.to_string(), fields.get(6)?.to_string()))
        })
}

/// `true` if the roles column of an `oc get node --show-labels --no-headers` line holds `role`.
pub fn node_has_role(node_listing: &str, role: &str) -> bool {
    node_listing
        .split_whitespace()
        .any(|field| field.split(',').any(|r| r == role))
}

/// Find the node the pod whose name contains `pod` runs on in `namespace`. Returns the full pod
/// name and the node name.
pub async fn find_pod_node(oc: &Oc, namespace: &str, pod: &str) -> Result<(String, String)> {
    let listing = oc
        .get_resource(
            Role::Admin,
            Scope::ClusterWide,
            &["pods", "-n", namespace, "-o", "wide"],
        )
        .await?;
    ensure!(
        !listing.contains(NO_RESOURCES_FOUND),
        error::NotFoundSnafu {
            what: format!("pods in {}", namespace),
        }
    );
    let (name, node) = pod_node(&listing, pod).context(error::NotFoundSnafu {
        what: format!("pod {} in {}", pod, namespace),
    })?;
    debug!("pod {} runs on {}", name, node);
    Ok((name, node))
}
