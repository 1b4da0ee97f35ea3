/*!

The release payload a cluster runs. Every pod of the platform must run an image of that payload
and pull it only when it is not present on the node.

!*/

use crate::cluster::ClusterClient;
use crate::constants::PLATFORM_NAMESPACE_PREFIXES;
use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use crate::util::random_string;
use k8s_openapi::api::core::v1::{Container, Pod};
use kube::ResourceExt;
use log::{debug, warn};
use serde::Deserialize;
use snafu::ResultExt;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

pub const PULL_IF_NOT_PRESENT: &str = "IfNotPresent";
pub const RHEL_RELEASE_FILE: &str = "/etc/redhat-release";
pub const RHEL: &str = "Red Hat Enterprise Linux";

/// The parts of `oc adm release info --pullspecs -o json` the audit needs.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ReleaseInfo {
    /// The pull spec of the release image itself.
    pub image: String,
    #[serde(default)]
    pub references: ImageStream,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImageStream {
    #[serde(default)]
    pub spec: ImageStreamSpec,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ImageStreamSpec {
    #[serde(default)]
    pub tags: Vec<TagReference>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TagReference {
    pub name: String,
    #[serde(default)]
    pub from: Option<TagSource>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TagSource {
    pub kind: String,
    pub name: String,
}

impl ReleaseInfo {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context(error::JsonParseSnafu {
            what: "release info",
        })
    }

    /// Ask `oc adm release info` about the payload of the cluster, authenticating to the
    /// registry with the cluster's pull secret. The pull secret is written to the output
    /// directory of `oc` for the duration of the call.
    pub async fn fetch(oc: &Oc, cluster: &ClusterClient) -> Result<Self> {
        let secret = cluster.pull_secret().await?;
        let path = oc
            .config()
            .output_dir
            .join(format!("{}-pull-secret.json", random_string()));
        tokio::fs::write(&path, secret)
            .await
            .context(error::FileWriteSnafu { path: &path })?;
        let registry_config = path.to_string_lossy();
        let output = oc
            .run(
                "adm",
                Role::Admin,
                Scope::ClusterWide,
                &[
                    "release",
                    "info",
                    "--pullspecs",
                    "-o",
                    "json",
                    "--registry-config",
                    &registry_config,
                ],
            )
            .await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!("unable to remove '{}': {}", path.display(), e);
        }
        Self::parse(&output?)
    }

    /// The release image and the image of every tag that points at a docker image.
    pub fn images(&self) -> BTreeSet<String> {
        self.references
            .spec
            .tags
            .iter()
            .filter_map(|tag| tag.from.as_ref())
            .filter(|from| from.kind == "DockerImage")
            .map(|from| from.name.clone())
            .chain(std::iter::once(self.image.clone()))
            .collect()
    }
}

/// `true` for the namespaces the platform itself runs in.
pub fn is_platform_namespace(namespace: &str) -> bool {
    PLATFORM_NAMESPACE_PREFIXES
        .iter()
        .any(|prefix| namespace.starts_with(prefix))
}

/// `true` if the contents of `/etc/redhat-release` name RHEL, server or UBI based.
pub fn is_rhel(redhat_release: &str) -> bool {
    redhat_release.contains(RHEL)
}

/// A container of a platform pod that does not run the way the release requires.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ImageViolation {
    NotInRelease {
        pod: String,
        container: String,
        image: String,
    },
    PullPolicy {
        pod: String,
        container: String,
        policy: String,
    },
}

impl Display for ImageViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageViolation::NotInRelease {
                pod,
                container,
                image,
            } => write!(
                f,
                "{} container {} runs '{}' which is not in the release",
                pod, container, image
            ),
            ImageViolation::PullPolicy {
                pod,
                container,
                policy,
            } => write!(
                f,
                "{} container {} has imagePullPolicy '{}' instead of '{}'",
                pod, container, policy, PULL_IF_NOT_PRESENT
            ),
        }
    }
}

/// Check every init and regular container of `pod` against the `images` of the release.
pub fn audit_pod(pod: &Pod, images: &BTreeSet<String>) -> Vec<ImageViolation> {
    let pod_name = format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any());
    let spec = match &pod.spec {
        Some(spec) => spec,
        None => return Vec::new(),
    };
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .flat_map(|container| audit_container(&pod_name, container, images))
        .collect()
}

fn audit_container(
    pod: &str,
    container: &Container,
    images: &BTreeSet<String>,
) -> Vec<ImageViolation> {
    let mut violations = Vec::new();
    let image = container.image.clone().unwrap_or_default();
    debug!("{} container {} runs {}", pod, container.name, image);
    if !images.contains(&image) {
        violations.push(ImageViolation::NotInRelease {
            pod: pod.to_string(),
            container: container.name.clone(),
            image,
        });
    }
    let policy = container.image_pull_policy.clone().unwrap_or_default();
    if policy != PULL_IF_NOT_PRESENT {
        violations.push(ImageViolation::PullPolicy {
            pod: pod.to_string(),
            container: container.name.clone(),
            policy,
        });
    }
    violations
}
