/*!

Descriptions of the objects an OLM conformance case creates: subscriptions, operator groups,
catalog sources, CRDs, config maps, custom resources, projects, service accounts and roles.

Each description knows how to create its object from an `oc process` template and registers the
created object with the [`CaseResources`] of the running case, so that the case can remove it
again, either explicitly or through [`CaseResources::cleanup`].

!*/

mod access;
mod platform;
mod project;
mod resources;
mod subscription;

pub use access::{RbacRole, ServiceAccount};
pub use platform::{
    explain_is_empty, find_pod_node, ipv4_catalog_sources, node_has_role, olm_commit_id, pod_node,
    ApiSource, ProvidedApi, EXPLAINED_KINDS, PROVIDED_APIS,
};
pub use project::Project;
pub use resources::{CatalogSource, ConfigMap, Crd, CustomResource, OperatorGroup};
pub use subscription::{Csv, Subscription};

use crate::constants::IGNORE_UNKNOWN_PARAMETERS;
use crate::error::Result;
use crate::oc::Oc;
#[cfg(doc)]
use crate::tracker::CaseResources;

/// Process `template` with the given `NAME=value` parameters and apply the result.
async fn apply_template(oc: &Oc, template: &str, params: &[String]) -> Result<()> {
    let mut args = vec![IGNORE_UNKNOWN_PARAMETERS, "-f", template, "-p"];
    args.extend(params.iter().map(String::as_str));
    oc.apply_resource_from_template(&args).await
}

/// Build a `--type merge` patch of `kind/name` in `namespace`.
fn merge_patch<'a>(
    kind: &'a str,
    name: &'a str,
    namespace: &'a str,
    patch: &'a str,
) -> [&'a str; 8] {
    [kind, name, "-n", namespace, "--type", "merge", "-p", patch]
}
