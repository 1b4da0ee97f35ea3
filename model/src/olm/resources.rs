use super::{apply_template, merge_patch};
use crate::constants::NO_RESOURCES_FOUND;
use crate::error::Result;
use crate::oc::{Oc, Role, Scope};
use crate::tracker::{CaseResources, ResourceHandle};
use log::info;

/// A cluster scoped CustomResourceDefinition created from a template taking `NAME`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Crd {
    pub name: String,
    pub template: String,
}

impl Crd {
    pub async fn create(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        apply_template(oc, &self.template, &[format!("NAME={}", self.name)]).await?;
        case.add(ResourceHandle::new(oc, "crd", &self.name, None));
        Ok(())
    }

    /// Remove the CRD directly, without going through the tracker.
    pub async fn delete(&self, oc: &Oc) -> Result<()> {
        oc.remove_resource(Role::Admin, Scope::ClusterWide, &["crd", &self.name])
            .await
    }
}

/// A config map created from a template taking `NAME` and `NAMESPACE`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ConfigMap {
    pub name: String,
    pub namespace: String,
    pub template: String,
}

impl ConfigMap {
    pub async fn create(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let params = [
            format!("NAME={}", self.name),
            format!("NAMESPACE={}", self.namespace),
        ];
        apply_template(oc, &self.template, &params).await?;
        case.add(ResourceHandle::new(oc, "cm", &self.name, Some(&self.namespace)));
        Ok(())
    }

    pub async fn patch(&self, oc: &Oc, patch: &str) -> Result<()> {
        oc.patch_resource(
            Role::Admin,
            Scope::ClusterWide,
            &merge_patch("cm", &self.name, &self.namespace, patch),
        )
        .await
    }
}

/// A catalog source. `display_name` and `publisher` are passed quoted since they usually hold
/// spaces.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CatalogSource {
    pub name: String,
    pub namespace: String,
    pub display_name: String,
    pub publisher: String,
    /// e.g. `grpc`.
    pub source_type: String,
    /// The index image or `host:port` of the registry.
    pub address: String,
    pub template: String,
    pub priority: i32,
}

impl CatalogSource {
    pub async fn create(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let params = [
            format!("NAME={}", self.name),
            format!("NAMESPACE={}", self.namespace),
            format!("ADDRESS={}", self.address),
            format!("DISPLAYNAME=\"{}\"", self.display_name),
            format!("PUBLISHER=\"{}\"", self.publisher),
            format!("SOURCETYPE={}", self.source_type),
        ];
        apply_template(oc, &self.template, &params).await?;
        case.add(ResourceHandle::new(
            oc,
            "catsrc",
            &self.name,
            Some(&self.namespace),
        ));
        Ok(())
    }

    pub async fn delete(&self, case: &mut CaseResources) -> Result<()> {
        case.remove(&self.name, "catsrc", Some(&self.namespace))
            .await
    }
}

/// An instance of a kind provided by an operator, e.g. an `EtcdCluster`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CustomResource {
    pub name: String,
    pub namespace: String,
    /// The kind as passed to `oc`, e.g. `EtcdCluster`.
    pub kind: String,
    pub template: String,
}

impl CustomResource {
    pub async fn create(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let params = [
            format!("NAME={}", self.name),
            format!("NAMESPACE={}", self.namespace),
        ];
        apply_template(oc, &self.template, &params).await?;
        case.add(ResourceHandle::new(
            oc,
            &self.kind,
            &self.name,
            Some(&self.namespace),
        ));
        Ok(())
    }

    pub async fn delete(&self, case: &mut CaseResources) -> Result<()> {
        case.remove(&self.name, &self.kind, Some(&self.namespace))
            .await
    }
}

/// An operator group. Without `multi_ns_label` the template decides between own namespace and
/// all namespaces; with it, the group targets the namespaces carrying that label.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct OperatorGroup {
    pub name: String,
    pub namespace: String,
    pub multi_ns_label: String,
    pub template: String,
}

impl OperatorGroup {
    /// Create the operator group unless the current project of `oc` already has one.
    pub async fn create_with_check(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let output = oc
            .run("get", Role::Admin, Scope::Namespaced, &["operatorgroup"])
            .await?;
        let project = oc.namespace().unwrap_or_default();
        if output.contains(NO_RESOURCES_FOUND) {
            info!(
                "No operatorgroup in project: {}, create one: {}",
                project, self.name
            );
            self.create(oc, case).await
        } else {
            info!("Already exist operatorgroup in project: {}", project);
            Ok(())
        }
    }

    pub async fn create(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let mut params = vec![
            format!("NAME={}", self.name),
            format!("NAMESPACE={}", self.namespace),
        ];
        if !self.multi_ns_label.is_empty() {
            params.push(format!("MULTINSLABEL={}", self.multi_ns_label));
        }
        apply_template(oc, &self.template, &params).await?;
        case.add(ResourceHandle::new(oc, "og", &self.name, Some(&self.namespace)));
        Ok(())
    }

    pub async fn delete(&self, case: &mut CaseResources) -> Result<()> {
        case.remove(&self.name, "og", Some(&self.namespace)).await
    }
}
