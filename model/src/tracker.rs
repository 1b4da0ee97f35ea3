/*!

Bookkeeping of the cluster objects a test case creates so they can be torn down afterwards.

A [`SuiteResources`] maps each case name of a suite to the [`CaseResources`] it created. Helpers
that create an object register a [`ResourceHandle`] for it; deleting through the tracker removes
the object from the cluster and forgets it, and [`CaseResources::cleanup`] removes whatever is
left when the case ends.

!*/

use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use log::{info, warn};
use snafu::{ensure, OptionExt};
use std::collections::HashMap;

/// A cluster object created by a test case.
#[derive(Debug, Clone)]
pub struct ResourceHandle {
    oc: Oc,
    role: Role,
    scope: Scope,
    kind: String,
    name: String,
    /// `None` for cluster level objects, otherwise the namespace passed with `-n` on deletion.
    namespace: Option<String>,
}

impl ResourceHandle {
    /// Describe an object so it can be deleted later. Deletion runs as admin and without the
    /// current project of `oc`.
    pub fn new<K, N>(oc: &Oc, kind: K, name: N, namespace: Option<&str>) -> Self
    where
        K: Into<String>,
        N: Into<String>,
    {
        Self {
            oc: oc.clone(),
            role: Role::Admin,
            scope: Scope::ClusterWide,
            kind: kind.into(),
            name: name.into(),
            namespace: namespace.map(str::to_string),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.name, &self.kind, self.namespace())
    }

    /// Delete the object from the cluster and wait until it is gone.
    pub async fn delete(&self) -> Result<()> {
        match (self.scope, self.namespace()) {
            (Scope::ClusterWide, Some(namespace)) => {
                self.oc
                    .remove_resource(
                        self.role,
                        self.scope,
                        &[&self.kind, &self.name, "-n", namespace],
                    )
                    .await
            }
            _ => {
                self.oc
                    .remove_resource(self.role, self.scope, &[&self.kind, &self.name])
                    .await
            }
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct ResourceKey {
    name: String,
    kind: String,
    namespace: Option<String>,
}

impl ResourceKey {
    fn new(name: &str, kind: &str, namespace: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }
}

/// The objects created by one test case, keyed by name, kind and namespace.
#[derive(Debug, Clone, Default)]
pub struct CaseResources {
    resources: HashMap<ResourceKey, ResourceHandle>,
}

impl CaseResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `resource`, replacing any handle with the same name, kind and namespace.
    pub fn add(&mut self, resource: ResourceHandle) {
        self.resources.insert(resource.key(), resource);
    }

    pub fn get(&self, name: &str, kind: &str, namespace: Option<&str>) -> Result<&ResourceHandle> {
        self.resources
            .get(&ResourceKey::new(name, kind, namespace))
            .context(error::NotTrackedSnafu {
                what: describe(name, kind, namespace),
            })
    }

    pub fn contains(&self, name: &str, kind: &str, namespace: Option<&str>) -> bool {
        self.resources
            .contains_key(&ResourceKey::new(name, kind, namespace))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Delete a tracked object from the cluster and stop tracking it. Untracked objects are
    /// ignored. If the deletion fails the object stays tracked.
    pub async fn remove(&mut self, name: &str, kind: &str, namespace: Option<&str>) -> Result<()> {
        let key = ResourceKey::new(name, kind, namespace);
        if let Some(resource) = self.resources.get(&key) {
            resource.delete().await?;
            self.resources.remove(&key);
        }
        Ok(())
    }

    /// Delete every tracked object. Failures do not stop the cleanup; the objects that could not
    /// be deleted stay tracked and are reported together.
    pub async fn cleanup(&mut self) -> Result<()> {
        let mut failures = Vec::new();
        let keys: Vec<ResourceKey> = self.resources.keys().cloned().collect();
        for key in keys {
            info!("cleanup resource {}, {}", key.kind, key.name);
            if let Err(e) = self
                .remove(&key.name, &key.kind, key.namespace.as_deref())
                .await
            {
                warn!("unable to clean up {} {}: {}", key.kind, key.name, e);
                failures.push(format!(
                    "{}: {}",
                    describe(&key.name, &key.kind, key.namespace.as_deref()),
                    e
                ));
            }
        }
        ensure!(failures.is_empty(), error::CleanupSnafu { failures });
        Ok(())
    }
}

fn describe(name: &str, kind: &str, namespace: Option<&str>) -> String {
    match namespace {
        Some(namespace) => format!("{} {} in {}", kind, name, namespace),
        None => format!("{} {}", kind, name),
    }
}

/// The objects created by every case of a suite, keyed by case name.
#[derive(Debug, Clone, Default)]
pub struct SuiteResources {
    cases: HashMap<String, CaseResources>,
}

impl SuiteResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking a case with no resources. An existing case of the same name is replaced.
    pub fn add_case<S: Into<String>>(&mut self, case: S) {
        self.cases.insert(case.into(), CaseResources::new());
    }

    pub fn case(&self, case: &str) -> Result<&CaseResources> {
        self.cases
            .get(case)
            .context(error::NotTrackedSnafu { what: case })
    }

    pub fn case_mut(&mut self, case: &str) -> Result<&mut CaseResources> {
        self.cases
            .get_mut(case)
            .context(error::NotTrackedSnafu { what: case })
    }

    /// Stop tracking a case. Its remaining objects are not deleted.
    pub fn remove_case(&mut self, case: &str) -> Option<CaseResources> {
        self.cases.remove(case)
    }
}
