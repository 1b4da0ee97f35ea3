use crate::constants::{
    CONFIG_NAMESPACE, OBJECT_INTERVAL, OBJECT_TIMEOUT, PROJECT_GROUP, PROJECT_VERSION,
    PULL_SECRET, PULL_SECRET_KEY, ROUTE_GROUP, ROUTE_VERSION, SERVICE_ACCOUNT_TOKEN_KEY,
    SERVICE_ACCOUNT_TOKEN_TYPE,
};
use crate::error::{self, Result};
use crate::events::ProjectEvents;
use crate::release::is_platform_namespace;
use crate::wait::poll_for;
use k8s_openapi::api::core::v1::{Pod, Secret};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{ApiResource, DynamicObject, GroupVersionKind, ListParams, WatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config, Resource, ResourceExt};
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};
use std::fmt::Debug;
use std::path::Path;

/// Typed access to the cluster for the things `oc` output is awkward for.
#[derive(Clone)]
pub struct ClusterClient {
    k8s_client: Client,
}

impl ClusterClient {
    /// Create a `ClusterClient` from the path to a kubeconfig file.
    pub async fn new_from_kubeconfig_path(kubeconfig_path: &Path) -> Result<Self> {
        let kubeconfig =
            Kubeconfig::read_from(kubeconfig_path).context(error::KubeconfigReadSnafu)?;
        Self::from_kubeconfig(kubeconfig, None).await
    }

    /// Create a `ClusterClient` that impersonates `user`, using the kubeconfig at
    /// `kubeconfig_path` or the default kubeconfig. The kubeconfig must belong to a user allowed
    /// to impersonate, e.g. a cluster-admin.
    pub async fn impersonating(kubeconfig_path: Option<&Path>, user: &str) -> Result<Self> {
        let kubeconfig = match kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        }
        .context(error::KubeconfigReadSnafu)?;
        Self::from_kubeconfig(kubeconfig, Some(user)).await
    }

    async fn from_kubeconfig(kubeconfig: Kubeconfig, impersonate: Option<&str>) -> Result<Self> {
        let mut config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context(error::KubeconfigClientSnafu)?;
        if let Some(user) = impersonate {
            config.auth_info.impersonate = Some(user.to_string());
        }
        Ok(Self {
            k8s_client: config.try_into().context(error::KubeSnafu {
                action: "create client from `Kubeconfig`",
            })?,
        })
    }

    /// Create a `ClusterClient` using the default `kube::Client`.
    pub async fn new() -> Result<Self> {
        Ok(Self {
            k8s_client: Client::try_default().await.context(error::KubeSnafu {
                action: "create client from `Kubeconfig`",
            })?,
        })
    }

    pub fn from_k8s_client(k8s_client: Client) -> Self {
        Self { k8s_client }
    }

    pub fn k8s_client(&self) -> Client {
        self.k8s_client.clone()
    }

    /// Wait for the namespaced object `name` to exist and return it. Errors from the API server
    /// are retried until the wait times out.
    pub async fn wait_for_object<K>(&self, namespace: &str, name: &str) -> Result<K>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.k8s_client(), namespace);
        let what = format!(
            "{} {}/{}",
            K::kind(&Default::default()),
            namespace,
            name
        );
        wait_for(&api, &what, name).await
    }

    /// Wait for the OpenShift route `name` and return the host of its first ingress.
    pub async fn route_host(&self, namespace: &str, name: &str) -> Result<String> {
        let gvk = GroupVersionKind::gvk(ROUTE_GROUP, ROUTE_VERSION, "Route");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "routes");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.k8s_client(), namespace, &resource);
        let what = format!("route {}/{}", namespace, name);
        let route = wait_for(&api, &what, name).await?;
        let host = ingress_host(&route.data).context(error::MissingFieldSnafu {
            field: "status.ingress[0].host",
            what: &what,
        })?;
        debug!("{} is served at {}", what, host);
        Ok(host)
    }

    /// The token of the first service account token secret in `namespace` whose name starts with
    /// `prefix`.
    pub async fn service_account_token(&self, namespace: &str, prefix: &str) -> Result<String> {
        let api: Api<Secret> = Api::namespaced(self.k8s_client(), namespace);
        let secrets = api
            .list(&ListParams::default())
            .await
            .context(error::KubeSnafu {
                action: format!("list secrets in {}", namespace),
            })?;
        let secret = secrets
            .into_iter()
            .find(|secret| {
                secret.type_.as_deref() == Some(SERVICE_ACCOUNT_TOKEN_TYPE)
                    && secret.name_any().starts_with(prefix)
            })
            .context(error::NotFoundSnafu {
                what: format!("service account token secret '{}*' in {}", prefix, namespace),
            })?;
        let what = format!("secret {}", secret.name_any());
        let token = secret
            .data
            .unwrap_or_default()
            .remove(SERVICE_ACCOUNT_TOKEN_KEY)
            .context(error::MissingFieldSnafu {
                field: SERVICE_ACCOUNT_TOKEN_KEY,
                what,
            })?;
        Ok(String::from_utf8_lossy(&token.0).into_owned())
    }

    /// The registry credentials of the cluster, as a docker `config.json`.
    pub async fn pull_secret(&self) -> Result<Vec<u8>> {
        let api: Api<Secret> = Api::namespaced(self.k8s_client(), CONFIG_NAMESPACE);
        let what = format!("secret {}/{}", CONFIG_NAMESPACE, PULL_SECRET);
        let secret = api.get(PULL_SECRET).await.context(error::KubeSnafu {
            action: format!("get {}", what),
        })?;
        let config = secret
            .data
            .unwrap_or_default()
            .remove(PULL_SECRET_KEY)
            .context(error::MissingFieldSnafu {
                field: PULL_SECRET_KEY,
                what,
            })?;
        Ok(config.0)
    }

    /// The pods of every platform namespace.
    pub async fn platform_pods(&self) -> Result<Vec<Pod>> {
        let api: Api<Pod> = Api::all(self.k8s_client());
        let pods = api
            .list(&ListParams::default())
            .await
            .context(error::KubeSnafu {
                action: "list pods",
            })?;
        Ok(pods
            .into_iter()
            .filter(|pod| {
                pod.namespace()
                    .map(|namespace| is_platform_namespace(&namespace))
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Watch the projects this client's user can see, starting at `resource_version`. `"0"`
    /// starts with an `Added` event for every visible project. A `field_selector` such as
    /// `metadata.name=foo` limits the watch.
    pub async fn watch_projects(
        &self,
        field_selector: Option<&str>,
        resource_version: &str,
    ) -> Result<ProjectEvents> {
        let gvk = GroupVersionKind::gvk(PROJECT_GROUP, PROJECT_VERSION, "Project");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "projects");
        let api: Api<DynamicObject> = Api::all_with(self.k8s_client(), &resource);
        let mut params = WatchParams::default();
        if let Some(selector) = field_selector {
            params = params.fields(selector);
        }
        let stream = api
            .watch(&params, resource_version)
            .await
            .context(error::KubeSnafu {
                action: "watch projects",
            })?;
        Ok(ProjectEvents::new(stream))
    }
}

async fn wait_for<K>(api: &Api<K>, what: &str, name: &str) -> Result<K>
where
    K: Clone + DeserializeOwned + Debug,
{
    poll_for(what, OBJECT_INTERVAL, OBJECT_TIMEOUT, move || async move {
        match api.get_opt(name).await {
            Ok(object) => Ok(object),
            Err(e) => {
                trace!("unable to get {}: {}", name, e);
                Ok(None)
            }
        }
    })
    .await
}

fn ingress_host(route: &Value) -> Option<String> {
    route
        .get("status")?
        .get("ingress")?
        .get(0)?
        .get("host")?
        .as_str()
        .map(str::to_string)
}
