/*!

A client for the Prometheus HTTP API of the cluster monitoring stack, reached through its route
with the token of a Prometheus service account. The route is served with a certificate the test
host usually does not trust, so certificate verification is disabled.

!*/

use crate::cluster::ClusterClient;
use crate::constants::{
    HTTP_TIMEOUT, MONITORING_NAMESPACE, PROMETHEUS_ROUTE, PROMETHEUS_SECRET_PREFIX,
    PROMETHEUS_SERVICE,
};
use crate::error::{self, Result};
use k8s_openapi::api::core::v1::Service;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::BTreeSet;

/// The `data` of a successful query.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    /// `vector`, `matrix`, `scalar` or `string`.
    pub result_type: String,
    pub result: Value,
}

impl QueryData {
    /// The value of the first sample of a `vector` result.
    pub fn first_value(&self) -> Result<f64> {
        let value = self
            .result
            .get(0)
            .and_then(|sample| sample.get("value"))
            .and_then(|value| value.get(1))
            .and_then(Value::as_str)
            .context(error::MissingFieldSnafu {
                field: "result[0].value[1]",
                what: format!("{} result", self.result_type),
            })?;
        value
            .parse::<f64>()
            .context(error::InvalidSampleSnafu { value })
    }

    /// The distinct values of `label` across the series of the result.
    pub fn label_values(&self, label: &str) -> BTreeSet<String> {
        self.result
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|series| series.get("metric")?.get(label)?.as_str())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryData>,
    #[serde(default)]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl PrometheusClient {
    /// Create a client for `base_url`, e.g. `https://prometheus-k8s-openshift-monitoring.apps...`,
    /// that authenticates with `token`.
    pub fn new<S1, S2>(base_url: S1, token: S2) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(HTTP_TIMEOUT)
            .build()
            .context(error::HttpSnafu {
                action: "build prometheus client",
            })?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token: token.into(),
        })
    }

    /// Wait for the Prometheus service and route of the monitoring stack, and create a client for
    /// the route host using a Prometheus service account token.
    pub async fn via_route(cluster: &ClusterClient) -> Result<Self> {
        cluster
            .wait_for_object::<Service>(MONITORING_NAMESPACE, PROMETHEUS_SERVICE)
            .await?;
        let host = cluster
            .route_host(MONITORING_NAMESPACE, PROMETHEUS_ROUTE)
            .await?;
        let token = cluster
            .service_account_token(MONITORING_NAMESPACE, PROMETHEUS_SECRET_PREFIX)
            .await?;
        info!("using prometheus at {}", host);
        Self::new(format!("https://{}", host), token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Evaluate an instant query.
    pub async fn query(&self, promql: &str) -> Result<QueryData> {
        let url = format!("{}/api/v1/query", self.base_url.trim_end_matches('/'));
        debug!("querying {} for '{}'", url, promql);
        let body = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("query", promql)])
            .send()
            .await
            .context(error::HttpSnafu {
                action: format!("query prometheus for '{}'", promql),
            })?
            .text()
            .await
            .context(error::HttpSnafu {
                action: "read prometheus response",
            })?;
        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<QueryData> {
    let response: QueryResponse = serde_json::from_str(body).context(error::JsonParseSnafu {
        what: "prometheus response",
    })?;
    ensure!(
        response.status == "success",
        error::PrometheusQuerySnafu {
            status: response.status,
            message: format!(
                "{}: {}",
                response.error_type.unwrap_or_default(),
                response.error.unwrap_or_default()
            ),
        }
    );
    response.data.context(error::MissingFieldSnafu {
        field: "data",
        what: "prometheus response",
    })
}
