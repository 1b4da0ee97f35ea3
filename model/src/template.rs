/*!

Template instances. The template instance controller creates the objects of the embedded template
with the permissions of the user that requested the instance, and reports the outcome through
the conditions of the instance.

!*/

use crate::constants::{
    IGNORE_UNKNOWN_PARAMETERS, NOT_FOUND, TEMPLATE_DELETE_INTERVAL, TEMPLATE_DELETE_TIMEOUT,
    TEMPLATE_INTERVAL, TEMPLATE_TIMEOUT,
};
use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use crate::tracker::{CaseResources, ResourceHandle};
use crate::util::random_string;
use crate::wait::{poll, poll_for, poll_immediate};
use log::{debug, info};
use serde::Deserialize;
use snafu::{ensure, ResultExt};

const CONDITION_TRUE: &str = "True";
const REASON_CREATED: &str = "Created";
const REASON_FAILED: &str = "Failed";
const INSTANTIATE_FAILURE: &str = "InstantiateFailure";

#[derive(Debug, Clone, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

impl Condition {
    fn is_true(&self) -> bool {
        self.status == CONDITION_TRUE
    }
}

#[derive(Debug, Default, Deserialize)]
struct Object {
    #[serde(default)]
    status: Status,
}

#[derive(Debug, Default, Deserialize)]
struct Status {
    #[serde(default)]
    conditions: Vec<Condition>,
}

/// A template instance created from a template file taking `NAME` and `NAMESPACE`, plus any
/// `parameters` given as `KEY=value`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct TemplateInstance {
    pub name: String,
    pub namespace: String,
    pub template: String,
    pub parameters: Vec<String>,
}

impl TemplateInstance {
    /// Process the template as admin and create the result as `role`, which becomes the
    /// requester of the instance.
    pub async fn create(&self, oc: &Oc, role: Role, case: &mut CaseResources) -> Result<()> {
        let name = format!("NAME={}", self.name);
        let namespace = format!("NAMESPACE={}", self.namespace);
        let mut params = vec![
            IGNORE_UNKNOWN_PARAMETERS,
            "-f",
            &self.template,
            "-p",
            &name,
            &namespace,
        ];
        params.extend(self.parameters.iter().map(String::as_str));
        let file_name = format!("{}-templateinstance.json", random_string());
        let path = oc
            .output_to_file("process", Role::Admin, Scope::ClusterWide, &params, &file_name)
            .await?;
        oc.run(
            "create",
            role,
            Scope::ClusterWide,
            &["-f", &path.to_string_lossy()],
        )
        .await?;
        case.add(ResourceHandle::new(
            oc,
            "templateinstance",
            &self.name,
            Some(&self.namespace),
        ));
        Ok(())
    }

    pub async fn conditions(&self, oc: &Oc) -> Result<Vec<Condition>> {
        let output = oc
            .run(
                "get",
                Role::Admin,
                Scope::ClusterWide,
                &[
                    "templateinstance",
                    &self.name,
                    "-n",
                    &self.namespace,
                    "-o",
                    "json",
                ],
            )
            .await?;
        let object: Object = serde_json::from_str(&output).context(error::JsonParseSnafu {
            what: format!("templateinstance {}", self.name),
        })?;
        Ok(object.status.conditions)
    }

    /// Wait until the controller reports the objects as created. A reported failure ends the
    /// wait with an error.
    pub async fn wait_until_created(&self, oc: &Oc) -> Result<()> {
        let instance = self;
        let what = format!("templateinstance {} to be created", self.name);
        poll(&what, TEMPLATE_INTERVAL, TEMPLATE_TIMEOUT, move || async move {
            let conditions = instance.conditions(oc).await?;
            if let Some(failed) = conditions
                .iter()
                .find(|c| c.reason == REASON_FAILED && c.is_true())
            {
                return error::CheckFailedSnafu {
                    description: format!(
                        "templateinstance {} failed: {}",
                        instance.name, failed.message
                    ),
                }
                .fail();
            }
            Ok(conditions
                .iter()
                .any(|c| c.reason == REASON_CREATED && c.is_true()))
        })
        .await?;
        info!("templateinstance {} created its objects", self.name);
        Ok(())
    }

    /// Wait until the controller reports that instantiating failed.
    pub async fn wait_for_failure(&self, oc: &Oc) -> Result<Condition> {
        let instance = self;
        let what = format!("templateinstance {} to fail", self.name);
        let failure = poll_for(&what, TEMPLATE_INTERVAL, TEMPLATE_TIMEOUT, move || async move {
            Ok(instance
                .conditions(oc)
                .await?
                .into_iter()
                .find(|c| c.type_ == INSTANTIATE_FAILURE && c.is_true()))
        })
        .await?;
        debug!("templateinstance {} failed: {}", self.name, failure.message);
        Ok(failure)
    }

    /// Delete the instance in the foreground, which removes the objects it created before the
    /// instance itself, and wait until it is gone.
    pub async fn delete(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        oc.run(
            "delete",
            Role::Admin,
            Scope::ClusterWide,
            &[
                "templateinstance",
                &self.name,
                "-n",
                &self.namespace,
                "--cascade=foreground",
            ],
        )
        .await?;
        let params = [
            "templateinstance",
            self.name.as_str(),
            "-n",
            self.namespace.as_str(),
        ];
        let params = &params;
        let what = format!("templateinstance {} to be gone", self.name);
        poll_immediate(
            &what,
            TEMPLATE_DELETE_INTERVAL,
            TEMPLATE_DELETE_TIMEOUT,
            move || async move {
                let output = oc
                    .do_action("get", Role::Admin, Scope::ClusterWide, params)
                    .await?;
                ensure!(
                    output.success || output.output.contains(NOT_FOUND),
                    error::CommandSnafu {
                        action: "get",
                        code: output.code,
                        output: output.output.clone(),
                    }
                );
                Ok(!output.success)
            },
        )
        .await?;
        case.remove(&self.name, "templateinstance", Some(&self.namespace))
            .await
    }
}
