use super::{apply_template, merge_patch};
use crate::check::{Check, Match};
use crate::constants::{
    APPROVAL_AUTOMATIC, APPROVE_INTERVAL, CSV_TIMEOUT, INSTALL_PLAN_TIMEOUT, PHASE_COMPLETE,
    POLL_INTERVAL, STATE_AT_LATEST_KNOWN, STATE_UPGRADE_PENDING,
};
use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use crate::tracker::{CaseResources, ResourceHandle};
use crate::wait::{poll, Poller};
use log::{debug, info};
use snafu::{ensure, OptionExt};
use tokio::time::sleep;

/// A ClusterServiceVersion installed by a subscription.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Csv {
    pub name: String,
    pub namespace: String,
}

impl Csv {
    /// Delete the CSV through the tracker of the case that recorded it.
    pub async fn delete(&self, case: &mut CaseResources) -> Result<()> {
        case.remove(&self.name, "csv", Some(&self.namespace)).await
    }
}

/// A subscription to an operator package, created from a template that takes the `SUBNAME`,
/// `SUBNAMESPACE`, `CHANNEL`, `APPROVAL`, `OPERATORNAME`, `SOURCENAME`, `SOURCENAMESPACE` and
/// `STARTINGCSV` parameters.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Subscription {
    pub name: String,
    pub namespace: String,
    pub channel: String,
    /// `Automatic` or `Manual`.
    pub approval: String,
    pub operator_package: String,
    pub catalog_source: String,
    pub catalog_source_namespace: String,
    pub starting_csv: String,
    pub current_csv: String,
    /// Set once the subscription reports an installed CSV.
    pub installed_csv: String,
    pub template: String,
    pub single_namespace: bool,
    /// Every `<install plan> <current CSV>` pair approved so far, newest first, each followed by
    /// `##`.
    pub ip_csv: String,
}

impl Subscription {
    /// Create the subscription and wait for it to settle. With `Automatic` approval this waits
    /// for the installed CSV and tracks it; otherwise it waits for the subscription to reach
    /// `UpgradePending`.
    pub async fn create(&mut self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        self.create_without_check(oc, case).await?;
        if self.approval == APPROVAL_AUTOMATIC {
            self.find_installed_csv(oc, case).await
        } else {
            Check::expect(
                Match::Compare,
                STATE_UPGRADE_PENDING,
                true,
                self.status_query("{.status.state}"),
            )
            .check(oc)
            .await
        }
    }

    /// Create the subscription and track it without waiting for its state.
    pub async fn create_without_check(&self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        let params = [
            format!("SUBNAME={}", self.name),
            format!("SUBNAMESPACE={}", self.namespace),
            format!("CHANNEL={}", self.channel),
            format!("APPROVAL={}", self.approval),
            format!("OPERATORNAME={}", self.operator_package),
            format!("SOURCENAME={}", self.catalog_source),
            format!("SOURCENAMESPACE={}", self.catalog_source_namespace),
            format!("STARTINGCSV={}", self.starting_csv),
        ];
        apply_template(oc, &self.template, &params).await?;
        case.add(ResourceHandle::new(
            oc,
            "sub",
            &self.name,
            Some(&self.namespace),
        ));
        Ok(())
    }

    /// Wait for the subscription to reach `AtLatestKnown` and record its installed CSV. A CSV
    /// that differs from the one recorded before is tracked.
    pub async fn find_installed_csv(&mut self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        Check::expect(
            Match::Compare,
            STATE_AT_LATEST_KNOWN,
            true,
            self.status_query("{.status.state}"),
        )
        .check(oc)
        .await?;
        let installed_csv = self.status(oc, "{.status.installedCSV}").await?;
        ensure!(
            !installed_csv.is_empty(),
            error::EmptySnafu {
                what: format!("installed CSV of subscription {}", self.name)
            }
        );
        if self.installed_csv != installed_csv {
            self.installed_csv = installed_csv;
            self.track_installed_csv(oc, case);
        }
        info!("the installed CSV name is {}", self.installed_csv);
        Ok(())
    }

    /// Wait until the installed CSV of the subscription is `csv`.
    pub async fn expect_csv(&mut self, oc: &Oc, case: &mut CaseResources, csv: &str) -> Result<()> {
        let what = format!("subscription {} to install {}", self.name, csv);
        let poller = Poller::new(&what, POLL_INTERVAL, CSV_TIMEOUT);
        loop {
            poller.wait().await?;
            self.find_installed_csv(oc, case).await?;
            if self.installed_csv == csv {
                return Ok(());
            }
        }
    }

    /// Approve install plans of a subscription with `Manual` approval until it reports an
    /// installed CSV, which is then tracked. Each approval waits for its install plan to
    /// complete, which bounds the loop.
    pub async fn approve(&mut self, oc: &Oc, case: &mut CaseResources) -> Result<()> {
        sleep(APPROVE_INTERVAL).await;
        while self.installed_csv.is_empty() {
            let state = self.status(oc, "{.status.state}").await?;
            if state == STATE_AT_LATEST_KNOWN {
                self.installed_csv = self.status(oc, "{.status.installedCSV}").await?;
                self.track_installed_csv(oc, case);
                info!(
                    "it is already done, and the installed CSV name is {}",
                    self.installed_csv
                );
                continue;
            }

            let ip_csv = self
                .status(oc, "{.status.installplan.name}{\" \"}{.status.currentCSV}")
                .await?;
            self.ip_csv = format!("{}##{}", ip_csv, self.ip_csv);
            let install_plan = ip_csv
                .split_whitespace()
                .next()
                .context(error::EmptySnafu {
                    what: format!("install plan of subscription {}", self.name),
                })?
                .to_string();
            info!("try to approve installPlan {}", install_plan);
            oc.patch_resource(
                Role::Admin,
                Scope::ClusterWide,
                &merge_patch(
                    "ip",
                    &install_plan,
                    &self.namespace,
                    r#"{"spec": {"approved": true}}"#,
                ),
            )
            .await?;
            self.wait_for_install_plan(oc, &install_plan).await?;
        }
        Ok(())
    }

    async fn wait_for_install_plan(&self, oc: &Oc, install_plan: &str) -> Result<()> {
        let check = Check::expect(
            Match::Compare,
            PHASE_COMPLETE,
            true,
            [
                "ip",
                install_plan,
                "-n",
                self.namespace.as_str(),
                "-o=jsonpath={.status.phase}",
            ],
        );
        let check = &check;
        let what = format!("install plan {} to complete", install_plan);
        poll(&what, POLL_INTERVAL, INSTALL_PLAN_TIMEOUT, move || async move {
            Ok(check.passes(oc).await)
        })
        .await
    }

    /// The CSV installed by this subscription.
    pub fn csv(&self) -> Csv {
        Csv {
            name: self.installed_csv.clone(),
            namespace: self.namespace.clone(),
        }
    }

    /// The version of the first example in the `alm-examples` annotation of the installed CSV.
    pub async fn instance_version(&self, oc: &Oc) -> Result<String> {
        let examples = oc
            .get_resource(
                Role::User,
                Scope::ClusterWide,
                &[
                    "csv",
                    &self.installed_csv,
                    "-n",
                    &self.namespace,
                    "-o=jsonpath={.metadata.annotations.alm-examples}",
                ],
            )
            .await?;
        let version = alm_example_version(&examples).context(error::EmptySnafu {
            what: format!("version in alm-examples of {}", self.installed_csv),
        })?;
        debug!("the instance version of {} is {}", self.installed_csv, version);
        Ok(version)
    }

    /// Delete the subscription through the tracker.
    pub async fn delete(&self, case: &mut CaseResources) -> Result<()> {
        case.remove(&self.name, "sub", Some(&self.namespace)).await
    }

    /// Apply a merge patch to the subscription.
    pub async fn patch(&self, oc: &Oc, patch: &str) -> Result<()> {
        oc.patch_resource(
            Role::Admin,
            Scope::ClusterWide,
            &merge_patch("sub", &self.name, &self.namespace, patch),
        )
        .await
    }

    fn track_installed_csv(&self, oc: &Oc, case: &mut CaseResources) {
        case.add(ResourceHandle::new(
            oc,
            "csv",
            &self.installed_csv,
            Some(&self.namespace),
        ));
    }

    fn status_query(&self, jsonpath: &str) -> [String; 5] {
        [
            "sub".to_string(),
            self.name.clone(),
            "-n".to_string(),
            self.namespace.clone(),
            format!("-o=jsonpath={}", jsonpath),
        ]
    }

    async fn status(&self, oc: &Oc, jsonpath: &str) -> Result<String> {
        let query = self.status_query(jsonpath);
        let query: Vec<&str> = query.iter().map(String::as_str).collect();
        oc.get_resource(Role::Admin, Scope::ClusterWide, &query)
            .await
    }
}

/// Find the first `"version": "x"` line of pretty printed `alm-examples`.
fn alm_example_version(examples: &str) -> Option<String> {
    examples
        .lines()
        .find(|line| line.contains("\"version\""))
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|value| value.trim_end_matches(',').trim_matches('"').to_string())
        .filter(|version| !version.is_empty())
}
