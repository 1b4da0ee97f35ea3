//! Polling helpers over `oc get`, `oc delete`, `oc exec` and friends.

use super::{Oc, Role, Scope};
use crate::check::Match;
use crate::constants::{
    ALTERNATIVE_SEPARATOR, EXEC_TIMEOUT, EXPECT_TIMEOUT, GET_TIMEOUT, IGNORE_NOT_FOUND,
    NOT_FOUND, NO_RESOURCES_FOUND, POLL_INTERVAL, PRESENT_TIMEOUT, PROCESS_TIMEOUT,
    REMOVE_TIMEOUT,
};
use crate::error::{Error, Result};
use crate::util::random_string;
use crate::wait::{poll, poll_for};
use log::{debug, info};
use std::path::PathBuf;

/// `true` if `output` holds any of the `+2+` separated alternatives in `content`, compared
/// exactly or as a substring depending on `matcher`.
pub fn content_matches(output: &str, content: &str, matcher: Match) -> bool {
    content
        .split(ALTERNATIVE_SEPARATOR)
        .any(|alternative| match matcher {
            Match::Compare => output == alternative,
            Match::Contain => output.contains(alternative),
        })
}

/// `true` if `oc` reported that the object does not exist.
fn is_gone(output: &str) -> bool {
    output.contains(NOT_FOUND) || output.contains(NO_RESOURCES_FOUND)
}

impl Oc {
    /// Poll `oc get <params>` until it succeeds and return its output.
    pub async fn get_resource(&self, role: Role, scope: Scope, params: &[&str]) -> Result<String> {
        let oc = self;
        let what = format!("oc get {}", params.join(" "));
        let result = poll_for(&what, POLL_INTERVAL, GET_TIMEOUT, move || async move {
            let output = oc.do_action("get", role, scope, params).await?;
            if !output.success {
                debug!("the get error is {}, and try next", output.output);
                return Ok(None);
            }
            Ok(Some(output.output))
        })
        .await?;
        debug!("the result of queried resource: {}", result);
        Ok(result)
    }

    /// Run `oc patch <params>`.
    pub async fn patch_resource(&self, role: Role, scope: Scope, params: &[&str]) -> Result<()> {
        self.run("patch", role, scope, params).await.map(|_| ())
    }

    /// Poll `oc exec <params>` until it succeeds and return its output.
    pub async fn exec_resource(&self, role: Role, scope: Scope, params: &[&str]) -> Result<String> {
        let oc = self;
        let what = format!("oc exec {}", params.join(" "));
        let result = poll_for(&what, POLL_INTERVAL, EXEC_TIMEOUT, move || async move {
            let output = oc.do_action("exec", role, scope, params).await?;
            if !output.success {
                debug!("the exec error is {}, and try next", output.output);
                return Ok(None);
            }
            Ok(Some(output.output))
        })
        .await?;
        debug!("the result of exec resource: {}", result);
        Ok(result)
    }

    /// Delete the object named by `params` and wait until `oc get` reports it gone. An object
    /// that is already gone is not an error.
    pub async fn remove_resource(&self, role: Role, scope: Scope, params: &[&str]) -> Result<()> {
        let output = self.do_action("delete", role, scope, params).await?;
        if !output.success {
            if is_gone(&output.output) {
                info!("the resource is deleted already");
                return Ok(());
            }
            output.into_result("delete")?;
        }

        let oc = self;
        let what = format!("deletion of {}", params.join(" "));
        poll(&what, POLL_INTERVAL, REMOVE_TIMEOUT, move || async move {
            let output = oc.do_action("get", role, scope, params).await?;
            Ok(!output.success && is_gone(&output.output))
        })
        .await?;
        info!("the resource is deleted successfully");
        Ok(())
    }

    /// Poll `oc get <params> --ignore-not-found` until the object is present (or absent when
    /// `present` is `false`). Returns `false` if that does not happen in time.
    pub async fn is_present_resource(
        &self,
        role: Role,
        scope: Scope,
        present: bool,
        params: &[&str],
    ) -> Result<bool> {
        let mut params = params.to_vec();
        params.push(IGNORE_NOT_FOUND);
        let params = params.as_slice();
        let oc = self;
        let what = format!(
            "{} to be {}",
            params.join(" "),
            if present { "present" } else { "absent" }
        );
        let result = poll(&what, POLL_INTERVAL, PRESENT_TIMEOUT, move || async move {
            let output = oc.do_action("get", role, scope, params).await?;
            if !output.success {
                debug!("the get error is {}, and try next", output.output);
                return Ok(false);
            }
            Ok(present != output.output.is_empty())
        })
        .await;
        match result {
            Ok(()) => Ok(true),
            Err(Error::Timeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Poll `oc get <params>` until its output matches `content` (`expect == true`) or does not
    /// match it (`expect == false`).
    pub async fn expected_resource(
        &self,
        role: Role,
        scope: Scope,
        matcher: Match,
        content: &str,
        expect: bool,
        params: &[&str],
    ) -> Result<()> {
        info!(
            "Running: oc get as {:?} {:?} {}",
            role,
            scope,
            params.join(" ")
        );
        let oc = self;
        let what = format!(
            "{} to {}{} '{}'",
            params.join(" "),
            if expect { "" } else { "not " },
            matcher,
            content
        );
        poll(&what, POLL_INTERVAL, EXPECT_TIMEOUT, move || async move {
            let output = oc.do_action("get", role, scope, params).await?;
            if !output.success {
                debug!("the get error is {}, and try next", output.output);
                return Ok(false);
            }
            debug!(
                "we {} expect value '{}' in returned value '{}'",
                if expect { "do" } else { "do not" },
                content,
                output.output
            );
            Ok(content_matches(&output.output, content, matcher) == expect)
        })
        .await
    }

    /// Process a template with `oc process <params>` into a uniquely named file and apply it.
    pub async fn apply_resource_from_template(&self, params: &[&str]) -> Result<()> {
        let oc = self;
        let config_file: PathBuf =
            poll_for("oc process", POLL_INTERVAL, PROCESS_TIMEOUT, move || async move {
                let file_name = format!("{}olm-config.json", random_string());
                match oc
                    .output_to_file("process", Role::Admin, Scope::Namespaced, params, &file_name)
                    .await
                {
                    Ok(path) => Ok(Some(path)),
                    Err(e @ Error::Command { .. }) => {
                        debug!("the err: {}, and try next round", e);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await?;

        info!("the file of resource is {}", config_file.display());
        let config_file = config_file.to_string_lossy();
        self.run("apply", Role::Admin, Scope::ClusterWide, &["-f", &config_file])
            .await
            .map(|_| ())
    }
}
