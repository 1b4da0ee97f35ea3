/*!

Poll based assertions against `oc get`. A [`Check`] describes what to look at and what to
expect; a [`CheckList`] runs several of them concurrently.

!*/

use crate::error::{self, Result};
use crate::oc::{Oc, Role, Scope};
use futures::future::join_all;
use log::{debug, info};
use serde::Deserialize;
use snafu::ensure;
use std::fmt::{Display, Formatter};

/// What a [`Check`] verifies.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckMethod {
    /// Whether the resource exists.
    Present,
    /// Whether the output of `oc get` matches the expected content.
    Expect,
}

serde_plain::derive_fromstr_from_deserialize!(CheckMethod);

/// How the output of `oc get` is compared with the expected content.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Match {
    /// The output must equal the content.
    Compare,
    /// The output must contain the content.
    Contain,
}

serde_plain::derive_fromstr_from_deserialize!(Match);

impl Display for Match {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Match::Compare => write!(f, "equal"),
            Match::Contain => write!(f, "contain"),
        }
    }
}

/// A single poll-until-satisfied assertion.
///
/// - `method` is [`CheckMethod::Present`]: `expect` states whether the resource should exist and
///   `matcher` and `content` are ignored.
/// - `method` is [`CheckMethod::Expect`]: the output of `oc get <resource>` must match `content`
///   according to `matcher` when `expect` is `true`, and must not match it when `expect` is
///   `false`. `content` may list alternatives separated by `+2+`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Check {
    pub method: CheckMethod,
    pub role: Role,
    pub scope: Scope,
    pub matcher: Match,
    pub content: String,
    pub expect: bool,
    pub resource: Vec<String>,
}

impl Check {
    pub fn new<S, I, R>(
        method: CheckMethod,
        role: Role,
        scope: Scope,
        matcher: Match,
        content: S,
        expect: bool,
        resource: I,
    ) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            method,
            role,
            scope,
            matcher,
            content: content.into(),
            expect,
            resource: resource.into_iter().map(Into::into).collect(),
        }
    }

    /// An [`CheckMethod::Expect`] check run as admin without the current project.
    pub fn expect<S, I, R>(matcher: Match, content: S, expect: bool, resource: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(
            CheckMethod::Expect,
            Role::Admin,
            Scope::ClusterWide,
            matcher,
            content,
            expect,
            resource,
        )
    }

    /// A [`CheckMethod::Present`] check run as admin without the current project.
    pub fn present<I, R>(present: bool, resource: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self::new(
            CheckMethod::Present,
            Role::Admin,
            Scope::ClusterWide,
            Match::Contain,
            "",
            present,
            resource,
        )
    }

    /// Run the check, failing with [`Error::CheckFailed`] if it is not satisfied in time.
    ///
    /// [`Error::CheckFailed`]: crate::Error::CheckFailed
    pub async fn check(&self, oc: &Oc) -> Result<()> {
        let resource: Vec<&str> = self.resource.iter().map(String::as_str).collect();
        match self.method {
            CheckMethod::Present => {
                let satisfied = oc
                    .is_present_resource(self.role, self.scope, self.expect, &resource)
                    .await?;
                ensure!(
                    satisfied,
                    error::CheckFailedSnafu {
                        description: self.to_string()
                    }
                );
                Ok(())
            }
            CheckMethod::Expect => {
                oc.expected_resource(
                    self.role,
                    self.scope,
                    self.matcher,
                    &self.content,
                    self.expect,
                    &resource,
                )
                .await
            }
        }
    }

    /// Run the check and report whether it was satisfied instead of failing.
    pub async fn passes(&self, oc: &Oc) -> bool {
        match self.check(oc).await {
            Ok(()) => true,
            Err(e) => {
                debug!("check '{}' is not satisfied: {}", self, e);
                false
            }
        }
    }
}

impl Display for Check {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let resource = self.resource.join(" ");
        match (self.method, self.expect) {
            (CheckMethod::Present, true) => write!(f, "'{}' is present", resource),
            (CheckMethod::Present, false) => write!(f, "'{}' is absent", resource),
            (CheckMethod::Expect, true) => {
                write!(f, "'{}' does {} '{}'", resource, self.matcher, self.content)
            }
            (CheckMethod::Expect, false) => write!(
                f,
                "'{}' does not {} '{}'",
                resource, self.matcher, self.content
            ),
        }
    }
}

/// A group of checks that are run concurrently.
#[derive(Debug, Clone, Default)]
pub struct CheckList {
    checks: Vec<Check>,
}

impl CheckList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, check: Check) {
        self.checks.push(check);
    }

    pub fn empty(&mut self) {
        self.checks.clear();
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run every check concurrently and wait for all of them. All failures are reported together.
    pub async fn check(&self, oc: &Oc) -> Result<()> {
        info!("running {} checks", self.checks.len());
        let results = join_all(self.checks.iter().map(|check| check.check(oc))).await;
        let failures: Vec<String> = self
            .checks
            .iter()
            .zip(results)
            .filter_map(|(check, result)| result.err().map(|e| format!("{}: {}", check, e)))
            .collect();
        ensure!(
            failures.is_empty(),
            error::ChecksFailedSnafu {
                total: self.checks.len(),
                failures,
            }
        );
        Ok(())
    }
}

impl FromIterator<Check> for CheckList {
    fn from_iter<T: IntoIterator<Item = Check>>(iter: T) -> Self {
        Self {
            checks: iter.into_iter().collect(),
        }
    }
}
