/*!

OAuth access tokens limited by scopes. A scoped token only grants the parts of its user's access
that its scopes name, e.g. `user:list-scoped-projects` together with `role:view:<project>` lets
the token list exactly those of the user's projects it may view.

The object holding a token is named after the SHA-256 of the token, so the token itself is never
stored in the cluster.

!*/

use crate::error::{self, Result};
use crate::oc::{Oc, OcConfig, Role, Scope};
use crate::tracker::{CaseResources, ResourceHandle};
use crate::util::random_string;
use log::info;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use sha2::{Digest, Sha256};
use snafu::{ensure, ResultExt};
use std::path::PathBuf;

pub const TOKEN_PREFIX: &str = "sha256~";
pub const USER_LIST_SCOPED_PROJECTS: &str = "user:list-scoped-projects";
const CLIENT_NAME: &str = "openshift-challenging-client";
const REDIRECT_URI: &str = "https://127.0.0.1:12000/oauth/token/implicit";
const EXPIRES_IN_SECONDS: u64 = 86400;
const TOKEN_LENGTH: usize = 43;

/// The scope granting the cluster role `role` in `namespace`, or in every namespace for `*`.
pub fn cluster_role_scope(role: &str, namespace: &str) -> String {
    format!("role:{}:{}", role, namespace)
}

/// The name of the `OAuthAccessToken` object holding `token`.
pub fn token_object_name(token: &str) -> String {
    let digest = base64::encode(Sha256::digest(token.as_bytes()))
        .replace('+', "-")
        .replace('/', "_");
    format!("{}{}", TOKEN_PREFIX, digest.trim_end_matches('='))
}

/// An access token of `user` limited to `scopes`.
#[derive(Debug, Clone)]
pub struct ScopedToken {
    pub user: String,
    pub scopes: Vec<String>,
    token: String,
}

impl ScopedToken {
    /// Create an access token for the existing `user`. The token object is tracked by `case`.
    pub async fn create<S>(
        oc: &Oc,
        case: &mut CaseResources,
        user: &str,
        scopes: &[S],
    ) -> Result<Self>
    where
        S: AsRef<str>,
    {
        let uid = oc
            .run(
                "get",
                Role::Admin,
                Scope::ClusterWide,
                &["user", user, "-o=jsonpath={.metadata.uid}"],
            )
            .await?;
        ensure!(
            !uid.is_empty(),
            error::EmptySnafu {
                what: format!("uid of user {}", user),
            }
        );
        let token = Self {
            user: user.to_string(),
            scopes: scopes.iter().map(|s| s.as_ref().to_string()).collect(),
            token: rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(TOKEN_LENGTH)
                .map(char::from)
                .collect(),
        };
        let manifest = json!({
            "apiVersion": "oauth.openshift.io/v1",
            "kind": "OAuthAccessToken",
            "metadata": {"name": token.name()},
            "clientName": CLIENT_NAME,
            "expiresIn": EXPIRES_IN_SECONDS,
            "scopes": token.scopes,
            "redirectURI": REDIRECT_URI,
            "userName": user,
            "userUID": uid,
        });
        let path = write_json(oc, "oauthaccesstoken", &manifest).await?;
        oc.run(
            "create",
            Role::Admin,
            Scope::ClusterWide,
            &["-f", &path.to_string_lossy()],
        )
        .await?;
        case.add(ResourceHandle::new(oc, "oauthaccesstoken", token.name(), None));
        info!(
            "created token {} for {} with scopes {:?}",
            token.name(),
            user,
            token.scopes
        );
        Ok(token)
    }

    /// The value to send as bearer token.
    pub fn bearer(&self) -> String {
        format!("{}{}", TOKEN_PREFIX, self.token)
    }

    pub fn name(&self) -> String {
        token_object_name(&self.token)
    }

    /// An `oc` that authenticates with this token only, for every role, against the server
    /// `oc` talks to.
    pub async fn oc(&self, oc: &Oc) -> Result<Oc> {
        let server = oc
            .run("whoami", Role::Admin, Scope::ClusterWide, &["--show-server"])
            .await?;
        let kubeconfig = json!({
            "apiVersion": "v1",
            "kind": "Config",
            "clusters": [{
                "name": "cluster",
                "cluster": {"server": server.trim(), "insecure-skip-tls-verify": true},
            }],
            "users": [{"name": self.user, "user": {"token": self.bearer()}}],
            "contexts": [{
                "name": "scoped",
                "context": {"cluster": "cluster", "user": self.user},
            }],
            "current-context": "scoped",
        });
        let path = write_json(oc, "kubeconfig", &kubeconfig).await?;
        Ok(oc.with_config(OcConfig {
            kubeconfig: Some(path.clone()),
            admin_kubeconfig: Some(path),
            ..oc.config().clone()
        }))
    }
}

async fn write_json(oc: &Oc, suffix: &str, value: &serde_json::Value) -> Result<PathBuf> {
    let path = oc
        .config()
        .output_dir
        .join(format!("{}-{}.json", random_string(), suffix));
    tokio::fs::write(&path, value.to_string())
        .await
        .context(error::FileWriteSnafu { path: &path })?;
    Ok(path)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::oc::CommandOutput;
    use serde_json::Value;

    fn oc(runner: &ScriptedRunner, dir: &tempfile::TempDir) -> Oc {
        Oc::with_runner(
            OcConfig {
                admin_kubeconfig: Some("/admin.kubeconfig".into()),
                output_dir: dir.path().to_path_buf(),
                ..OcConfig::default()
            },
            runner.clone(),
        )
    }

    fn read_json(call: &str) -> Value {
        let path = call.rsplit(' ').next().unwrap();
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn object_name_is_token_digest() {
        assert_eq!(
            token_object_name("abc"),
            "sha256~ungWv48Bz-pBQUDeXa4iI7ADYaOWF3qctBD_YfIAFa0"
        );
        assert_eq!(cluster_role_scope("view", "*"), "role:view:*");
    }

    #[tokio::test]
    async fn create_token_for_user() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        runner.respond(
            "get --kubeconfig=/admin.kubeconfig user bob",
            vec![CommandOutput::success("9b5d2c8e-6f3a-4d3e-8e8b-3c7a1f0e2d11")],
        );
        runner.respond("create", vec![CommandOutput::success("created")]);
        let oc = oc(&runner, &dir);
        let mut case = CaseResources::new();
        let scopes = [
            USER_LIST_SCOPED_PROJECTS.to_string(),
            cluster_role_scope("view", "one"),
        ];
        let token = ScopedToken::create(&oc, &mut case, "bob", &scopes)
            .await
            .unwrap();

        assert!(token.bearer().starts_with(TOKEN_PREFIX));
        assert_eq!(token.bearer().len(), TOKEN_PREFIX.len() + TOKEN_LENGTH);
        assert!(case.contains(&token.name(), "oauthaccesstoken", None));
        let manifest = read_json(&runner.calls()[1]);
        assert_eq!(manifest["metadata"]["name"], token.name());
        assert_eq!(manifest["userUID"], "9b5d2c8e-6f3a-4d3e-8e8b-3c7a1f0e2d11");
        assert_eq!(
            manifest["scopes"],
            serde_json::json!(["user:list-scoped-projects", "role:view:one"])
        );
    }

    #[tokio::test]
    async fn missing_user_uid() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        runner.respond("get", vec![CommandOutput::success("")]);
        let mut case = CaseResources::new();
        let oc = oc(&runner, &dir);
        let result = ScopedToken::create(&oc, &mut case, "bob", &[USER_LIST_SCOPED_PROJECTS]).await;
        assert!(matches!(result, Err(crate::Error::Empty { .. })));
        assert!(case.is_empty());
    }

    #[tokio::test]
    async fn token_client_uses_only_the_token() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::default();
        runner.respond(
            "get --kubeconfig=/admin.kubeconfig user",
            vec![CommandOutput::success("uid")],
        );
        runner.respond("create", vec![CommandOutput::success("created")]);
        runner.respond(
            "whoami",
            vec![CommandOutput::success("https://api.example.com:6443")],
        );
        runner.respond("get --kubeconfig=", vec![CommandOutput::success("one two")]);
        let oc = oc(&runner, &dir);
        let mut case = CaseResources::new();
        let token = ScopedToken::create(&oc, &mut case, "bob", &[USER_LIST_SCOPED_PROJECTS])
            .await
            .unwrap();
        let scoped = token.oc(&oc).await.unwrap();
        scoped
            .run("get", Role::User, Scope::ClusterWide, &["projects"])
            .await
            .unwrap();

        let calls = runner.calls();
        let kubeconfig = calls[3]
            .split_whitespace()
            .nth(1)
            .and_then(|arg| arg.strip_prefix("--kubeconfig="))
            .unwrap();
        let kubeconfig: Value =
            serde_json::from_str(&std::fs::read_to_string(kubeconfig).unwrap()).unwrap();
        assert_eq!(kubeconfig["users"][0]["user"]["token"], token.bearer());
        assert_eq!(
            kubeconfig["clusters"][0]["cluster"]["server"],
            "https://api.example.com:6443"
        );
        assert_eq!(scoped.config().kubeconfig, scoped.config().admin_kubeconfig);
    }
}
