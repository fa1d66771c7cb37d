//! BOSH director adapter, authenticating with basic auth or a UAA token.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::{status_error, REQUEST_TIMEOUT, USER_AGENT};
use crate::config::BoshConfig;
use crate::error::PortError;
use crate::ports::{DeploymentInfo, Director, PortFuture};

/// UAA client used by the BOSH CLI for the password grant.
pub const UAA_CLI_CLIENT: &str = "bosh_cli";

// Tokens are renewed this many seconds before they expire.
const EXPIRY_MARGIN_SECS: i64 = 30;

/// How requests to the director are authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorAuth {
    /// HTTP basic auth, for directors without UAA.
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// UAA password grant through the `bosh_cli` client.
    UaaPasswordGrant {
        /// UAA base URL advertised by the director.
        uaa_url: String,
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// UAA client-credentials grant.
    UaaClientCredentials {
        /// UAA base URL advertised by the director.
        uaa_url: String,
        /// Client id.
        client_id: String,
        /// Client secret.
        client_secret: String,
    },
}

/// `/info` response, reduced to what auth selection needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DirectorInfo {
    /// Director name.
    #[serde(default)]
    pub name: String,
    /// Authentication scheme advertised by the director.
    #[serde(default)]
    pub user_authentication: UserAuthentication,
}

/// `user_authentication` block of `/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAuthentication {
    /// `basic` or `uaa`.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Scheme options.
    #[serde(default)]
    pub options: AuthOptions,
}

/// `user_authentication.options` block of `/info`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthOptions {
    /// UAA URL, present for `uaa`.
    pub url: Option<String>,
}

impl DirectorAuth {
    /// Picks the authentication scheme from the director's advertised
    /// scheme and the configured credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the director advertises UAA without a URL.
    pub fn select(auth: &UserAuthentication, config: &BoshConfig) -> Result<Self, String> {
        if auth.kind != "uaa" {
            return Ok(Self::Basic { username: config.username.clone(), password: config.password.clone() });
        }
        let uaa_url = auth
            .options
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or("director advertises uaa authentication without a url")?;
        if !config.client_id.is_empty() && !config.client_secret.is_empty() {
            Ok(Self::UaaClientCredentials {
                uaa_url,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
            })
        } else {
            Ok(Self::UaaPasswordGrant {
                uaa_url,
                username: config.username.clone(),
                password: config.password.clone(),
            })
        }
    }

    /// Short name of the scheme, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic { .. } => "basic",
            Self::UaaPasswordGrant { .. } => "uaa-password",
            Self::UaaClientCredentials { .. } => "uaa-client-credentials",
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct Token {
    access: String,
    refresh: Option<String>,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DeploymentResponse {
    #[serde(default)]
    manifest: String,
}

/// Director reached over HTTPS.
pub struct LiveDirector {
    base_url: String,
    auth: DirectorAuth,
    client: reqwest::Client,
    token: Mutex<Option<Token>>,
}

impl LiveDirector {
    /// Connects to the director: builds the HTTP client, reads `/info` to
    /// select the authentication scheme and, for UAA, fetches a first token.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA certificate or proxy is invalid, the
    /// director is unreachable or token issuance fails.
    pub async fn connect(config: &BoshConfig) -> Result<Self, PortError> {
        let client = build_client(config)?;
        let base_url = config.url.trim_end_matches('/').to_string();

        let response = client.get(format!("{base_url}/info")).send().await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let info: DirectorInfo = response.json().await?;
        let auth = DirectorAuth::select(&info.user_authentication, config)?;
        debug!(director = %info.name, auth = auth.kind(), "connected to director");

        let director = Self { base_url, auth, client, token: Mutex::new(None) };
        if !matches!(director.auth, DirectorAuth::Basic { .. }) {
            director.bearer().await?;
        }
        Ok(director)
    }

    /// Selected authentication scheme.
    #[must_use]
    pub fn auth(&self) -> &DirectorAuth {
        &self.auth
    }

    /// Returns a valid access token, fetching or refreshing it as needed.
    async fn bearer(&self) -> Result<String, PortError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Utc::now() + chrono::Duration::seconds(EXPIRY_MARGIN_SECS) < token.expires_at {
                return Ok(token.access.clone());
            }
        }

        let refresh = cached.as_ref().and_then(|t| t.refresh.clone());
        let token = match refresh {
            Some(refresh_token) => match self
                .request_token(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())])
                .await
            {
                Ok(token) => token,
                Err(e) => {
                    debug!(error = %e, "token refresh failed, requesting a new token");
                    self.grant().await?
                }
            },
            None => self.grant().await?,
        };
        let access = token.access.clone();
        *cached = Some(token);
        Ok(access)
    }

    async fn grant(&self) -> Result<Token, PortError> {
        match &self.auth {
            DirectorAuth::UaaPasswordGrant { username, password, .. } => {
                self.request_token(&[
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                ])
                .await
            }
            DirectorAuth::UaaClientCredentials { .. } => {
                self.request_token(&[("grant_type", "client_credentials")]).await
            }
            DirectorAuth::Basic { .. } => Err("basic authentication has no token".into()),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<Token, PortError> {
        let (uaa_url, client, secret) = match &self.auth {
            DirectorAuth::UaaPasswordGrant { uaa_url, .. } => (uaa_url, UAA_CLI_CLIENT, ""),
            DirectorAuth::UaaClientCredentials { uaa_url, client_id, client_secret } => {
                (uaa_url, client_id.as_str(), client_secret.as_str())
            }
            DirectorAuth::Basic { .. } => return Err("basic authentication has no token".into()),
        };
        let response = self
            .client
            .post(format!("{}/oauth/token", uaa_url.trim_end_matches('/')))
            .basic_auth(client, Some(secret))
            .form(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        let body: TokenResponse = response.json().await?;
        Ok(Token {
            access: body.access_token,
            refresh: body.refresh_token,
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        })
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, PortError> {
        let request = self.client.get(format!("{}{path}", self.base_url));
        let request = match &self.auth {
            DirectorAuth::Basic { username, password } => request.basic_auth(username, Some(password)),
            _ => request.bearer_auth(self.bearer().await?),
        };
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }
}

fn build_client(config: &BoshConfig) -> Result<reqwest::Client, PortError> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT);
    if !config.ca_cert.is_empty() {
        let pem = std::fs::read(&config.ca_cert)
            .map_err(|e| format!("unable to read ca_cert {}: {e}", config.ca_cert))?;
        builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
    }
    if !config.proxy.is_empty() {
        builder = builder.proxy(reqwest::Proxy::all(&config.proxy)?);
    }
    Ok(builder.build()?)
}

impl Director for LiveDirector {
    fn list_deployments(&self) -> PortFuture<'_, Vec<DeploymentInfo>> {
        Box::pin(async move { Ok(self.get("/deployments").await?.json().await?) })
    }

    fn deployment_manifest<'a>(&'a self, name: &'a str) -> PortFuture<'a, String> {
        Box::pin(async move {
            let deployment: DeploymentResponse = self.get(&format!("/deployments/{name}")).await?.json().await?;
            Ok(deployment.manifest)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::testserver::{route, serve};

    fn bosh(url: &str) -> BoshConfig {
        BoshConfig {
            url: url.to_string(),
            username: "admin".into(),
            password: "secret".into(),
            ..BoshConfig::default()
        }
    }

    fn uaa(url: Option<&str>) -> UserAuthentication {
        UserAuthentication { kind: "uaa".into(), options: AuthOptions { url: url.map(str::to_string) } }
    }

    #[test]
    fn basic_unless_uaa_is_advertised() {
        let auth = DirectorAuth::select(&UserAuthentication::default(), &bosh("x")).unwrap();
        assert_eq!(auth, DirectorAuth::Basic { username: "admin".into(), password: "secret".into() });
    }

    #[test]
    fn client_credentials_need_both_id_and_secret() {
        let mut config = bosh("x");
        config.client_id = "exporter".into();
        let auth = DirectorAuth::select(&uaa(Some("https://uaa")), &config).unwrap();
        assert_eq!(auth.kind(), "uaa-password");

        config.client_secret = "s3cr3t".into();
        let auth = DirectorAuth::select(&uaa(Some("https://uaa")), &config).unwrap();
        assert_eq!(
            auth,
            DirectorAuth::UaaClientCredentials {
                uaa_url: "https://uaa".into(),
                client_id: "exporter".into(),
                client_secret: "s3cr3t".into(),
            }
        );
    }

    #[test]
    fn uaa_without_url_is_rejected() {
        assert!(DirectorAuth::select(&uaa(None), &bosh("x")).is_err());
    }

    #[tokio::test]
    async fn basic_director_lists_deployments_and_manifests() {
        let url = serve(vec![
            route("/info", 200, r#"{"name":"lab","user_authentication":{"type":"basic","options":{}}}"#),
            route("/deployments/cf", 200, r#"{"manifest":"manifest_version: v1\n"}"#),
            route("/deployments", 200, r#"[{"name":"cf","releases":[],"stemcells":[]}]"#),
        ])
        .await;
        let director = LiveDirector::connect(&bosh(&url)).await.unwrap();
        assert_eq!(director.auth().kind(), "basic");
        let deployments = director.list_deployments().await.unwrap();
        assert_eq!(deployments, vec![DeploymentInfo { name: "cf".into() }]);
        assert_eq!(director.deployment_manifest("cf").await.unwrap(), "manifest_version: v1\n");
    }

    #[tokio::test]
    async fn uaa_token_is_fetched_at_connect() {
        let url = serve(vec![route(
            "/oauth/token",
            200,
            r#"{"access_token":"abc","token_type":"bearer","expires_in":3600}"#,
        )])
        .await;
        let info = format!(r#"{{"user_authentication":{{"type":"uaa","options":{{"url":"{url}"}}}}}}"#);
        let director_url = serve(vec![route("/info", 200, info), route("/deployments", 200, "[]")]).await;

        let director = LiveDirector::connect(&bosh(&director_url)).await.unwrap();
        assert_eq!(director.auth().kind(), "uaa-password");
        assert!(director.list_deployments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_credentials_fail_connect() {
        let uaa_url = serve(vec![route(
            "/oauth/token",
            401,
            r#"{"error":"unauthorized","error_description":"Bad credentials"}"#,
        )])
        .await;
        let info = format!(r#"{{"user_authentication":{{"type":"uaa","options":{{"url":"{uaa_url}"}}}}}}"#);
        let director_url = serve(vec![route("/info", 200, info)]).await;

        let err = LiveDirector::connect(&bosh(&director_url)).await.err().unwrap();
        assert!(err.to_string().contains("Bad credentials"), "{err}");
    }
}
