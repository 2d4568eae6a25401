use std::time::Duration;

use reqwest::{Body, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::auth::{AuthProvider, Credentials};
use crate::error::{Result, SwiftError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    #[serde(default)]
    pub bytes: u64,
}

/// Thin client over the Swift object API. Container and object names are
/// expected to be path-safe already.
#[derive(Clone)]
pub struct SwiftClient {
    auth: AuthProvider,
    http: reqwest::Client,
}

impl SwiftClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| SwiftError::Transport {
                url: credentials.auth_url.clone(),
                source,
            })?;
        let auth = AuthProvider::new(credentials, http.clone());
        Ok(Self { auth, http })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        configure: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<(Response, String)> {
        let session = self.auth.session().await?;
        let url = format!("{}/{path}", session.storage_url.trim_end_matches('/'));
        let request = self
            .http
            .request(method.clone(), &url)
            .header("X-Auth-Token", &session.token);
        let resp = configure(request)
            .send()
            .await
            .map_err(|source| SwiftError::Transport {
                url: url.clone(),
                source,
            })?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            self.auth.invalidate().await;
        }
        debug!(%method, url = %url, status = %resp.status(), "swift request");
        Ok((resp, url))
    }

    /// Issue a request where 404 is an expected answer. Returns `None` on 404.
    async fn send_allow_missing(
        &self,
        method: Method,
        path: &str,
        configure: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Option<Response>> {
        let (resp, url) = self.send(method.clone(), path, configure).await?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp)),
            status => Err(SwiftError::Status {
                method,
                url,
                status,
            }),
        }
    }

    pub async fn head_container(&self, container: &str) -> Result<bool> {
        Ok(self
            .send_allow_missing(Method::HEAD, container, |r| r)
            .await?
            .is_some())
    }

    pub async fn put_container(&self, container: &str) -> Result<()> {
        let (resp, url) = self.send(Method::PUT, container, |r| r).await?;
        if !resp.status().is_success() {
            return Err(SwiftError::Status {
                method: Method::PUT,
                url,
                status: resp.status(),
            });
        }
        Ok(())
    }

    pub async fn head_object(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .send_allow_missing(Method::HEAD, &format!("{container}/{name}"), |r| r)
            .await?
            .is_some())
    }

    /// Start a download. The body has not been read when this returns.
    pub async fn get_object(&self, container: &str, name: &str) -> Result<Option<Response>> {
        self.send_allow_missing(Method::GET, &format!("{container}/{name}"), |r| r)
            .await
    }

    pub async fn put_object(&self, container: &str, name: &str, body: Body) -> Result<()> {
        let (resp, url) = self
            .send(Method::PUT, &format!("{container}/{name}"), |r| r.body(body))
            .await?;
        if !resp.status().is_success() {
            return Err(SwiftError::Status {
                method: Method::PUT,
                url,
                status: resp.status(),
            });
        }
        Ok(())
    }

    /// Returns whether an object was deleted.
    pub async fn delete_object(&self, container: &str, name: &str) -> Result<bool> {
        Ok(self
            .send_allow_missing(Method::DELETE, &format!("{container}/{name}"), |r| r)
            .await?
            .is_some())
    }

    /// One page of the container listing, ordered by name, starting after
    /// `marker`.
    pub async fn list_objects(
        &self,
        container: &str,
        marker: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ObjectEntry>> {
        let limit = limit.to_string();
        let (resp, url) = self
            .send(Method::GET, container, |r| {
                let r = r.query(&[("format", "json"), ("limit", limit.as_str())]);
                match marker {
                    Some(marker) => r.query(&[("marker", marker)]),
                    None => r,
                }
            })
            .await?;
        match resp.status() {
            StatusCode::NO_CONTENT => Ok(Vec::new()),
            status if status.is_success() => resp
                .json()
                .await
                .map_err(|source| SwiftError::Listing { url, source }),
            status => Err(SwiftError::Status {
                method: Method::GET,
                url,
                status,
            }),
        }
    }
}
