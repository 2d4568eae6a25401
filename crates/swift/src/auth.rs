use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::HeaderMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, SwiftError};

const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub auth_url: String,
    pub user: String,
    pub key: String,
}

/// Token plus the storage endpoint it is valid for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub storage_url: String,
    pub token: String,
}

#[derive(Debug, Clone)]
struct CachedSession {
    session: Session,
    expires_at: Instant,
}

/// v1 token authentication (tempauth/swauth), cached until shortly before
/// expiry.
#[derive(Clone)]
pub struct AuthProvider {
    credentials: Credentials,
    http: reqwest::Client,
    cache: Arc<RwLock<Option<CachedSession>>>,
}

impl AuthProvider {
    pub fn new(credentials: Credentials, http: reqwest::Client) -> Self {
        Self {
            credentials,
            http,
            cache: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn session(&self) -> Result<Session> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref()
                && cached.expires_at > Instant::now() + EXPIRY_MARGIN
            {
                return Ok(cached.session.clone());
            }
        }

        let resp = self
            .http
            .get(&self.credentials.auth_url)
            .header("X-Auth-User", &self.credentials.user)
            .header("X-Auth-Key", &self.credentials.key)
            .send()
            .await
            .map_err(|source| SwiftError::Transport {
                url: self.credentials.auth_url.clone(),
                source,
            })?;

        if !resp.status().is_success() {
            return Err(SwiftError::Auth(format!(
                "{} returned {}",
                self.credentials.auth_url,
                resp.status()
            )));
        }

        let (session, ttl) = parse_session(resp.headers())?;
        debug!(storage_url = %session.storage_url, "obtained Swift token");
        let mut cache = self.cache.write().await;
        *cache = Some(CachedSession {
            session: session.clone(),
            expires_at: Instant::now() + ttl,
        });
        Ok(session)
    }

    /// Drop the cached token so the next request re-authenticates.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_session(headers: &HeaderMap) -> Result<(Session, Duration)> {
    let storage_url = header_str(headers, "X-Storage-Url")
        .ok_or_else(|| SwiftError::Auth("response carried no X-Storage-Url".to_string()))?;
    let token = header_str(headers, "X-Auth-Token")
        .or_else(|| header_str(headers, "X-Storage-Token"))
        .ok_or_else(|| SwiftError::Auth("response carried no token".to_string()))?;
    let ttl = header_str(headers, "X-Auth-Token-Expires")
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_TOKEN_TTL);
    Ok((
        Session {
            storage_url: storage_url.to_string(),
            token: token.to_string(),
        },
        ttl,
    ))
}
