use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use std::fmt::Debug;
use tracing::{debug, info, warn};

use crate::{
    Config,
    error::{ErrorDetail, FetchError},
    model::Coordinates,
};

pub mod http;

pub use http::ReqwestTransport;

/// Endpoints exposed by the Kly-mate backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Now,
    NextDayTemperature,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Now => "data/now",
            Endpoint::NextDayTemperature => "predict/nextday/temperature",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "/{}", self.path())
    }
}

/// Raw outcome of a GET that reached the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    /// Client or server error; anything below 400 is handed on as a body.
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.status)
    }
}

/// Failure below the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    Timeout,
    Connect(String),
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    async fn get(&self, url: Url) -> Result<HttpResponse, TransportError>;
}

/// Issues single-attempt GETs against the backend and classifies the outcome.
#[derive(Debug)]
pub struct BackendClient {
    base_url: Url,
    transport: Box<dyn Transport>,
}

impl BackendClient {
    pub fn new(base_url: Url, transport: Box<dyn Transport>) -> Self {
        Self { base_url, transport }
    }

    /// Client using reqwest with the base URL and timeout from `config`.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let base_url = config.base_url()?;
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::new(base_url, Box::new(transport)))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Coordinates are forwarded as-is; range checks are the backend's job.
    pub fn endpoint_url(&self, endpoint: Endpoint, coords: Coordinates) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);

        url.path_segments_mut()
            .map_err(|()| {
                FetchError::Unclassified(format!("Base URL {} cannot carry a path", self.base_url))
            })?
            .pop_if_empty()
            .extend(endpoint.path().split('/'));

        url.query_pairs_mut()
            .append_pair("lat", &coords.latitude.to_string())
            .append_pair("lon", &coords.longitude.to_string());

        Ok(url)
    }

    pub async fn fetch_json(
        &self,
        endpoint: Endpoint,
        coords: Coordinates,
    ) -> Result<Value, FetchError> {
        let url = self.endpoint_url(endpoint, coords)?;
        debug!(%url, "sending request");

        let response = self.transport.get(url).await.map_err(|e| {
            warn!(%endpoint, error = ?e, "transport failure");
            match e {
                TransportError::Timeout => FetchError::Timeout { base_url: self.base_url_label() },
                TransportError::Connect(message) => {
                    FetchError::Network { base_url: self.base_url_label(), message }
                }
            }
        })?;

        info!(%endpoint, status = response.status, "backend responded");

        if response.is_error() {
            warn!(%endpoint, status = response.status, "backend returned error status");
            return Err(FetchError::Http {
                status: response.status,
                detail: ErrorDetail::from_body(&response.body),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| {
            warn!(%endpoint, error = %e, "response body is not JSON");
            FetchError::Format(e.to_string())
        })
    }

    fn base_url_label(&self) -> String {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.as_str().trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::{
        collections::VecDeque,
        sync::{Arc, Mutex},
    };

    /// Replays canned outcomes in order and records every requested URL.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedTransport {
        replies: Arc<Mutex<VecDeque<Result<HttpResponse, TransportError>>>>,
        requests: Arc<Mutex<Vec<Url>>>,
    }

    impl ScriptedTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reply(self, status: u16, body: &str) -> Self {
            self.push(Ok(HttpResponse { status, body: body.to_string() }))
        }

        pub fn fail(self, error: TransportError) -> Self {
            self.push(Err(error))
        }

        fn push(self, outcome: Result<HttpResponse, TransportError>) -> Self {
            self.replies.lock().expect("replies lock").push_back(outcome);
            self
        }

        pub fn requests(&self) -> Vec<Url> {
            self.requests.lock().expect("requests lock").clone()
        }

        pub fn client(&self) -> BackendClient {
            let base = Url::parse("https://klymate.test").expect("valid test URL");
            BackendClient::new(base, Box::new(self.clone()))
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: Url) -> Result<HttpResponse, TransportError> {
            self.requests.lock().expect("requests lock").push(url);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Connect("no scripted reply".into())))
        }
    }
}
