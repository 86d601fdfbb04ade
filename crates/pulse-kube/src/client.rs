//! Thin REST client for the Kubernetes core API.

use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use pulse_proto::{RawNode, RawWorkload};
use reqwest::{Certificate, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tracing::debug;
use url::Url;

use crate::config::KubeConfig;
use crate::error::{KubeError, KubeResult};
use crate::resources::{NodeList, PodList, Resource, WatchEvent};

/// Longest watch line accepted; a single object rarely exceeds this.
const MAX_WATCH_LINE: usize = 4 * 1024 * 1024;

/// Error bodies are truncated to this many bytes in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Client for listing and watching nodes and pods.
#[derive(Clone)]
pub struct KubeClient {
    http: Client,
    base: Url,
    token: Option<String>,
    request_timeout: std::time::Duration,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("base", &self.base.as_str())
            .field("authenticated", &self.token.is_some())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CA bundle is invalid or the TLS backend
    /// cannot be initialized.
    pub fn new(config: &KubeConfig) -> KubeResult<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(config.insecure_skip_tls_verify);

        if let Some(pem) = &config.ca_pem {
            for cert in Certificate::from_pem_bundle(pem)
                .map_err(|e| KubeError::Config(format!("invalid CA bundle: {e}")))?
            {
                builder = builder.add_root_certificate(cert);
            }
        }

        Ok(Self {
            http: builder.build()?,
            base: config.api_server.clone(),
            token: config.token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    /// List all nodes.
    pub async fn list_nodes(&self) -> KubeResult<Vec<RawNode>> {
        let list: NodeList = self.list(Resource::Nodes).await?;
        Ok(list.items.into_iter().map(RawNode::from).collect())
    }

    /// List all pods across namespaces.
    pub async fn list_pods(&self) -> KubeResult<Vec<RawWorkload>> {
        let list: PodList = self.list(Resource::Pods).await?;
        Ok(list.items.into_iter().map(RawWorkload::from).collect())
    }

    /// Open a watch on `resource` and yield its events.
    ///
    /// The stream ends when the server closes the connection. Lines that
    /// fail to decode are reported as [`KubeError::Decode`] items.
    pub async fn watch(
        &self,
        resource: Resource,
    ) -> KubeResult<BoxStream<'static, KubeResult<WatchEvent>>> {
        let url = self.url(resource, true)?;
        debug!(%url, "Opening watch");

        let response = check(resource, self.authorize(self.http.get(url)).send().await?).await?;

        let body = response
            .bytes_stream()
            .map_err(std::io::Error::other);
        let lines = FramedRead::new(
            StreamReader::new(body),
            LinesCodec::new_with_max_length(MAX_WATCH_LINE),
        );

        Ok(lines
            .filter_map(move |line| async move {
                match line {
                    Ok(line) => parse_watch_line(resource, &line).transpose(),
                    Err(e) => Some(Err(KubeError::Watch {
                        resource: resource.as_str(),
                        message: e.to_string(),
                    })),
                }
            })
            .boxed())
    }

    async fn list<T: DeserializeOwned>(&self, resource: Resource) -> KubeResult<T> {
        let url = self.url(resource, false)?;
        let request = self.authorize(self.http.get(url)).timeout(self.request_timeout);

        let response = check(resource, request.send().await?).await?;
        let body = response.bytes().await?;

        serde_json::from_slice(&body).map_err(|source| KubeError::Decode {
            resource: resource.as_str(),
            source,
        })
    }

    /// Resource URL under the base, keeping any path prefix the base has
    /// (for example a proxy serving the API below `/k8s/clusters/<id>`).
    fn url(&self, resource: Resource, watch: bool) -> KubeResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| KubeError::Config(format!("API server URL {} cannot be a base", self.base)))?
            .pop_if_empty()
            .extend(resource.segments());
        if watch {
            url.query_pairs_mut().append_pair("watch", "true");
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

async fn check(resource: Resource, response: Response) -> KubeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let mut body = response.text().await.unwrap_or_default();
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }

    Err(KubeError::Status {
        resource: resource.as_str(),
        status: status.as_u16(),
        body,
    })
}

/// Decode one line of a watch stream.
///
/// Blank lines yield `None`. An `ERROR` event is turned into
/// [`KubeError::Watch`].
pub fn parse_watch_line(resource: Resource, line: &str) -> KubeResult<Option<WatchEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let event: WatchEvent = serde_json::from_str(line).map_err(|source| KubeError::Decode {
        resource: resource.as_str(),
        source,
    })?;

    if event.is_error() {
        return Err(KubeError::Watch {
            resource: resource.as_str(),
            message: event.error_message(),
        });
    }
    Ok(Some(event))
}
