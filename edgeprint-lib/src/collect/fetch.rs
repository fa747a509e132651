use std::net::{IpAddr, SocketAddr};
use std::time::Instant;

use bytes::Bytes;
use http::header::{ACCEPT, HOST, USER_AGENT};
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::Empty;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::collect::target::{Scheme, Target};
use crate::config::HttpConfig;
use crate::error::{EdgeprintError, Result};
use crate::tls;

/// Response head captured from one IP.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Negotiated TLS version for https targets
    pub tls_version: Option<String>,
    pub duration_ms: u64,
}

/// Issues a single `GET` against a specific IP of a target, bypassing DNS.
#[derive(Clone)]
pub struct HeaderFetcher {
    config: HttpConfig,
    connector: TlsConnector,
}

impl HeaderFetcher {
    pub fn new(config: HttpConfig) -> Result<Self> {
        let connector = tls::build_connector(config.accept_invalid_certs)?;
        Ok(Self { config, connector })
    }

    pub fn connector(&self) -> &TlsConnector {
        &self.connector
    }

    /// Fetches the response head of `target` from `ip`. The whole exchange is
    /// bounded by the configured timeout; the body is never read.
    pub async fn fetch(&self, target: &Target, ip: IpAddr) -> Result<FetchResult> {
        let started = Instant::now();
        let (status, headers, tls_version) =
            timeout(self.config.timeout(), self.exchange(target, ip))
                .await
                .map_err(|_| EdgeprintError::Timeout(self.config.timeout_ms))??;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(%ip, status = status.as_u16(), duration_ms, "fetched headers");

        Ok(FetchResult { status, headers, tls_version, duration_ms })
    }

    async fn exchange(
        &self,
        target: &Target,
        ip: IpAddr,
    ) -> Result<(StatusCode, HeaderMap, Option<String>)> {
        let stream = TcpStream::connect(SocketAddr::new(ip, target.port)).await?;

        match target.scheme {
            Scheme::Http => {
                let (status, headers) = self.send(stream, target).await?;
                Ok((status, headers, None))
            }
            Scheme::Https => {
                let sni = tls::server_name(&target.host)?;
                let tls_stream = self
                    .connector
                    .connect(sni, stream)
                    .await
                    .map_err(|e| EdgeprintError::Tls(format!("Handshake with {ip} failed: {e}")))?;
                let version = tls::protocol_version(&tls_stream);
                let (status, headers) = self.send(tls_stream, target).await?;
                Ok((status, headers, version))
            }
        }
    }

    async fn send<S>(&self, io: S, target: &Target) -> Result<(StatusCode, HeaderMap)>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io))
            .await
            .map_err(|e| EdgeprintError::Http(format!("Handshake failed: {e}")))?;

        let conn_task = tokio::spawn(async move {
            if let Err(e) = conn.await {
                debug!(error = %e, "connection closed with error");
            }
        });

        let request = Request::builder()
            .method(Method::GET)
            .uri(target.path_and_query.as_str())
            .header(HOST, target.host_header())
            .header(USER_AGENT, self.config.user_agent.as_str())
            .header(ACCEPT, "*/*")
            .body(Empty::<Bytes>::new())
            .map_err(|e| EdgeprintError::Http(format!("Failed to build request: {e}")))?;

        let result = sender.send_request(request).await;
        conn_task.abort();

        let response =
            result.map_err(|e| EdgeprintError::Http(format!("Request failed: {e}")))?;
        let (parts, _body) = response.into_parts();
        Ok((parts.status, parts.headers))
    }
}
