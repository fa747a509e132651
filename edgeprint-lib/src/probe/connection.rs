use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde::Serialize;
use socket2::SockRef;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tokio_util::either::Either;
use tracing::{debug, warn};

use crate::config::ProbeConfig;
use crate::probe::quality::QualityTier;
use crate::probe::segment::{self, SegmentHeader, TcpOption};
use crate::probe::ProbeError;
use crate::tls;

type ProbeStream = Either<TcpStream, TlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Tcp,
    Tls,
}

/// Timings and decoded bytes of one successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSample {
    pub connect_ms: u64,
    pub write_ms: u64,
    pub read_ms: u64,
    pub keep_alive_supported: bool,
    pub quality: QualityTier,
    pub transport: Transport,
    pub bytes_read: usize,
    pub header: SegmentHeader,
    pub options: Vec<TcpOption>,
    pub options_truncated: bool,
}

/// Probe result as reported per IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeOutcome {
    Sample(ConnectionSample),
    Error(String),
}

impl From<Result<ConnectionSample, ProbeError>> for ProbeOutcome {
    fn from(result: Result<ConnectionSample, ProbeError>) -> Self {
        match result {
            Ok(sample) => Self::Sample(sample),
            Err(e) => Self::Error(e.to_string()),
        }
    }
}

/// Dials an endpoint, sends a minimal request and decodes the first reply
/// bytes.
///
/// Holds only configuration and can be shared across tasks.
#[derive(Clone)]
pub struct ConnectionProbe {
    config: ProbeConfig,
    connector: Option<TlsConnector>,
}

impl ConnectionProbe {
    /// `connector` is used for the TLS fallback; without one a failed TCP
    /// dial is final.
    pub fn new(config: ProbeConfig, connector: Option<TlsConnector>) -> Self {
        let connector = if config.tls_fallback { connector } else { None };
        Self { config, connector }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probes `addr`. `server_name` is the SNI for the TLS fallback and
    /// defaults to the IP.
    pub async fn probe(
        &self,
        addr: SocketAddr,
        server_name: Option<&str>,
    ) -> Result<ConnectionSample, ProbeError> {
        let started = Instant::now();
        let (mut stream, transport, keep_alive_supported) =
            self.connect(addr, server_name).await?;
        let connect_ms = millis(started.elapsed());
        debug!(%addr, ?transport, connect_ms, "probe connected");

        let write_started = Instant::now();
        self.write_request(&mut stream, addr).await?;
        let write_ms = millis(write_started.elapsed());

        let read_started = Instant::now();
        let bytes = self.read_with_retries(&mut stream).await?;
        let read_ms = millis(read_started.elapsed());

        let decoded = segment::decode(&bytes)?;
        if decoded.options_truncated {
            debug!(%addr, "option area truncated");
        }

        Ok(ConnectionSample {
            connect_ms,
            write_ms,
            read_ms,
            keep_alive_supported,
            quality: QualityTier::from_phases(connect_ms, write_ms, read_ms),
            transport,
            bytes_read: bytes.len(),
            header: decoded.header,
            options: decoded.options,
            options_truncated: decoded.options_truncated,
        })
    }

    async fn connect(
        &self,
        addr: SocketAddr,
        server_name: Option<&str>,
    ) -> Result<(ProbeStream, Transport, bool), ProbeError> {
        let tcp_err = match self.dial(addr).await {
            Ok(stream) => {
                let keep_alive = enable_keepalive(&stream);
                return Ok((Either::Left(stream), Transport::Tcp, keep_alive));
            }
            Err(e) => e,
        };

        let Some(connector) = &self.connector else {
            return Err(ProbeError::Connect { addr, reason: tcp_err.to_string() });
        };
        warn!(%addr, error = %tcp_err, "TCP connect failed, trying TLS");

        let connect_err = |tls_reason: String| ProbeError::Connect {
            addr,
            reason: format!("tcp: {tcp_err}; tls: {tls_reason}"),
        };
        let name = server_name.map(str::to_string).unwrap_or_else(|| addr.ip().to_string());
        let sni = tls::server_name(&name).map_err(|e| connect_err(e.to_string()))?;

        let stream = self.dial(addr).await.map_err(|e| connect_err(e.to_string()))?;
        let keep_alive = enable_keepalive(&stream);
        let tls_stream = timeout(self.config.connect_timeout(), connector.connect(sni, stream))
            .await
            .map_err(|_| connect_err("TLS handshake timed out".to_string()))?
            .map_err(|e| connect_err(e.to_string()))?;

        Ok((Either::Right(tls_stream), Transport::Tls, keep_alive))
    }

    async fn dial(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        timeout(self.config.connect_timeout(), TcpStream::connect(addr))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))?
    }

    async fn write_request(
        &self,
        stream: &mut ProbeStream,
        addr: SocketAddr,
    ) -> Result<(), ProbeError> {
        let request = probe_request(addr);
        let write = async {
            stream.write_all(request.as_bytes()).await?;
            stream.flush().await
        };

        match timeout(self.config.write_timeout(), write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Write(e.to_string())),
            Err(_) => Err(ProbeError::WriteTimeout(self.config.write_timeout_ms)),
        }
    }

    /// Reads until the first non-empty chunk. Only timeout-class failures are
    /// retried, each attempt with a fresh deadline.
    async fn read_with_retries<S>(&self, stream: &mut S) -> Result<Vec<u8>, ProbeError>
    where
        S: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.config.buffer_size];
        let max_attempts = self.config.max_read_attempts;
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            match timeout(self.config.read_timeout(), stream.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Ok(Err(e)) if is_timeout(&e) => {
                    debug!(attempt = attempts, error = %e, "read timed out");
                }
                Ok(Err(e)) => {
                    return Err(ProbeError::Read { attempts, reason: e.to_string() });
                }
                Err(_) => {
                    debug!(attempt = attempts, "read deadline elapsed");
                }
            }
            if attempts < max_attempts {
                tokio::time::sleep(self.config.retry_delay()).await;
            }
        }

        Err(ProbeError::NoData { attempts })
    }
}

/// `GET /` addressed to the bare IP, asking the peer to close afterwards.
pub fn probe_request(addr: SocketAddr) -> String {
    format!("GET / HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", addr.ip())
}

fn enable_keepalive(stream: &TcpStream) -> bool {
    SockRef::from(stream).set_keepalive(true).is_ok()
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
