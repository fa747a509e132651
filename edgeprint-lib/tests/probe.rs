use std::net::SocketAddr;
use std::time::Duration;

use edgeprint_lib::config::ProbeConfig;
use edgeprint_lib::probe::{ConnectionProbe, ProbeError, ProbeOutcome, QualityTier, Transport};
use edgeprint_lib::tls;
use socket2::SockRef;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

type TestResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

fn fast_config() -> ProbeConfig {
    ProbeConfig {
        connect_timeout_ms: 1000,
        write_timeout_ms: 1000,
        read_timeout_ms: 200,
        max_read_attempts: 2,
        retry_delay_ms: 10,
        tls_fallback: false,
        ..ProbeConfig::default()
    }
}

/// Accepts one connection, reads the request and answers with `reply`.
async fn serve_once(reply: &'static [u8]) -> Result<SocketAddr, std::io::Error> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 1024];
        let _ = stream.read(&mut buf).await;
        let _ = stream.write_all(reply).await;
        let _ = stream.shutdown().await;
    });

    Ok(addr)
}

#[tokio::test]
async fn probe_decodes_reply_bytes() -> TestResult {
    let addr = serve_once(b"HTTP/1.1 200 OK\r\nServer: test\r\nContent-Length: 0\r\n\r\n").await?;
    let probe = ConnectionProbe::new(fast_config(), None);

    let sample = probe.probe(addr, None).await?;
    assert_eq!(sample.transport, Transport::Tcp);
    assert!(sample.bytes_read >= 20);
    assert_eq!(sample.header.source_port, u16::from_be_bytes(*b"HT"));
    assert!(sample.keep_alive_supported);
    assert_eq!(
        sample.quality,
        QualityTier::from_phases(sample.connect_ms, sample.write_ms, sample.read_ms)
    );
    Ok(())
}

#[tokio::test]
async fn probe_sends_minimal_request() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        let mut buf = vec![0u8; 1024];
        let n = stream.read(&mut buf).await?;
        buf.truncate(n);
        stream.write_all(&[0u8; 32]).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    let probe = ConnectionProbe::new(fast_config(), None);
    probe.probe(addr, None).await?;

    let request = server.await??;
    assert_eq!(
        String::from_utf8(request)?,
        "GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n"
    );
    Ok(())
}

#[tokio::test]
async fn short_reply_is_a_decode_error() -> TestResult {
    let addr = serve_once(b"HTTP/1.1 400\r\n").await?;
    let probe = ConnectionProbe::new(fast_config(), None);

    let result = probe.probe(addr, None).await;
    assert!(matches!(result, Err(ProbeError::Decode(_))), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn closed_connection_without_data_is_no_data() -> TestResult {
    let addr = serve_once(b"").await?;
    let probe = ConnectionProbe::new(fast_config(), None);

    let result = probe.probe(addr, None).await;
    assert!(matches!(result, Err(ProbeError::NoData { .. })), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn silent_peer_exhausts_read_attempts() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(stream);
    });

    let probe = ConnectionProbe::new(fast_config(), None);
    let result = probe.probe(addr, None).await;
    assert!(matches!(result, Err(ProbeError::NoData { attempts: 2 })), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn refused_connection_is_a_connect_error() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let probe = ConnectionProbe::new(fast_config(), None);
    let outcome = ProbeOutcome::from(probe.probe(addr, None).await);
    assert!(matches!(outcome, ProbeOutcome::Error(ref e) if e.contains("failed")), "{outcome:?}");
    Ok(())
}

const LATE_REPLY: &[u8] = b"HTTP/1.1 200 OK\r\nServer: x\r\n";

#[tokio::test]
async fn late_reply_is_read_on_a_later_attempt() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 1024];
        let _ = stream.read(&mut buf).await;
        // Past the first per-attempt deadline of 200 ms
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = stream.write_all(LATE_REPLY).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
    });

    let config = ProbeConfig { max_read_attempts: 3, ..fast_config() };
    let probe = ConnectionProbe::new(config, None);

    let sample = probe.probe(addr, None).await?;
    assert_eq!(sample.bytes_read, LATE_REPLY.len());
    assert!(sample.read_ms >= 200, "read_ms = {}", sample.read_ms);
    Ok(())
}

#[tokio::test]
async fn reset_by_peer_aborts_without_retry() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((mut stream, _)) = listener.accept().await else {
            return;
        };
        let mut buf = vec![0u8; 1024];
        let _ = stream.read(&mut buf).await;
        // Zero linger turns the close into an RST
        let _ = SockRef::from(&stream).set_linger(Some(Duration::ZERO));
        drop(stream);
    });

    let config = ProbeConfig { max_read_attempts: 3, ..fast_config() };
    let probe = ConnectionProbe::new(config, None);

    let result = probe.probe(addr, None).await;
    assert!(matches!(result, Err(ProbeError::Read { attempts: 1, .. })), "{result:?}");
    Ok(())
}

#[tokio::test]
async fn refused_connection_falls_back_to_tls() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let config = ProbeConfig { tls_fallback: true, ..fast_config() };
    let probe = ConnectionProbe::new(config, Some(tls::build_connector(true)?));

    let result = probe.probe(addr, Some("localhost")).await;
    match result {
        Err(ProbeError::Connect { reason, .. }) => {
            assert!(reason.contains("tcp:"), "{reason}");
            assert!(reason.contains("tls:"), "{reason}");
        }
        other => return Err(format!("expected connect error, got {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn fallback_disabled_ignores_connector() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let probe = ConnectionProbe::new(fast_config(), Some(tls::build_connector(true)?));

    let result = probe.probe(addr, None).await;
    match result {
        Err(ProbeError::Connect { reason, .. }) => assert!(!reason.contains("tls:"), "{reason}"),
        other => return Err(format!("expected connect error, got {other:?}").into()),
    }
    Ok(())
}

#[test]
fn quality_is_monotonic_in_each_phase() {
    let rank = |q: QualityTier| q as u8;
    for base in [0u64, 20, 49, 120, 299, 1000] {
        for step in [1u64, 30, 200] {
            let q = QualityTier::from_phases(base, 0, 0);
            assert!(rank(QualityTier::from_phases(base + step, 0, 0)) >= rank(q));
            assert!(rank(QualityTier::from_phases(base, step, 0)) >= rank(q));
            assert!(rank(QualityTier::from_phases(base, 0, step)) >= rank(q));
        }
    }
}

#[test]
fn sample_serializes_with_stable_identifiers() -> TestResult {
    let json = serde_json::to_value(ProbeOutcome::Error("no data".into()))?;
    assert_eq!(json["error"], "no data");
    assert_eq!(serde_json::to_value(QualityTier::Excellent)?, "Excellent");
    assert_eq!(serde_json::to_value(Transport::Tls)?, "tls");
    Ok(())
}
