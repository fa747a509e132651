use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::ProtocolVersion;

/// Negotiated protocol version, e.g. `TLS 1.3`
pub fn protocol_version<S>(tls: &TlsStream<S>) -> Option<String> {
    let (_, connection) = tls.get_ref();
    connection.protocol_version().map(version_label)
}

pub fn version_label(version: ProtocolVersion) -> String {
    match version {
        ProtocolVersion::TLSv1_3 => "TLS 1.3",
        ProtocolVersion::TLSv1_2 => "TLS 1.2",
        ProtocolVersion::TLSv1_1 => "TLS 1.1",
        ProtocolVersion::TLSv1_0 => "TLS 1.0",
        _ => "Unknown",
    }
    .to_string()
}
