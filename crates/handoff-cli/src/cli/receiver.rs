//! Reference agent endpoint: accepts hand-off POSTs, reads until the end
//! marker, and acknowledges. One request per connection.

use anyhow::{Context, Result};
use handoff_core::descriptor::{has_end_marker, parse_frame, TransferDescriptor};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Upper bound on one request, headers included.
const MAX_REQUEST_BYTES: usize = 1 << 20;

/// Time a client gets to deliver its whole request.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts connections forever, calling `on_descriptor` for each parsed frame.
pub async fn serve<F>(
    listener: TcpListener,
    refuse: bool,
    read_timeout: Duration,
    on_descriptor: F,
) -> Result<()>
where
    F: Fn(TransferDescriptor) + Send + Sync + Clone + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        let on_descriptor = on_descriptor.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, refuse, read_timeout, on_descriptor).await {
                tracing::debug!(%peer, "receiver connection: {:#}", e);
            }
        });
    }
}

async fn handle_connection<F>(
    mut stream: TcpStream,
    refuse: bool,
    read_timeout: Duration,
    on_descriptor: F,
) -> Result<()>
where
    F: Fn(TransferDescriptor),
{
    let body = tokio::time::timeout(read_timeout, read_body(&mut stream))
        .await
        .context("request not completed in time")??;
    let (status, reply) = if refuse {
        ("503 Service Unavailable", "busy")
    } else {
        match parse_frame(&body) {
            Ok(descriptor) => {
                on_descriptor(descriptor);
                ("200 OK", "ok")
            }
            Err(e) => {
                tracing::warn!("rejecting hand-off: {}", e);
                ("400 Bad Request", "bad frame")
            }
        }
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reply.len(),
        reply
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Reads the request and returns its body: everything after the header block,
/// up to the end marker or `Content-Length`, whichever comes first.
async fn read_body(stream: &mut TcpStream) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut header_end = None;
    loop {
        if let Some(start) = header_end {
            let body = &buf[start..];
            let wanted = content_length(&buf[..start]);
            if has_end_marker(body) || wanted.is_some_and(|n| body.len() >= n) {
                return Ok(body.to_vec());
            }
        }
        if buf.len() > MAX_REQUEST_BYTES {
            anyhow::bail!("request larger than {} bytes", MAX_REQUEST_BYTES);
        }
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            let start = header_end.unwrap_or(buf.len());
            return Ok(buf[start..].to_vec());
        }
        buf.extend_from_slice(&chunk[..n]);
        if header_end.is_none() {
            header_end = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4);
        }
    }
}

fn content_length(head: &[u8]) -> Option<usize> {
    String::from_utf8_lossy(head)
        .lines()
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    async fn post(addr: std::net::SocketAddr, body: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "POST / HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn acknowledges_valid_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        tokio::spawn(serve(listener, false, READ_TIMEOUT, move |d: TransferDescriptor| {
            sink.lock().unwrap().push(d.url);
        }));

        let frame = "{\"url\":\"https://ex.com/f.bin\",\"size\":1,\"file_name\":\"f.bin\"}\n<END>\n";
        let response = post(addr, frame).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("ok"));
        assert_eq!(*seen.lock().unwrap(), vec!["https://ex.com/f.bin".to_string()]);
    }

    #[tokio::test]
    async fn rejects_frame_without_marker() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, false, READ_TIMEOUT, |_d: TransferDescriptor| {}));
        let response = post(addr, "{\"url\":\"x\"}").await;
        assert!(response.starts_with("HTTP/1.1 400"));
    }

    #[tokio::test]
    async fn refuse_mode_answers_503() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve(listener, true, READ_TIMEOUT, |_d: TransferDescriptor| {}));
        let response = post(addr, "{}\n<END>\n").await;
        assert!(response.starts_with("HTTP/1.1 503"));
    }

    #[tokio::test]
    async fn stalled_client_is_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        let count = Arc::clone(&seen);
        tokio::spawn(serve(
            listener,
            false,
            Duration::from_millis(200),
            move |_d: TransferDescriptor| *count.lock().unwrap() += 1,
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST / HTTP/1.1\r\nHost: 127.0.0.1\r\nContent-Length: 500\r\n\r\n{")
            .await
            .unwrap();
        let mut buf = [0u8; 64];
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("server closes the stalled connection")
            .unwrap_or(0);
        assert_eq!(n, 0);
        assert_eq!(*seen.lock().unwrap(), 0);
    }
}
