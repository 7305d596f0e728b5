// Connection handling module
// Serves one accepted TCP connection with hyper's HTTP/1 driver

use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Collected, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, Uri};
use hyper_util::rt::TokioIo;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;

use crate::config::AppState;
use crate::handler;
use crate::http;
use crate::logger;

/// Longest request line accepted before the request is rejected
const MAX_REQUEST_LINE: u64 = 8 * 1024;

/// Empty lines tolerated ahead of the first request line
const MAX_LEADING_BLANK_LINES: usize = 4;

/// How long a rejected client gets to finish sending before the socket closes
const REJECT_LINGER: Duration = Duration::from_secs(1);

/// Outcome of reading the first request line of a connection
#[derive(Debug, PartialEq, Eq)]
enum RequestLine {
    /// Peer closed before sending anything
    Closed,
    /// Well-formed line, raw bytes including the line ending
    Valid(Vec<u8>),
    /// Line hyper would refuse, with the line ending stripped
    Malformed(String),
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Checks the first request line, answering garbage with a decorated 400
/// 2. Configures HTTP/1.1 connection settings (keep-alive)
/// 3. Serves the connection with the request handler
/// 4. Applies the optional connection timeout
///
/// Failures stay inside the task; a broken connection never reaches the
/// accept loop.
pub fn spawn_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<AppState>) {
    tokio::spawn(async move {
        let timeout_secs = state.config.performance.connection_timeout;
        let session = serve_connection(stream, peer_addr, Arc::clone(&state));

        let result = if timeout_secs > 0 {
            let limit = Duration::from_secs(timeout_secs);
            if let Ok(result) = tokio::time::timeout(limit, session).await {
                result
            } else {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} closed after {} seconds",
                    limit.as_secs()
                ));
                return;
            }
        } else {
            session.await
        };

        if let Err(err) = result {
            if err.is_parse() {
                // A later request on a kept-alive connection; hyper answered it
                if state.config.logging.access_log {
                    logger::log_rejected_request(&[]);
                }
            } else if !(err.is_incomplete_message() || err.is_canceled()) {
                // Clients hanging up mid-exchange are routine for a dev server
                logger::log_connection_error(&err);
            }
        }
    });
}

async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
) -> Result<(), hyper::Error> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let first_line = match read_request_line(&mut reader).await {
        Ok(RequestLine::Valid(line)) => line,
        Ok(RequestLine::Malformed(line)) => {
            reject_malformed(&mut reader, &mut write_half, &state, &line).await;
            return Ok(());
        }
        // Nothing sent, or the peer reset while we were reading
        Ok(RequestLine::Closed) | Err(_) => return Ok(()),
    };

    // hyper sees the connection from its first byte again
    let replayed = Cursor::new(first_line).chain(reader);
    let io = TokioIo::new(tokio::io::join(replayed, write_half));

    let mut builder = http1::Builder::new();
    builder.keep_alive(state.config.performance.keep_alive);

    let service_state = Arc::clone(&state);
    builder
        .serve_connection(
            io,
            service_fn(move |req: Request<Incoming>| {
                let state = Arc::clone(&service_state);
                // Bodies are never read; dropping it here keeps the handler body-agnostic
                async move { handler::handle_request(req.map(|_| ()), state, peer_addr).await }
            }),
        )
        .await
}

/// Read the request line, skipping a few leading empty lines
async fn read_request_line<R>(reader: &mut R) -> std::io::Result<RequestLine>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    for _ in 0..=MAX_LEADING_BLANK_LINES {
        line.clear();
        let read = (&mut *reader)
            .take(MAX_REQUEST_LINE)
            .read_until(b'\n', &mut line)
            .await?;
        if read == 0 {
            return Ok(RequestLine::Closed);
        }
        if line != b"\r\n" && line != b"\n" {
            break;
        }
    }

    let text = String::from_utf8_lossy(&line);
    let text = text.trim_end_matches(|c| c == '\r' || c == '\n');
    if line.ends_with(b"\n") && is_request_line(text) {
        Ok(RequestLine::Valid(line))
    } else {
        Ok(RequestLine::Malformed(text.to_string()))
    }
}

/// `METHOD SP target SP HTTP/1.x`, as hyper's parser accepts it
fn is_request_line(line: &str) -> bool {
    let mut parts = line.split(' ');
    let (Some(method), Some(target), Some(version), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    !method.is_empty()
        && method.bytes().all(is_token_byte)
        && !target.is_empty()
        && target.parse::<Uri>().is_ok()
        && matches!(version, "HTTP/1.0" | "HTTP/1.1")
}

const fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_'
                | b'`' | b'|' | b'~'
        )
}

/// Answer an unparseable request with a decorated 400 and log it
async fn reject_malformed<R, W>(reader: &mut R, writer: &mut W, state: &AppState, line: &str)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let response = state.decorator.decorate(http::build_400_response());
    let status = response.status();
    let raw = encode_response(response).await;

    if state.config.logging.access_log {
        let status = status.as_str();
        if line.is_empty() {
            logger::log_rejected_request(&["?", status]);
        } else {
            logger::log_rejected_request(&[line, status]);
        }
    }

    if writer.write_all(&raw).await.is_err() || writer.shutdown().await.is_err() {
        return;
    }
    // Unread input would turn the close into a reset and lose the response
    let mut sink = tokio::io::sink();
    let _ = tokio::time::timeout(REJECT_LINGER, tokio::io::copy(reader, &mut sink)).await;
}

/// Serialize a response as HTTP/1.1 bytes
async fn encode_response(response: Response<Full<Bytes>>) -> Vec<u8> {
    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map(Collected::to_bytes)
        .unwrap_or_default();

    let mut raw = format!(
        "HTTP/1.1 {} {}\r\n",
        parts.status.as_str(),
        parts.status.canonical_reason().unwrap_or_default()
    )
    .into_bytes();
    for (name, value) in &parts.headers {
        raw.extend_from_slice(name.as_str().as_bytes());
        raw.extend_from_slice(b": ");
        raw.extend_from_slice(value.as_bytes());
        raw.extend_from_slice(b"\r\n");
    }
    raw.extend_from_slice(b"\r\n");
    raw.extend_from_slice(&body);
    raw
}
