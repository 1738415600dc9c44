/*
[INPUT]:  Loopback socket address, TLS material, browser redirect requests
[OUTPUT]: The single authorization grant carried by the redirect
[POS]:    Auth layer - one-shot HTTPS listener for the OAuth redirect
[UPDATE]: When changing redirect routing, responses, or listener lifetime
*/

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};
use url::Url;

use crate::auth::TlsMaterial;
use crate::http::{Result, TdaError};

const SUCCESS_HTML: &str = "<html><body><h1>Authorization received</h1><p>You may close this window.</p></body></html>";
const MAX_REQUEST_HEAD_BYTES: usize = 8192;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Single-use authorization code captured from the redirect
#[derive(Clone, PartialEq, Eq)]
pub struct Grant {
    code: String,
    redirect_uri: Option<String>,
}

impl Grant {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            redirect_uri: None,
        }
    }

    /// Record the redirect URI the consent page was given for this grant
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }

    pub fn as_str(&self) -> &str {
        &self.code
    }

    /// Redirect URI the code was issued for, when known
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    pub fn into_inner(self) -> String {
        self.code
    }
}

impl fmt::Debug for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grant")
            .field("code", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum RouteOutcome {
    Grant(Grant),
    Rejected { status: u16, reason: &'static str },
}

/// HTTPS listener that serves exactly one valid redirect and then stops
pub struct CallbackServer {
    listener: TcpListener,
    companion: Option<TcpListener>,
    acceptor: TlsAcceptor,
    local_addr: SocketAddr,
}

impl CallbackServer {
    /// Bind the listener. Bad TLS material or a busy port are startup errors.
    pub async fn bind(addr: SocketAddr, tls: &TlsMaterial) -> Result<Self> {
        let acceptor = TlsAcceptor::from(tls.server_config()?);
        let listener = bind_listener(addr).await?;
        let local_addr = listener.local_addr()?;

        info!(%local_addr, "oauth callback listener started");

        Ok(Self {
            listener,
            companion: None,
            acceptor,
            local_addr,
        })
    }

    /// Bind `addr` and, on the same port, the loopback address of the other
    /// IP family, so `localhost` works whichever way the browser resolves it.
    ///
    /// Only the primary bind is required; a failed companion bind is logged.
    pub async fn bind_loopback(addr: SocketAddr, tls: &TlsMaterial) -> Result<Self> {
        let mut server = Self::bind(addr, tls).await?;
        let companion_ip = match server.local_addr.ip() {
            IpAddr::V4(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V6(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let companion_addr = SocketAddr::new(companion_ip, server.local_addr.port());

        match TcpListener::bind(companion_addr).await {
            Ok(listener) => {
                info!(local_addr = %companion_addr, "oauth callback listener started");
                server.companion = Some(listener);
            }
            Err(err) => {
                debug!(%companion_addr, error = %err, "oauth callback companion bind skipped");
            }
        }
        Ok(server)
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Every address the listener accepts on
    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        let mut addrs = vec![self.local_addr];
        if let Some(companion) = &self.companion {
            if let Ok(addr) = companion.local_addr() {
                addrs.push(addr);
            }
        }
        addrs
    }

    /// Serve redirect requests until one carries a `code`, then stop listening.
    pub async fn wait_for_grant(self, timeout: Option<Duration>) -> Result<Grant> {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, self.serve_until_grant())
                .await
                .map_err(|_| TdaError::Timeout {
                    duration: limit.as_secs(),
                })?,
            None => self.serve_until_grant().await,
        }
    }

    /// Connections are served concurrently; an idle socket never delays others.
    /// Unfinished connections are aborted once a grant arrives.
    async fn serve_until_grant(self) -> Result<Grant> {
        let mut connections = JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "oauth callback connection accepted");
                    let acceptor = self.acceptor.clone();
                    connections.spawn(async move { (peer, handle_connection(acceptor, stream).await) });
                }
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    match joined {
                        Ok((_, Ok(Some(grant)))) => {
                            info!(local_addr = %self.local_addr, "oauth grant received, stopping listener");
                            return Ok(grant);
                        }
                        Ok((_, Ok(None))) => {}
                        Ok((peer, Err(err))) => {
                            warn!(%peer, error = %err, "oauth callback connection failed");
                        }
                        Err(err) => {
                            warn!(error = %err, "oauth callback connection task failed");
                        }
                    }
                }
            }
        }
    }

    async fn accept(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        match &self.companion {
            Some(companion) => tokio::select! {
                accepted = self.listener.accept() => accepted,
                accepted = companion.accept() => accepted,
            },
            None => self.listener.accept().await,
        }
    }
}

impl fmt::Debug for CallbackServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackServer")
            .field("local_addrs", &self.local_addrs())
            .finish()
    }
}

async fn bind_listener(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TdaError::Bind {
            addr: addr.to_string(),
            source,
        })
}

async fn handle_connection(acceptor: TlsAcceptor, stream: TcpStream) -> Result<Option<Grant>> {
    let exchange = async {
        let mut tls = acceptor.accept(stream).await?;
        let head = read_request_head(&mut tls).await?;
        let (response, grant) = match route_request(&head) {
            RouteOutcome::Grant(grant) => (http_response(200, "OK", SUCCESS_HTML), Some(grant)),
            RouteOutcome::Rejected { status, reason } => {
                warn!(status, reason, "oauth callback request rejected");
                (http_response(status, reason, reason), None)
            }
        };
        write_response(&mut tls, &response).await?;
        Ok::<_, TdaError>(grant)
    };

    tokio::time::timeout(CONNECTION_TIMEOUT, exchange)
        .await
        .map_err(|_| TdaError::Timeout {
            duration: CONNECTION_TIMEOUT.as_secs(),
        })?
}

async fn read_request_head<S: AsyncRead + Unpin>(stream: &mut S) -> Result<String> {
    let mut buffer = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") || buffer.len() >= MAX_REQUEST_HEAD_BYTES {
            break;
        }
    }

    if buffer.is_empty() {
        return Err(TdaError::InvalidResponse(
            "oauth callback request is empty".to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

async fn write_response<S: AsyncWrite + Unpin>(stream: &mut S, response: &str) -> Result<()> {
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await?;
    let _ = stream.shutdown().await;
    Ok(())
}

/// Only `GET /` with a non-empty `code` query parameter yields a grant.
fn route_request(head: &str) -> RouteOutcome {
    let request_line = head.lines().next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();

    if !target.starts_with('/') {
        return RouteOutcome::Rejected {
            status: 400,
            reason: "Bad Request",
        };
    }
    let Ok(url) = Url::parse(&format!("https://localhost{target}")) else {
        return RouteOutcome::Rejected {
            status: 400,
            reason: "Bad Request",
        };
    };
    if url.path() != "/" {
        return RouteOutcome::Rejected {
            status: 404,
            reason: "Not Found",
        };
    }
    if method != "GET" {
        return RouteOutcome::Rejected {
            status: 405,
            reason: "Method Not Allowed",
        };
    }

    match extract_code(&url) {
        Some(code) => RouteOutcome::Grant(Grant::new(code)),
        None => RouteOutcome::Rejected {
            status: 400,
            reason: "Bad Request",
        },
    }
}

/// Percent-decodes the `code` parameter; a literal `+` stays a `+`.
fn extract_code(url: &Url) -> Option<String> {
    let query = url.query()?.replace('+', "%2B");
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

fn http_response(status: u16, reason: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}
