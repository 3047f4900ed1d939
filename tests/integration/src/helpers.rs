//! Test helpers for integration tests
//!
//! Provides utilities for spawning test servers, making HTTP requests, and
//! driving raw gateway sockets.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use presence_api::{create_app, create_app_state, run_server, AppState};
use presence_client::{ClientConfig, ClientState};
use presence_common::AppConfig;
use presence_gateway::protocol::{CloseCode, GatewayMessage, HelloPayload, OpCode};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// Upper bound for anything a test waits on
pub const WAIT: Duration = Duration::from_secs(5);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server on an ephemeral port
    pub async fn start() -> Result<Self> {
        Self::start_with_config(AppConfig::default()).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        Self::start_with_state(create_app_state(config)).await
    }

    /// Start a test server around prepared state (e.g. a custom repository)
    pub async fn start_with_state(state: AppState) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = create_app(state.clone());

        let handle = tokio::spawn(async move {
            run_server(app, listener).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            handle,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Close every gateway socket of `user_id` from the server side
    pub fn close_gateway_sessions(&self, user_id: &str) -> usize {
        self.state
            .gateway()
            .connection_manager()
            .get_user_connections(user_id)
            .iter()
            .filter(|conn| conn.close(CloseCode::UnknownError).is_ok())
            .count()
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the gateway URL
    pub fn gateway_url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }

    /// Client configuration pointing at this server
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url())
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request with a raw body
    pub async fn post_raw(&self, path: &str, content_type: &str, body: &'static str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await?)
    }

    /// Open a raw gateway socket and consume Hello
    pub async fn gateway(&self) -> Result<GatewaySocket> {
        GatewaySocket::connect(&self.gateway_url()).await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A listener that accepts TCP connections but never answers the WebSocket
/// handshake
pub struct StalledGateway {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl StalledGateway {
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }
}

impl Drop for StalledGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A WebSocket relay in front of the real gateway that holds the client's
/// frames back for `delay` before forwarding them
///
/// Hello passes straight through, so the client identifies immediately but the
/// server only sees Identify once the delay is over.
pub struct DelayedGateway {
    pub addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl DelayedGateway {
    pub async fn start(target: String, delay: Duration) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            let mut relays = JoinSet::new();
            while let Ok((socket, _)) = listener.accept().await {
                relays.spawn(relay(socket, target.clone(), delay));
            }
        });

        Ok(Self { addr, handle })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/gateway", self.addr)
    }
}

impl Drop for DelayedGateway {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn relay(socket: TcpStream, target: String, delay: Duration) {
    let Ok(client) = tokio_tungstenite::accept_async(socket).await else {
        return;
    };
    let Ok((server, _)) = tokio_tungstenite::connect_async(target.as_str()).await else {
        return;
    };
    let (mut client_tx, mut client_rx) = client.split();
    let (mut server_tx, mut server_rx) = server.split();

    let downstream = async {
        while let Some(Ok(frame)) = server_rx.next().await {
            if client_tx.send(frame).await.is_err() {
                break;
            }
        }
    };
    let upstream = async {
        tokio::time::sleep(delay).await;
        while let Some(Ok(frame)) = client_rx.next().await {
            if server_tx.send(frame).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        () = downstream => {}
        () = upstream => {}
    }
}

/// Raw gateway connection for protocol-level tests
pub struct GatewaySocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    pub hello: HelloPayload,
}

impl GatewaySocket {
    /// Connect and read the Hello frame
    pub async fn connect(url: &str) -> Result<Self> {
        let (stream, _) = tokio_tungstenite::connect_async(url).await?;
        let mut socket = Self {
            stream,
            hello: HelloPayload::default(),
        };

        let hello = socket.next_message().await?;
        if hello.op != OpCode::Hello {
            bail!("expected Hello, got {hello}");
        }
        socket.hello = hello.payload()?;
        Ok(socket)
    }

    pub async fn send(&mut self, message: &GatewayMessage) -> Result<()> {
        self.send_text(&message.to_json()?).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.stream.send(WsMessage::Text(text.to_string())).await?;
        Ok(())
    }

    /// Next gateway frame, skipping pings; fails on close
    pub async fn next_message(&mut self) -> Result<GatewayMessage> {
        loop {
            let frame = tokio::time::timeout(WAIT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?
                .context("socket ended")??;

            match frame {
                WsMessage::Text(text) => return Ok(GatewayMessage::parse(&text)?),
                WsMessage::Close(frame) => bail!("socket closed: {frame:?}"),
                _ => {}
            }
        }
    }

    /// Skip frames until a dispatch named `event` arrives
    pub async fn next_dispatch(&mut self, event: &str) -> Result<GatewayMessage> {
        loop {
            let message = self.next_message().await?;
            if message.op == OpCode::Dispatch && message.t.as_deref() == Some(event) {
                return Ok(message);
            }
        }
    }

    /// Identify and return the `users_online` and `activities` replies
    pub async fn identify(&mut self, user_id: &str) -> Result<(GatewayMessage, GatewayMessage)> {
        self.send(&GatewayMessage::identify(user_id)).await?;
        let users = self.next_dispatch("users_online").await?;
        let activities = self.next_dispatch("activities").await?;
        Ok((users, activities))
    }

    /// Wait for the server to close the socket and return the close code
    pub async fn expect_close(&mut self) -> Result<Option<u16>> {
        loop {
            let frame = tokio::time::timeout(WAIT, self.stream.next())
                .await
                .context("timed out waiting for close")?;

            match frame {
                Some(Ok(WsMessage::Close(frame))) => return Ok(frame.map(|f| u16::from(f.code))),
                Some(Ok(_)) => {}
                Some(Err(_)) | None => return Ok(None),
            }
        }
    }

    /// Close from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Wait until the watched client state satisfies `predicate`
pub async fn wait_for_state<F>(rx: &mut watch::Receiver<ClientState>, predicate: F) -> Result<ClientState>
where
    F: FnMut(&ClientState) -> bool,
{
    let state = tokio::time::timeout(WAIT, rx.wait_for(predicate))
        .await
        .context("timed out waiting for client state")??
        .clone();
    Ok(state)
}

/// Poll `check` until it returns true
pub async fn eventually<F, Fut>(mut check: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<bool>>,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check().await? {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    bail!("condition not met within {WAIT:?}")
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(response: Response, expected_status: StatusCode) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
