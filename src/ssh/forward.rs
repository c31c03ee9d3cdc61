// ABOUTME: SSH local port forwarding.
// ABOUTME: Tunnels a local TCP port to a host:port reachable from the server.

use super::client::SshHandler;
use super::error::{Error, Result};
use russh::ChannelMsg;
use russh::client::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

/// An open port forward. Closed by [`Tunnel::close`] or on drop.
pub struct Tunnel {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
}

impl std::fmt::Debug for Tunnel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tunnel")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

impl Tunnel {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait briefly for the listener to exit.
    pub async fn close(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        tokio::select! {
            _ = self.shutdown_complete.notified() => {}
            _ = tokio::time::sleep(tokio::time::Duration::from_secs(2)) => {}
        }
    }
}

impl Drop for Tunnel {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

pub(super) async fn start_tunnel(
    handle: Arc<Handle<SshHandler>>,
    local_port: u16,
    remote_host: String,
    remote_port: u16,
) -> Result<Tunnel> {
    let listener = TcpListener::bind(("127.0.0.1", local_port))
        .await
        .map_err(|e| {
            Error::TunnelFailed(format!("failed to bind 127.0.0.1:{}: {}", local_port, e))
        })?;
    let local_addr = listener.local_addr()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_complete = Arc::new(Notify::new());

    tokio::spawn(run_listener(
        listener,
        handle,
        remote_host,
        remote_port,
        shutdown.clone(),
        shutdown_complete.clone(),
    ));

    tracing::debug!(%local_addr, remote_port, "tunnel listening");

    Ok(Tunnel {
        local_addr,
        shutdown,
        shutdown_complete,
    })
}

async fn run_listener(
    listener: TcpListener,
    handle: Arc<Handle<SshHandler>>,
    remote_host: String,
    remote_port: u16,
    shutdown: Arc<AtomicBool>,
    shutdown_complete: Arc<Notify>,
) {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        // Poll the shutdown flag between accepts.
        let accept_result = tokio::select! {
            result = listener.accept() => result,
            _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => continue,
        };

        match accept_result {
            Ok((stream, peer)) => {
                let handle = Arc::clone(&handle);
                let remote_host = remote_host.clone();
                tokio::spawn(async move {
                    if let Err(e) =
                        forward_connection(stream, peer, &handle, &remote_host, remote_port).await
                    {
                        tracing::debug!("Tunnel connection error: {}", e);
                    }
                });
            }
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    tracing::warn!("Accept error on tunnel listener: {}", e);
                }
                break;
            }
        }
    }

    shutdown_complete.notify_one();
}

async fn forward_connection(
    mut local_stream: TcpStream,
    peer: SocketAddr,
    handle: &Handle<SshHandler>,
    remote_host: &str,
    remote_port: u16,
) -> Result<()> {
    let mut channel = handle
        .channel_open_direct_tcpip(
            remote_host,
            u32::from(remote_port),
            peer.ip().to_string(),
            u32::from(peer.port()),
        )
        .await
        .map_err(|e| {
            Error::TunnelFailed(format!(
                "failed to open direct-tcpip channel to {}:{}: {}",
                remote_host, remote_port, e
            ))
        })?;

    let mut stream_closed = false;
    let mut channel_closed = false;
    let mut buf = vec![0u8; 65536];

    loop {
        tokio::select! {
            r = local_stream.read(&mut buf), if !stream_closed => {
                match r {
                    Ok(0) => {
                        stream_closed = true;
                        let _ = channel.eof().await;
                    }
                    Ok(n) => {
                        if let Err(e) = channel.data(&buf[..n]).await {
                            tracing::debug!("Channel data error: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::debug!("Local stream read error: {}", e);
                        break;
                    }
                }
            }

            msg = channel.wait(), if !channel_closed => {
                match msg {
                    Some(ChannelMsg::Data { ref data }) => {
                        if let Err(e) = local_stream.write_all(data).await {
                            tracing::debug!("Local stream write error: {}", e);
                            break;
                        }
                    }
                    Some(ChannelMsg::Eof) => {
                        channel_closed = true;
                        if stream_closed {
                            break;
                        }
                    }
                    Some(ChannelMsg::Close) | None => break,
                    Some(_) => {}
                }
            }

            else => break,
        }
    }

    Ok(())
}
