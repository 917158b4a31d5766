//! UDP gateway transport.
//!
//! Stands in for the coordinator's radio module: each remote node is
//! reachable at a configured socket address, and every datagram carries a
//! one-byte link sequence so acknowledgments can be matched to frames.
//!
//! ```text
//! data:  [0x7E][seq][payload..]
//! ack:   [0x06][seq]
//! nak:   [0x15][seq]
//! ```
//!
//! A background task owns the receive half of the socket. It resolves
//! acknowledgments for in-flight sends, acknowledges inbound data frames
//! from known peers, and forwards them as [`InboundFrame`]s.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::address::NodeAddress;
use crate::error::TransportError;
use crate::transport::{InboundFrame, Transport, TxStatus};

const DATA: u8 = 0x7E;
const ACK: u8 = 0x06;
const NAK: u8 = 0x15;

const MAX_DATAGRAM: usize = 512;
const INBOUND_CHANNEL_SIZE: usize = 64;

type PendingMap = HashMap<(SocketAddr, u8), oneshot::Sender<TxStatus>>;

/// Socket and peer table for a [`UdpTransport`].
#[derive(Debug, Clone)]
pub struct UdpConfig {
    pub bind: SocketAddr,
    pub peers: HashMap<NodeAddress, SocketAddr>,
}

/// Acknowledged datagram link over UDP.
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peers: HashMap<NodeAddress, SocketAddr>,
    pending: Arc<Mutex<PendingMap>>,
    next_seq: AtomicU8,
}

impl UdpTransport {
    /// Bind the socket and spawn the receive loop.
    ///
    /// The loop stops when `cancel` fires; in-flight sends then resolve
    /// with [`TransportError::Closed`].
    pub async fn bind(
        config: UdpConfig,
        cancel: CancellationToken,
    ) -> Result<(Self, mpsc::Receiver<InboundFrame>), TransportError> {
        let socket = Arc::new(UdpSocket::bind(config.bind).await?);
        let pending = Arc::new(Mutex::new(PendingMap::new()));
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CHANNEL_SIZE);

        let by_socket: HashMap<SocketAddr, NodeAddress> =
            config.peers.iter().map(|(node, sock)| (*sock, *node)).collect();

        tokio::spawn(receive_loop(
            Arc::clone(&socket),
            by_socket,
            Arc::clone(&pending),
            inbound_tx,
            cancel,
        ));

        debug!(bind = %config.bind, peers = config.peers.len(), "udp gateway bound");

        Ok((
            Self {
                socket,
                peers: config.peers,
                pending,
                next_seq: AtomicU8::new(0),
            },
            inbound_rx,
        ))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    async fn send(
        &self,
        destination: NodeAddress,
        payload: Bytes,
    ) -> Result<TxStatus, TransportError> {
        let peer = *self
            .peers
            .get(&destination)
            .ok_or(TransportError::UnknownPeer(destination))?;
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert((peer, seq), tx);
        let _guard = PendingGuard {
            pending: &self.pending,
            key: (peer, seq),
        };

        let mut datagram = BytesMut::with_capacity(payload.len() + 2);
        datagram.put_u8(DATA);
        datagram.put_u8(seq);
        datagram.put_slice(&payload);
        self.socket.send_to(&datagram, peer).await?;
        trace!(%destination, %peer, seq, len = payload.len(), "datagram sent");

        rx.await.map_err(|_| TransportError::Closed)
    }
}

/// Drops the pending acknowledgment slot when a send completes or is
/// abandoned by its caller's timeout.
struct PendingGuard<'a> {
    pending: &'a Mutex<PendingMap>,
    key: (SocketAddr, u8),
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        lock(self.pending).remove(&self.key);
    }
}

fn lock(pending: &Mutex<PendingMap>) -> MutexGuard<'_, PendingMap> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Background receive loop ──────────────────────────────────────────

async fn receive_loop(
    socket: Arc<UdpSocket>,
    by_socket: HashMap<SocketAddr, NodeAddress>,
    pending: Arc<Mutex<PendingMap>>,
    inbound_tx: mpsc::Sender<InboundFrame>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, from) = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok(received) => received,
                Err(e) => {
                    warn!(error = %e, "udp receive failed");
                    continue;
                }
            },
        };

        let Some(datagram) = buf.get(..len) else {
            continue;
        };

        match datagram {
            [ACK, seq, ..] => resolve(&pending, from, *seq, TxStatus::Delivered),
            [NAK, seq, ..] => resolve(&pending, from, *seq, TxStatus::Failed),
            [DATA, seq, payload @ ..] => {
                let seq = *seq;
                let Some(&source) = by_socket.get(&from) else {
                    warn!(%from, "datagram from unknown peer dropped");
                    continue;
                };

                let frame = InboundFrame::new(source, Bytes::copy_from_slice(payload));
                // A full queue is reported back as a NAK so the peer retransmits.
                let reply = match inbound_tx.try_send(frame) {
                    Ok(()) => ACK,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(%source, "inbound queue full, rejecting frame");
                        NAK
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                };
                if let Err(e) = socket.send_to(&[reply, seq], from).await {
                    warn!(error = %e, %from, "failed to acknowledge datagram");
                }
            }
            _ => debug!(%from, len, "unrecognized datagram dropped"),
        }
    }

    // Wake every in-flight send; dropping the senders resolves them as closed.
    lock(&pending).clear();
    debug!("udp gateway stopped");
}

fn resolve(pending: &Mutex<PendingMap>, from: SocketAddr, seq: u8, status: TxStatus) {
    match lock(pending).remove(&(from, seq)) {
        Some(tx) => {
            let _ = tx.send(status);
        }
        None => trace!(%from, seq, "late or unknown acknowledgment"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn gateway_with_peer() -> (UdpTransport, mpsc::Receiver<InboundFrame>, UdpSocket, NodeAddress) {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let node = NodeAddress::new(0x0013_A200_0000_0001);
        let config = UdpConfig {
            bind: "127.0.0.1:0".parse().unwrap(),
            peers: HashMap::from([(node, peer.local_addr().unwrap())]),
        };
        let (transport, inbound) = UdpTransport::bind(config, CancellationToken::new())
            .await
            .unwrap();
        (transport, inbound, peer, node)
    }

    #[tokio::test]
    async fn send_resolves_on_peer_ack() {
        let (transport, _inbound, peer, node) = gateway_with_peer().await;

        let responder = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = peer.recv_from(&mut buf).await.unwrap();
            assert_eq!(&buf[..len], &[DATA, 0, b'R', 3]);
            peer.send_to(&[ACK, 0], from).await.unwrap();
        });

        let status = transport
            .send(node, Bytes::from_static(b"R\x03"))
            .await
            .unwrap();
        assert_eq!(status, TxStatus::Delivered);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn send_reports_peer_nak() {
        let (transport, _inbound, peer, node) = gateway_with_peer().await;

        tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (_, from) = peer.recv_from(&mut buf).await.unwrap();
            peer.send_to(&[NAK, buf[1]], from).await.unwrap();
        });

        let status = transport
            .send(node, Bytes::from_static(b"R\x03"))
            .await
            .unwrap();
        assert_eq!(status, TxStatus::Failed);
    }

    #[tokio::test]
    async fn inbound_data_is_acked_and_forwarded() {
        let (transport, mut inbound, peer, node) = gateway_with_peer().await;
        let gateway = transport.local_addr().unwrap();

        peer.send_to(&[DATA, 9, b'E', 0, 0], gateway).await.unwrap();

        let frame = inbound.recv().await.unwrap();
        assert_eq!(frame.source, node);
        assert_eq!(frame.payload.as_ref(), b"E\x00\x00");

        let mut buf = [0u8; 8];
        let (len, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[ACK, 9]);
    }

    #[tokio::test]
    async fn unknown_destination_is_an_error() {
        let (transport, _inbound, _peer, _node) = gateway_with_peer().await;
        let err = transport
            .send(NodeAddress::new(42), Bytes::from_static(b"R\x01"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeer(_)));
    }
}
