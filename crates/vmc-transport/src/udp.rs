//! UDP message source

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use vmc_core::{Message, VmcError, VmcResult};
use vmc_wire::{Packet, MAX_PACKET_SIZE};

/// Default VMC performer port
pub const DEFAULT_PORT: u16 = 39539;

/// UDP socket receiving OSC packets
pub struct UdpSource {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
}

impl UdpSource {
    /// Bind to a local address
    pub async fn bind(addr: SocketAddr) -> VmcResult<Self> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| VmcError::TransportError(e.to_string()))?;

        let local_addr = socket
            .local_addr()
            .map_err(|e| VmcError::TransportError(e.to_string()))?;

        Ok(UdpSource {
            socket: Arc::new(socket),
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Receive one packet and flatten it into messages
    pub async fn recv_messages(&self) -> VmcResult<(Vec<Message>, SocketAddr)> {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        let (len, addr) = self
            .socket
            .recv_from(&mut buf)
            .await
            .map_err(|e| VmcError::TransportError(e.to_string()))?;

        let packet = Packet::parse(&buf[..len])?;
        Ok((packet.into_messages(), addr))
    }

    /// Send an encoded packet, e.g. for loopback testing
    pub async fn send_to(&self, packet: &Packet, dest: SocketAddr) -> VmcResult<()> {
        let bytes = packet.to_bytes()?;
        self.socket
            .send_to(&bytes, dest)
            .await
            .map_err(|e| VmcError::TransportError(e.to_string()))?;
        Ok(())
    }

    /// Get a clone of the socket for concurrent operations
    pub fn socket(&self) -> Arc<UdpSocket> {
        Arc::clone(&self.socket)
    }
}

/// Decoded message channel
pub type MessageReceiver = mpsc::Receiver<Message>;

/// Start a background receive loop
///
/// Undecodable packets are logged and dropped. The loop ends when the
/// receiving side of the channel is dropped.
pub fn start_receive_loop(socket: Arc<UdpSocket>, buffer_size: usize) -> MessageReceiver {
    let (tx, rx) = mpsc::channel(buffer_size);

    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_PACKET_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, addr)) => {
                    let messages = match Packet::parse(&buf[..len]) {
                        Ok(packet) => packet.into_messages(),
                        Err(e) => {
                            tracing::warn!("Dropping packet from {}: {}", addr, e);
                            continue;
                        }
                    };
                    for message in messages {
                        if tx.send(message).await.is_err() {
                            return; // Receiver dropped
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("UDP receive error: {}", e);
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmc_core::Value;
    use vmc_wire::Bundle;

    async fn loopback() -> UdpSource {
        UdpSource::bind("127.0.0.1:0".parse().unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn test_udp_source_bind() {
        let source = loopback().await;
        assert_ne!(source.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn test_recv_message() {
        let source = loopback().await;
        let sender = loopback().await;

        let msg = Message::new("/VMC/Ext/OK", vec![Value::Int(1)]);
        sender
            .send_to(&Packet::from(msg.clone()), source.local_addr())
            .await
            .unwrap();

        let (messages, from) = source.recv_messages().await.unwrap();
        assert_eq!(messages, vec![msg]);
        assert_eq!(from, sender.local_addr());
    }

    #[tokio::test]
    async fn test_receive_loop_flattens_bundles_in_order() {
        let source = loopback().await;
        let sender = loopback().await;
        let mut rx = start_receive_loop(source.socket(), 16);

        let first = Message::new("/VMC/Ext/T", vec![Value::Float(1.0)]);
        let second = Message::new("/VMC/Ext/Blend/Apply", vec![]);
        let bundle = Packet::Bundle(Bundle::new(vec![first.clone().into(), second.clone().into()]));

        // Garbage is dropped, the loop keeps going
        sender
            .socket()
            .send_to(b"not osc", source.local_addr())
            .await
            .unwrap();
        sender.send_to(&bundle, source.local_addr()).await.unwrap();

        assert_eq!(rx.recv().await, Some(first));
        assert_eq!(rx.recv().await, Some(second));
    }
}
