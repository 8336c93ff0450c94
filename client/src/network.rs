//! UDP transport for the client.
//!
//! macroquad owns the main thread, so the socket lives on a background
//! thread running a current-thread tokio runtime. The frame loop talks to
//! it through channels: packets to send go over an unbounded tokio channel
//! (sendable from sync code) and received packets come back over a std
//! channel drained once per frame.

use log::{error, info, warn};
use shared::Packet;
use std::sync::mpsc as std_mpsc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub struct NetworkHandle {
    outbound_tx: mpsc::UnboundedSender<Packet>,
    inbound_rx: std_mpsc::Receiver<Packet>,
}

impl NetworkHandle {
    /// Connects the socket and spawns the background I/O thread.
    ///
    /// `fake_ping_ms` adds artificial one-way latency in each direction
    /// (half the value per leg) for testing interpolation under lag.
    pub fn connect(
        server_addr: &str,
        fake_ping_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = std_mpsc::channel();
        let server_addr = server_addr.to_string();

        std::thread::Builder::new()
            .name("net-io".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to build network runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(io_loop(server_addr, fake_ping_ms, outbound_rx, inbound_tx));
            })?;

        Ok(Self {
            outbound_tx,
            inbound_rx,
        })
    }

    /// Queues a packet for sending. Errors only if the I/O thread is gone.
    pub fn send(&self, packet: Packet) {
        if self.outbound_tx.send(packet).is_err() {
            warn!("Network thread has shut down; packet dropped");
        }
    }

    /// Drains every packet received since the last call.
    pub fn poll(&self) -> Vec<Packet> {
        let mut packets = Vec::new();
        while let Ok(packet) = self.inbound_rx.try_recv() {
            packets.push(packet);
        }
        packets
    }
}

async fn io_loop(
    server_addr: String,
    fake_ping_ms: u64,
    mut outbound_rx: mpsc::UnboundedReceiver<Packet>,
    inbound_tx: std_mpsc::Sender<Packet>,
) {
    let socket = match UdpSocket::bind("0.0.0.0:0").await {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to bind client socket: {}", e);
            return;
        }
    };
    if let Err(e) = socket.connect(&server_addr).await {
        error!("Failed to connect to {}: {}", server_addr, e);
        return;
    }
    info!("Connected to server at {}", server_addr);

    let one_way_delay = Duration::from_millis(fake_ping_ms / 2);
    let mut buf = vec![0u8; 4096];

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                let Some(packet) = outbound else {
                    // Frame loop dropped its handle; shut down
                    break;
                };
                if !one_way_delay.is_zero() {
                    tokio::time::sleep(one_way_delay).await;
                }
                match bincode::serialize(&packet) {
                    Ok(data) => {
                        if let Err(e) = socket.send(&data).await {
                            error!("Failed to send packet: {}", e);
                        }
                    }
                    Err(e) => error!("Failed to serialize packet: {}", e),
                }
            }

            received = socket.recv(&mut buf) => {
                match received {
                    Ok(len) => {
                        if !one_way_delay.is_zero() {
                            tokio::time::sleep(one_way_delay).await;
                        }
                        match bincode::deserialize::<Packet>(&buf[..len]) {
                            Ok(packet) => {
                                if inbound_tx.send(packet).is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("Malformed packet from server: {}", e),
                        }
                    }
                    Err(e) => {
                        error!("Socket receive error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    info!("Network thread exiting");
}
