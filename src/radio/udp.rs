//! # UDP Bench Transceiver
//!
//! Stands in for the packet radio when the node runs on a bench next to the
//! host software. Each datagram carries `[channel][pipe address × 5][payload]`
//! so channel and pipe filtering behave like the air interface: a listener
//! only sees traffic sent on its channel to one of its reading pipes.
//!
//! There is no acknowledgement on UDP; a write counts as delivered once the
//! datagram is handed to the OS.

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use tracing::{debug, warn};

use super::transceiver::{CrcLength, DataRate, PaLevel, PipeAddress, Transceiver};
use crate::error::{NodeError, Result};

/// Largest payload the air interface carries
pub const MAX_PAYLOAD_SIZE: usize = 32;

/// Datagram header: channel + pipe address
const HEADER_SIZE: usize = 6;

/// Number of reading pipes
const READING_PIPES: usize = 6;

/// Packet "radio" over UDP datagrams
#[derive(Debug)]
pub struct UdpTransceiver {
    socket: UdpSocket,
    peer: SocketAddr,
    channel: u8,
    listening: bool,
    writing_pipe: Option<PipeAddress>,
    reading_pipes: [Option<PipeAddress>; READING_PIPES],
    pending: Option<Vec<u8>>,
}

impl UdpTransceiver {
    /// Bind the local socket and remember the peer
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Radio`] if either address is invalid or the
    /// socket cannot be bound
    pub fn bind(local: &str, peer: &str) -> Result<Self> {
        let peer: SocketAddr = peer
            .parse()
            .map_err(|e| NodeError::Radio(format!("Invalid peer address {}: {}", peer, e)))?;

        let socket = UdpSocket::bind(local)
            .map_err(|e| NodeError::Radio(format!("Failed to bind {}: {}", local, e)))?;
        socket.set_nonblocking(true)?;

        Ok(Self {
            socket,
            peer,
            channel: 0,
            listening: false,
            writing_pipe: None,
            reading_pipes: [None; READING_PIPES],
            pending: None,
        })
    }

    /// Point writes at another peer
    pub fn set_peer(&mut self, peer: SocketAddr) {
        self.peer = peer;
    }

    /// Local socket address (useful when bound to port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Pull datagrams until one addressed to us is found
    fn poll_socket(&mut self) {
        let mut buf = [0u8; HEADER_SIZE + MAX_PAYLOAD_SIZE];

        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    if len < HEADER_SIZE {
                        debug!("Dropping runt datagram ({} bytes) from {}", len, from);
                        continue;
                    }

                    let channel = buf[0];
                    let mut address = [0u8; 5];
                    address.copy_from_slice(&buf[1..HEADER_SIZE]);

                    if channel != self.channel || !self.reading_pipes.contains(&Some(address)) {
                        debug!("Ignoring packet for channel {} pipe {:02X?}", channel, address);
                        continue;
                    }

                    self.pending = Some(buf[HEADER_SIZE..len].to_vec());
                    return;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return,
                Err(e) => {
                    warn!("Bench radio receive failed: {}", e);
                    return;
                }
            }
        }
    }
}

impl Transceiver for UdpTransceiver {
    fn begin(&mut self) -> bool {
        true
    }

    fn set_pa_level(&mut self, level: PaLevel) {
        debug!("Bench radio PA level {:?} (ignored)", level);
    }

    fn set_data_rate(&mut self, rate: DataRate) {
        debug!("Bench radio data rate {:?} (ignored)", rate);
    }

    fn set_channel(&mut self, channel: u8) {
        self.channel = channel;
    }

    fn set_crc_length(&mut self, length: CrcLength) {
        debug!("Bench radio CRC {:?} (ignored)", length);
    }

    fn set_auto_ack(&mut self, enabled: bool) {
        debug!("Bench radio auto-ack {} (ignored)", enabled);
    }

    fn set_retries(&mut self, delay: u8, count: u8) {
        debug!("Bench radio retries {}×{} (ignored)", count, delay);
    }

    fn stop_listening(&mut self) {
        self.listening = false;
    }

    fn start_listening(&mut self) {
        self.listening = true;
    }

    fn open_writing_pipe(&mut self, address: PipeAddress) {
        self.writing_pipe = Some(address);
    }

    fn open_reading_pipe(&mut self, pipe: u8, address: PipeAddress) {
        if let Some(slot) = self.reading_pipes.get_mut(pipe as usize) {
            *slot = Some(address);
        }
    }

    fn available(&mut self) -> bool {
        if !self.listening {
            return false;
        }
        if self.pending.is_none() {
            self.poll_socket();
        }
        self.pending.is_some()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        match self.pending.take() {
            Some(payload) => {
                let n = payload.len().min(buf.len());
                buf[..n].copy_from_slice(&payload[..n]);
                n
            }
            None => 0,
        }
    }

    fn write(&mut self, payload: &[u8]) -> bool {
        if self.listening {
            return false;
        }

        let Some(address) = self.writing_pipe else {
            return false;
        };

        let payload = &payload[..payload.len().min(MAX_PAYLOAD_SIZE)];
        let mut datagram = Vec::with_capacity(HEADER_SIZE + payload.len());
        datagram.push(self.channel);
        datagram.extend_from_slice(&address);
        datagram.extend_from_slice(payload);

        match self.socket.send_to(&datagram, self.peer) {
            Ok(_) => true,
            Err(e) => {
                debug!("Bench radio send failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    /// Two bench radios pointed at each other on loopback
    fn pair() -> (UdpTransceiver, UdpTransceiver) {
        let mut a = UdpTransceiver::bind("127.0.0.1:0", "127.0.0.1:9").unwrap();
        let mut b = UdpTransceiver::bind("127.0.0.1:0", "127.0.0.1:9").unwrap();
        a.set_peer(b.local_addr().unwrap());
        b.set_peer(a.local_addr().unwrap());
        (a, b)
    }

    fn wait_available(radio: &mut UdpTransceiver) -> bool {
        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            if radio.available() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_bind_rejects_bad_peer() {
        assert!(matches!(
            UdpTransceiver::bind("127.0.0.1:0", "not-an-address"),
            Err(NodeError::Radio(_))
        ));
    }

    #[test]
    fn test_payload_reaches_matching_pipe() {
        let (mut tx, mut rx) = pair();
        tx.set_channel(100);
        rx.set_channel(100);

        tx.open_writing_pipe(*b"Bp32A");
        rx.open_reading_pipe(1, *b"Bp32A");
        rx.start_listening();

        assert!(tx.write(&[0x05]));
        assert!(wait_available(&mut rx));

        let mut buf = [0u8; 32];
        assert_eq!(rx.read(&mut buf), 1);
        assert_eq!(buf[0], 0x05);
        assert!(!rx.available());
    }

    #[test]
    fn test_other_pipe_is_ignored() {
        let (mut tx, mut rx) = pair();
        tx.open_writing_pipe(*b"RPi58");
        rx.open_reading_pipe(1, *b"Bp32A");
        rx.start_listening();

        assert!(tx.write(&[0xFF]));
        assert!(!wait_available(&mut rx));
    }

    #[test]
    fn test_other_channel_is_ignored() {
        let (mut tx, mut rx) = pair();
        tx.set_channel(90);
        rx.set_channel(100);
        tx.open_writing_pipe(*b"Bp32A");
        rx.open_reading_pipe(1, *b"Bp32A");
        rx.start_listening();

        assert!(tx.write(&[0x01]));
        assert!(!wait_available(&mut rx));
    }

    #[test]
    fn test_write_refused_while_listening() {
        let (mut tx, _rx) = pair();
        tx.open_writing_pipe(*b"RPi58");
        tx.start_listening();
        assert!(!tx.write(&[0x01]));
    }

    #[test]
    fn test_not_available_when_not_listening() {
        let (mut tx, mut rx) = pair();
        tx.open_writing_pipe(*b"Bp32A");
        rx.open_reading_pipe(1, *b"Bp32A");

        assert!(tx.write(&[0x01]));
        std::thread::sleep(Duration::from_millis(20));
        assert!(!rx.available());
    }
}
