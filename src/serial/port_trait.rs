//! Trait abstraction for the half-duplex field-bus port to enable testing

use async_trait::async_trait;
use std::io;
use tokio_serial::{ClearBuffer, SerialPort};

/// Trait for serial port I/O operations on a shared RS-485 bus
///
/// Direction control is not part of this trait: the driver-enable line is a
/// separate digital output owned by [`crate::sensor::SensorLink`].
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Block until every written byte has left the transmitter
    async fn flush(&mut self) -> io::Result<()>;

    /// Number of received bytes waiting to be read
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Read bytes that have already arrived, never waiting for more
    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drop any stale received bytes
    fn discard_input(&mut self) -> io::Result<()>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.port.flush().await
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    async fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;

        let pending = self.bytes_available()?.min(buf.len());
        if pending == 0 {
            return Ok(0);
        }
        self.port.read(&mut buf[..pending]).await
    }

    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
