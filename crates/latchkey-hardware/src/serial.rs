//! Serial card reader source.
//!
//! The reader is polled on a blocking task that forwards every chunk of bytes
//! it reads into a channel, so the controller consumes the reader the same
//! way it consumes any other event source.
//!
//! ```text
//! ┌──────────────┐  Vec<u8> chunks  ┌──────────────────┐
//! │ serial port  │─────────────────►│  mpsc channel    │──────► DoorController
//! │ (blocking)   │                  └──────────────────┘
//! └──────────────┘
//! ```

use std::io::{ErrorKind, Read};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{HardwareError, Result};

/// Size of a single read from the port.
const READ_CHUNK_SIZE: usize = 64;

/// How long a single read may block before checking whether the consumer
/// has gone away.
const READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial port settings for the card reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialReaderConfig {
    pub port: String,
    pub baud_rate: u32,
}

/// Forward bytes from `source` into `tx` until the source ends, fails, or the
/// receiver is dropped.
///
/// Read timeouts are expected on an idle serial line and are not errors.
/// Must be called from a blocking context.
///
/// # Errors
///
/// Returns the underlying I/O error if a read fails for any reason other
/// than a timeout or interruption.
pub fn forward_bytes<R: Read>(mut source: R, tx: &mpsc::Sender<Vec<u8>>) -> Result<()> {
    let mut buf = [0u8; READ_CHUNK_SIZE];

    loop {
        match source.read(&mut buf) {
            Ok(0) => {
                debug!("Card reader stream ended");
                return Ok(());
            }
            Ok(n) => {
                trace!(bytes = n, "Read from card reader");
                if tx.blocking_send(buf[..n].to_vec()).is_err() {
                    debug!("Card reader consumer closed");
                    return Ok(());
                }
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {
                if tx.is_closed() {
                    debug!("Card reader consumer closed");
                    return Ok(());
                }
            }
            Err(e) => {
                warn!("Card reader read failed: {}", e);
                return Err(e.into());
            }
        }
    }
}

/// Open the serial port and start forwarding its bytes into `tx`.
///
/// The port is opened before this returns, so a missing device is reported
/// to the caller immediately.
///
/// # Errors
///
/// Returns an error if the port cannot be opened.
pub fn spawn_serial_reader(
    config: &SerialReaderConfig,
    tx: mpsc::Sender<Vec<u8>>,
) -> Result<JoinHandle<Result<()>>> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| {
            HardwareError::initialization_failed(format!(
                "Cannot open card reader at {}: {}",
                config.port, e
            ))
        })?;

    info!(port = %config.port, baud = config.baud_rate, "Card reader opened");

    Ok(tokio::task::spawn_blocking(move || forward_bytes(port, &tx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Source that times out once, then yields data, then fails.
    struct FlakySource {
        step: usize,
    }

    impl Read for FlakySource {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.step += 1;
            match self.step {
                1 => Err(std::io::Error::new(ErrorKind::TimedOut, "idle")),
                2 => {
                    buf[..3].copy_from_slice(b"00A");
                    Ok(3)
                }
                _ => Err(std::io::Error::new(ErrorKind::BrokenPipe, "unplugged")),
            }
        }
    }

    #[test]
    fn test_forward_bytes_until_end_of_stream() {
        let (tx, mut rx) = mpsc::channel(16);
        let data = b"00AB12CD34".repeat(10);

        forward_bytes(Cursor::new(data.clone()), &tx).unwrap();
        drop(tx);

        let mut received = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            received.extend(chunk);
        }
        assert_eq!(received, data);
    }

    #[test]
    fn test_forward_bytes_stops_when_consumer_closed() {
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let result = forward_bytes(Cursor::new(b"00AB12CD34".to_vec()), &tx);
        assert!(result.is_ok());
    }

    #[test]
    fn test_forward_bytes_skips_timeouts_and_reports_errors() {
        let (tx, mut rx) = mpsc::channel(16);

        let result = forward_bytes(FlakySource { step: 0 }, &tx);
        assert!(matches!(result, Err(HardwareError::Io(_))));
        assert_eq!(rx.try_recv().unwrap(), b"00A".to_vec());
    }

    #[tokio::test]
    async fn test_spawn_serial_reader_missing_port() {
        let (tx, _rx) = mpsc::channel(16);
        let config = SerialReaderConfig {
            port: "/dev/latchkey-does-not-exist".to_string(),
            baud_rate: 57_600,
        };

        let result = spawn_serial_reader(&config, tx);
        assert!(matches!(
            result,
            Err(HardwareError::InitializationFailed { .. })
        ));
    }
}
