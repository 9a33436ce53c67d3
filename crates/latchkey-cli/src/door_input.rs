//! Door events from a line-oriented source.
//!
//! Bench setups without a door sensor type `open`, `close`, `unlock` or
//! `lock` on stdin. Unknown lines are logged and skipped.
//!
//! The source is read on a plain thread, so a read blocked on stdin never
//! holds up runtime shutdown.

use std::io::BufRead;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use latchkey_hardware::DoorEvent;

/// Parse lines from `reader` into door events until it ends or the receiver
/// is dropped.
///
/// Must be called from a blocking context.
///
/// # Errors
///
/// Returns the underlying I/O error if reading fails.
pub fn forward_door_events<R: BufRead>(
    reader: R,
    tx: &mpsc::Sender<DoorEvent>,
) -> std::io::Result<()> {
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.parse::<DoorEvent>() {
            Ok(event) => {
                debug!(%event, "Door event from input");
                if tx.blocking_send(event).is_err() {
                    debug!("Door event consumer closed");
                    break;
                }
            }
            Err(e) => warn!(input = line, "Ignoring door input: {}", e),
        }
    }

    Ok(())
}

/// Start forwarding door events from `reader` on a dedicated thread.
///
/// The thread is never joined on shutdown; it ends with the process.
///
/// # Errors
///
/// Returns an error if the thread cannot be spawned.
pub fn spawn_door_input<R>(
    reader: R,
    tx: mpsc::Sender<DoorEvent>,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("door-input".to_string())
        .spawn(move || {
            if let Err(e) = forward_door_events(reader, &tx) {
                warn!("Door input failed: {}", e);
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwards_known_events_and_skips_noise() {
        let input: &[u8] = b"open\n\n  close  \nbogus\nUNLOCK\nlock\n";
        let (tx, mut rx) = mpsc::channel(16);

        forward_door_events(input, &tx).unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.blocking_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                DoorEvent::DoorOpened,
                DoorEvent::DoorClosed,
                DoorEvent::ManualUnlock,
                DoorEvent::ManualLock,
            ]
        );
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let input: &[u8] = b"open\nclose\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(forward_door_events(input, &tx).is_ok());
    }

    #[tokio::test]
    async fn test_spawned_input_delivers_events() {
        let (tx, mut rx) = mpsc::channel(4);

        let thread = spawn_door_input(&b"close\nopen\n"[..], tx).unwrap();

        assert_eq!(rx.recv().await, Some(DoorEvent::DoorClosed));
        assert_eq!(rx.recv().await, Some(DoorEvent::DoorOpened));
        assert_eq!(rx.recv().await, None);
        assert!(thread.join().is_ok());
    }
}
