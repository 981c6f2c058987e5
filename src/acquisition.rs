//! One-shot device handshakes polled from the frame loop.
//!
//! Opening a microphone or a video source can take a while (or wait on a
//! permission prompt). The handshake runs on a worker thread and reports
//! back once over a channel; the frame loop polls without ever blocking.

use std::fmt::Display;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;

/// Observable acquisition state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquisitionState {
    /// Handshake still running
    Pending,
    /// Device available
    Ready,
    /// Handshake failed or no device was configured; stays this way
    Failed,
}

enum Slot<T, E> {
    Pending(Receiver<Result<T, E>>),
    Ready(T),
    Failed(Option<E>),
}

/// A device capability that resolves once, from Pending to Ready or Failed
pub struct Acquisition<T, E> {
    label: &'static str,
    slot: Slot<T, E>,
}

impl<T, E: Display> Acquisition<T, E> {
    /// Create a pending acquisition and the sender its worker resolves it with
    pub fn channel(label: &'static str) -> (Sender<Result<T, E>>, Self) {
        let (tx, rx) = mpsc::channel();
        (
            tx,
            Self {
                label,
                slot: Slot::Pending(rx),
            },
        )
    }

    /// Run `handshake` on a named worker thread
    pub fn spawn<F>(label: &'static str, handshake: F) -> Self
    where
        T: Send + 'static,
        E: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
    {
        let (tx, acquisition) = Self::channel(label);
        let spawned = thread::Builder::new()
            .name(format!("{}-handshake", label))
            .spawn(move || {
                // Receiver may already be gone if the owner was dropped
                let _ = tx.send(handshake());
            });
        match spawned {
            Ok(_) => acquisition,
            Err(e) => {
                log::warn!("{}: failed to spawn handshake thread: {}", label, e);
                Self::unavailable(label)
            }
        }
    }

    /// Already-available capability
    pub fn ready(label: &'static str, value: T) -> Self {
        Self {
            label,
            slot: Slot::Ready(value),
        }
    }

    /// Capability that will never become available
    pub fn unavailable(label: &'static str) -> Self {
        Self {
            label,
            slot: Slot::Failed(None),
        }
    }

    /// Check for a handshake result without blocking
    pub fn poll(&mut self) -> AcquisitionState {
        if let Slot::Pending(rx) = &self.slot {
            match rx.try_recv() {
                Ok(Ok(value)) => {
                    log::info!("{}: ready", self.label);
                    self.slot = Slot::Ready(value);
                }
                Ok(Err(e)) => {
                    log::warn!("{}: unavailable ({}), continuing without it", self.label, e);
                    self.slot = Slot::Failed(Some(e));
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    log::warn!("{}: handshake thread exited without a result", self.label);
                    self.slot = Slot::Failed(None);
                }
            }
        }
        self.state()
    }

    pub fn state(&self) -> AcquisitionState {
        match self.slot {
            Slot::Pending(_) => AcquisitionState::Pending,
            Slot::Ready(_) => AcquisitionState::Ready,
            Slot::Failed(_) => AcquisitionState::Failed,
        }
    }

    /// Poll, then borrow the device if it is ready
    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.poll();
        match &mut self.slot {
            Slot::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Error reported by a failed handshake
    pub fn error(&self) -> Option<&E> {
        match &self.slot {
            Slot::Failed(e) => e.as_ref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_resolved<T, E: Display>(acq: &mut Acquisition<T, E>) -> AcquisitionState {
        let deadline = Instant::now() + Duration::from_secs(5);
        while acq.poll() == AcquisitionState::Pending && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        acq.state()
    }

    #[test]
    fn test_channel_stays_pending_until_resolved() {
        let (tx, mut acq) = Acquisition::<u32, String>::channel("test");
        assert_eq!(acq.poll(), AcquisitionState::Pending);
        assert!(acq.get_mut().is_none());

        tx.send(Ok(7)).unwrap();
        assert_eq!(acq.get_mut().copied(), Some(7));
        assert_eq!(acq.state(), AcquisitionState::Ready);
    }

    #[test]
    fn test_failure_is_terminal() {
        let (tx, mut acq) = Acquisition::<u32, String>::channel("test");
        tx.send(Err("denied".to_string())).unwrap();
        assert_eq!(acq.poll(), AcquisitionState::Failed);
        assert_eq!(acq.error().map(String::as_str), Some("denied"));
        assert!(acq.get_mut().is_none());
    }

    #[test]
    fn test_dropped_sender_fails() {
        let (tx, mut acq) = Acquisition::<u32, String>::channel("test");
        drop(tx);
        assert_eq!(acq.poll(), AcquisitionState::Failed);
        assert!(acq.error().is_none());
    }

    #[test]
    fn test_spawned_handshake_resolves() {
        let mut acq = Acquisition::<&str, String>::spawn("test", || Ok("device"));
        assert_eq!(wait_resolved(&mut acq), AcquisitionState::Ready);

        let mut acq = Acquisition::<&str, String>::spawn("test", || Err("busy".into()));
        assert_eq!(wait_resolved(&mut acq), AcquisitionState::Failed);
    }
}
