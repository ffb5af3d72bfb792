use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::Rng;

use super::CaptureDevice;

/// Number of samples the rolling window holds.
const WINDOW_LEN: usize = 100;

/// Producer cadence.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Synthetic capture device: one sample every 100 ms, uniformly distributed
/// in `[500, 700)`, into a fixed 100-slot rolling window.
///
/// Capture runs on a background thread; `data` snapshots the window from any
/// thread. Stopping joins the thread, so no samples arrive after
/// `stop_capture` returns.
pub struct DummyDevice {
    ring: Arc<Mutex<SampleRing>>,
    stop_tx: Option<mpsc::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self {
            ring: Arc::new(Mutex::new(SampleRing::new(WINDOW_LEN))),
            stop_tx: None,
            worker: None,
        }
    }
}

impl CaptureDevice for DummyDevice {
    fn name(&self) -> &str {
        "dummy"
    }

    fn start_capture(&mut self) {
        if self.worker.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let ring = Arc::clone(&self.ring);

        let worker = thread::spawn(move || {
            let mut rng = rand::thread_rng();
            loop {
                // Sleep for one interval, waking early if stopped.
                match stop_rx.recv_timeout(SAMPLE_INTERVAL) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }

                let sample = rng.gen_range(500.0..700.0);
                if let Ok(mut ring) = ring.lock() {
                    ring.push(sample);
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.worker = Some(worker);
        log::info!("dummy capture started");
    }

    fn stop_capture(&mut self) {
        // Dropping the sender wakes the worker with Disconnected.
        self.stop_tx = None;

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("dummy capture worker panicked");
            } else {
                log::info!("dummy capture stopped");
            }
        }
    }

    fn data(&self) -> Vec<f64> {
        self.ring.lock().map(|r| r.snapshot()).unwrap_or_default()
    }
}

impl Drop for DummyDevice {
    fn drop(&mut self) {
        self.stop_capture();
    }
}

impl Default for DummyDevice {
    fn default() -> Self {
        Self::new()
    }
}

// ── sample ring ───────────────────────────────────────────────────────────

/// Fixed-capacity rolling sample window.
///
/// Writes advance a wrapping cursor, overwriting the oldest slot once the
/// window is full; reads snapshot the window in slot order.
struct SampleRing {
    samples: Vec<f64>,
    cursor: usize,
}

impl SampleRing {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            cursor: 0,
        }
    }

    fn push(&mut self, sample: f64) {
        if self.cursor >= self.samples.len() {
            self.cursor = 0;
        }
        self.samples[self.cursor] = sample;
        self.cursor += 1;
    }

    fn snapshot(&self) -> Vec<f64> {
        self.samples.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── ring ──────────────────────────────────────────────────────────────

    #[test]
    fn push_fills_slots_in_order() {
        let mut ring = SampleRing::new(3);
        ring.push(1.0);
        ring.push(2.0);
        assert_eq!(ring.snapshot(), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn push_wraps_and_overwrites_oldest() {
        let mut ring = SampleRing::new(3);
        for s in [1.0, 2.0, 3.0, 4.0] {
            ring.push(s);
        }
        assert_eq!(ring.snapshot(), vec![4.0, 2.0, 3.0]);
    }

    #[test]
    fn snapshot_length_is_fixed() {
        let mut ring = SampleRing::new(4);
        assert_eq!(ring.snapshot().len(), 4);
        for s in 0..10 {
            ring.push(s as f64);
        }
        assert_eq!(ring.snapshot().len(), 4);
    }

    // ── device ────────────────────────────────────────────────────────────

    #[test]
    fn data_before_start_is_all_zero() {
        let device = DummyDevice::new();
        let data = device.data();
        assert_eq!(data.len(), 100);
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn stop_without_start_is_a_no_op() {
        let mut device = DummyDevice::new();
        device.stop_capture();
        device.stop_capture();
    }
}
