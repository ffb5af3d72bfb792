//! Capture-device layer.
//!
//! A capture device produces a rolling window of scalar samples on its own
//! schedule; the frame loop only ever asks for the latest snapshot. The
//! registry owns every known device and tracks which one is capturing.

mod dummy;

pub use dummy::DummyDevice;

/// A source of scalar samples.
///
/// `start_capture`/`stop_capture` bracket the device's producing state;
/// `data` may be called at any time and returns the most recent sample
/// window (empty while nothing has been captured).
pub trait CaptureDevice {
    fn name(&self) -> &str;

    fn start_capture(&mut self);

    fn stop_capture(&mut self);

    fn data(&self) -> Vec<f64>;
}

/// Owns the known capture devices and the currently active one.
pub struct DeviceRegistry {
    devices: Vec<Box<dyn CaptureDevice>>,
    current: Option<usize>,
}

impl DeviceRegistry {
    /// Creates a registry with the built-in devices.
    pub fn new() -> Self {
        Self {
            devices: vec![Box::new(DummyDevice::new())],
            current: None,
        }
    }

    /// Names of every registered device, for selection UIs.
    pub fn device_names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name().to_string()).collect()
    }

    /// Name of the device currently capturing, if any.
    pub fn current_name(&self) -> Option<&str> {
        self.current.map(|i| self.devices[i].name())
    }

    /// Switches capture to the named device.
    ///
    /// The active device (if any) is stopped first. An unknown name stops
    /// capture without starting anything.
    pub fn start_capture(&mut self, name: &str) {
        self.stop_capture();

        let found = self.devices.iter().position(|d| d.name() == name);
        if found.is_none() {
            log::warn!("no capture device named {name:?}");
        }

        if let Some(i) = found {
            self.devices[i].start_capture();
            self.current = Some(i);
        }
    }

    /// Stops the active device, if any.
    pub fn stop_capture(&mut self) {
        if let Some(i) = self.current.take() {
            self.devices[i].stop_capture();
        }
    }

    /// Latest sample window from the active device; empty when idle.
    pub fn data(&self) -> Vec<f64> {
        match self.current {
            Some(i) => self.devices[i].data(),
            None => Vec::new(),
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
