use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host};
use vigil_foundation::AudioError;

#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Input/output device lookup with name matching and default fallback.
pub struct DeviceManager {
    host: Host,
}

impl DeviceManager {
    pub fn new() -> Result<Self, AudioError> {
        Ok(Self {
            host: cpal::default_host(),
        })
    }

    pub fn host_id(&self) -> cpal::HostId {
        self.host.id()
    }

    pub fn enumerate_inputs(&self) -> Vec<DeviceInfo> {
        let mut devices = Vec::new();
        if let Ok(inputs) = self.host.input_devices() {
            for device in inputs {
                if let Ok(name) = device.name() {
                    devices.push(DeviceInfo {
                        name,
                        is_default: false,
                    });
                }
            }
        }
        if let Some(default) = self.host.default_input_device() {
            if let Ok(default_name) = default.name() {
                for device in &mut devices {
                    if device.name == default_name {
                        device.is_default = true;
                    }
                }
            }
        }
        devices
    }

    pub fn default_input_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Candidate input names in priority order: ALSA "default" shim,
    /// "pipewire", the OS default, then everything else.
    pub fn candidate_device_names(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let all = self.enumerate_inputs();

        if all.iter().any(|d| d.name == "default") {
            out.push("default".to_string());
        }
        if !out.iter().any(|n| n == "pipewire") && all.iter().any(|d| d.name == "pipewire") {
            out.push("pipewire".to_string());
        }
        if let Some(def) = self.default_input_device_name() {
            if !out.iter().any(|n| n == &def) {
                out.push(def);
            }
        }
        for d in all {
            if !out.iter().any(|n| n == &d.name) {
                out.push(d.name);
            }
        }

        out
    }

    pub fn open_input(&self, name: Option<&str>) -> Result<Device, AudioError> {
        if let Some(preferred) = name {
            if let Some(device) = find_by_name(self.host.input_devices().ok(), preferred) {
                return Ok(device);
            }
            // A specific name was given; do not silently fall back
            return Err(AudioError::DeviceNotFound {
                name: Some(preferred.to_string()),
            });
        }

        self.host
            .default_input_device()
            .ok_or(AudioError::DeviceNotFound { name: None })
    }

    pub fn open_output(&self, name: Option<&str>) -> Result<Device, AudioError> {
        if let Some(preferred) = name {
            if let Some(device) = find_by_name(self.host.output_devices().ok(), preferred) {
                return Ok(device);
            }
            return Err(AudioError::DeviceNotFound {
                name: Some(preferred.to_string()),
            });
        }

        self.host
            .default_output_device()
            .ok_or(AudioError::DeviceNotFound { name: None })
    }
}

fn find_by_name<I>(devices: Option<I>, preferred: &str) -> Option<Device>
where
    I: Iterator<Item = Device>,
{
    let devices: Vec<Device> = devices.map(|d| d.collect()).unwrap_or_default();

    // Exact match first
    for device in &devices {
        if device.name().map(|n| n == preferred).unwrap_or(false) {
            return Some(device.clone());
        }
    }
    // Then case-insensitive substring
    let lowered = preferred.to_lowercase();
    for device in &devices {
        if let Ok(n) = device.name() {
            if n.to_lowercase().contains(&lowered) {
                tracing::warn!(
                    "Preferred device '{}' not found exactly; using closest match '{}'",
                    preferred,
                    n
                );
                return Some(device.clone());
            }
        }
    }
    None
}
