//! Audio input device enumeration and selection.

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};

use super::CaptureError;

/// An input device as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// List all audio input devices on the system.
///
/// # Errors
/// Returns an error if no input devices are found.
pub fn list_input_devices() -> Result<Vec<DeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host
        .default_input_device()
        .and_then(|d| d.description().ok())
        .map(|d| d.to_string());

    let mut devices = Vec::new();
    for device in host.input_devices()? {
        if let Ok(desc) = device.description() {
            let name = desc.to_string();
            devices.push(DeviceInfo {
                is_default: default_name.as_ref() == Some(&name),
                name,
            });
        }
    }

    if devices.is_empty() {
        anyhow::bail!("No audio input devices found");
    }

    Ok(devices)
}

/// Resolve the device to capture from: the one whose description matches
/// `preferred`, falling back to the system default. A missing preferred
/// device is not fatal, only a missing default is.
pub(crate) fn resolve_input_device(preferred: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let host = cpal::default_host();

    if let Some(wanted) = preferred {
        let devices = host
            .input_devices()
            .map_err(|e| CaptureError::Backend(format!("failed to enumerate input devices: {e}")))?;
        for device in devices {
            if let Ok(desc) = device.description() {
                if desc.to_string() == wanted {
                    return Ok(device);
                }
            }
        }
        crate::verbose!("input device {wanted:?} not found, falling back to default");
    }

    host.default_input_device()
        .ok_or(CaptureError::DeviceNotFound)
}
