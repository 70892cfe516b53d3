//! List audio input devices.

use anyhow::Result;
use vocalize_core::capture::devices::list_input_devices;

pub fn run() -> Result<()> {
    for device in list_input_devices()? {
        println!(
            "{}{}",
            device.name,
            if device.is_default { " (default)" } else { "" }
        );
    }
    Ok(())
}
