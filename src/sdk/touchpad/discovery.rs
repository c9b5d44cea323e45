use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TouchpadNode {
    pub devnode: PathBuf,
    pub serial: String,
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("udev error: {0}")]
    Udev(String),
}

/// Lists touchpad event nodes known to udev. No touchpads is an empty list.
pub fn find_touchpads() -> Result<Vec<TouchpadNode>, DiscoveryError> {
    let mut enumerator =
        udev::Enumerator::new().map_err(|e| DiscoveryError::Udev(e.to_string()))?;

    enumerator
        .match_subsystem("input")
        .map_err(|e| DiscoveryError::Udev(e.to_string()))?;

    enumerator
        .match_property("ID_INPUT_TOUCHPAD", "1")
        .map_err(|e| DiscoveryError::Udev(e.to_string()))?;

    let mut results = Vec::new();

    for device in enumerator
        .scan_devices()
        .map_err(|e| DiscoveryError::Udev(e.to_string()))?
    {
        let syspath = device.syspath().to_string_lossy().to_string();
        if !syspath.contains("/event") {
            continue;
        }

        if let Some(devnode) = device.devnode() {
            let serial = device
                .property_value("ID_SERIAL")
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| devnode.display().to_string());
            results.push(TouchpadNode {
                devnode: PathBuf::from(devnode),
                serial,
            });
        }
    }

    Ok(results)
}
