//! Output device enumeration
//!
//! Every cpal host is searched, so a JACK device can be chosen on a
//! machine whose default host is ALSA.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Host, HostId};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// Rates probed against each device's supported ranges
const PROBE_RATES: [u32; 6] = [44100, 48000, 88200, 96000, 176400, 192000];

/// Host label as shown to users and stored in [`DeviceId::host`]
fn host_name(host_id: HostId) -> String {
    host_id.name().to_string()
}

fn host_by_name(name: &str) -> Option<Host> {
    cpal::available_hosts()
        .into_iter()
        .find(|&host_id| host_name(host_id) == name)
        .and_then(|host_id| cpal::host_from_id(host_id).ok())
}

fn find_in_host(host: &Host, name: &str) -> Option<cpal::Device> {
    host.output_devices()
        .ok()?
        .find(|d: &cpal::Device| d.name().map_or(false, |n| n == name))
}

/// An output device and what it can do
#[derive(Debug, Clone)]
pub struct AudioDevice {
    pub id: DeviceId,
    pub name: String,
    pub host: String,
    pub is_default: bool,
    /// Probe rates inside the device's supported ranges, ascending
    pub sample_rates: Vec<u32>,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id.display_label())?;
        if !self.sample_rates.is_empty() {
            let rates: Vec<String> = self.sample_rates.iter().map(u32::to_string).collect();
            write!(f, " ({}ch, {} Hz)", self.max_channels, rates.join("/"))?;
        }
        if self.is_default {
            write!(f, " *")?;
        }
        Ok(())
    }
}

impl AudioDevice {
    /// Describe `device`; `None` when it offers no output configuration
    fn describe(device: &cpal::Device, host: &str, default_name: Option<&str>) -> Option<Self> {
        let name = device.name().ok()?;
        let ranges: Vec<_> = device.supported_output_configs().ok()?.collect();
        if ranges.is_empty() {
            return None;
        }

        let max_channels = ranges.iter().map(|r| r.channels()).max().unwrap_or(0);
        let sample_rates = PROBE_RATES
            .into_iter()
            .filter(|&rate| {
                ranges
                    .iter()
                    .any(|r| (r.min_sample_rate().0..=r.max_sample_rate().0).contains(&rate))
            })
            .collect();

        Some(Self {
            id: DeviceId::with_host(&name, host),
            is_default: default_name == Some(name.as_str()),
            name,
            host: host.to_string(),
            sample_rates,
            max_channels,
        })
    }
}

/// List output devices from every host, defaults first
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut devices = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("Skipping host {:?}: {}", host_id, e);
                continue;
            }
        };
        let label = host_name(host_id);
        let default_name = host
            .default_output_device()
            .and_then(|d: cpal::Device| d.name().ok());

        match host.output_devices() {
            Ok(outputs) => devices.extend(
                outputs.filter_map(|d: cpal::Device| AudioDevice::describe(&d, &label, default_name.as_deref())),
            ),
            Err(e) => log::debug!("Could not enumerate {} outputs: {}", label, e),
        }
    }

    if devices.is_empty() {
        return Err(AudioError::NoDevices);
    }

    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.host.cmp(&b.host))
            .then_with(|| a.name.cmp(&b.name))
    });
    log::info!("Found {} output devices", devices.len());
    Ok(devices)
}

/// Resolve a configured device, searching every host when none is named
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<cpal::Device> {
    let found = match id.host.as_deref() {
        Some(host) => host_by_name(host).and_then(|h| find_in_host(&h, &id.name)),
        None => cpal::available_hosts()
            .into_iter()
            .filter_map(|host_id| cpal::host_from_id(host_id).ok())
            .find_map(|h| find_in_host(&h, &id.name)),
    };
    found.ok_or_else(|| AudioError::DeviceNotFound(id.clone()))
}

/// Default output device of the default host
pub fn get_default_device() -> AudioResult<cpal::Device> {
    let host = cpal::default_host();
    host.default_output_device()
        .ok_or_else(|| AudioError::NoDefaultDevice(host_name(host.id())))
}
