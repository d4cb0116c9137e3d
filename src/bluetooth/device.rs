// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Candidate devices and the registry that deduplicates them.

use std::fmt;

/// A remote Bluetooth device.
///
/// Two devices are equal when their addresses match; name and pairing
/// state are informational.
#[derive(Debug, Clone, Eq)]
pub struct Device {
    name: String,
    address: String,
    paired: bool,
}

impl Device {
    pub fn new(name: impl Into<String>, address: impl Into<String>, paired: bool) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            paired,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hardware address, e.g. `00:11:22:33:44:55`.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_paired(&self) -> bool {
        self.paired
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl std::hash::Hash for Device {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.address)
    }
}

/// Ordered candidate list: paired devices first, then discovered ones.
#[derive(Debug, Default, Clone)]
pub struct DeviceRegistry {
    paired: Vec<Device>,
    discovered: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the paired prefix.
    ///
    /// Duplicate addresses in `devices` collapse to their first entry, and
    /// discovered entries now covered by a paired one are dropped.
    pub fn add_paired(&mut self, devices: impl IntoIterator<Item = Device>) {
        self.paired.clear();
        for device in devices {
            if !self.paired.contains(&device) {
                self.paired.push(device);
            }
        }
        let paired = &self.paired;
        self.discovered.retain(|d| !paired.contains(d));
    }

    /// Append a discovered device unless its address is already known.
    ///
    /// Returns `true` if the registry grew.
    pub fn add_discovered(&mut self, device: Device) -> bool {
        if self.contains(device.address()) {
            return false;
        }
        self.discovered.push(device);
        true
    }

    pub fn contains(&self, address: &str) -> bool {
        self.paired
            .iter()
            .chain(self.discovered.iter())
            .any(|d| d.address() == address)
    }

    pub fn clear(&mut self) {
        self.paired.clear();
        self.discovered.clear();
    }

    /// Current ordered sequence.
    pub fn snapshot(&self) -> Vec<Device> {
        self.paired
            .iter()
            .chain(self.discovered.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.paired.len() + self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
