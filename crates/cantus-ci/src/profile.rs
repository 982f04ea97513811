//! Profiles and the observable profile list.

use crate::constants::address;
use crate::observer::Listeners;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Five-byte profile identifier (bank/organization plus profile number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MidiCiProfileId(pub [u8; 5]);

impl MidiCiProfileId {
    pub const fn new(bytes: [u8; 5]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 5] {
        &self.0
    }
}

impl std::fmt::Display for MidiCiProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MidiCiProfile {
    pub profile: MidiCiProfileId,
    pub group: u8,
    /// Channel 0-15, or 0x7E (group) / 0x7F (function block).
    pub address: u8,
    pub enabled: bool,
    pub num_channels_requested: u16,
}

impl MidiCiProfile {
    pub fn new(profile: MidiCiProfileId, group: u8, address: u8, enabled: bool, num_channels_requested: u16) -> Self {
        Self {
            profile,
            group,
            address,
            enabled,
            num_channels_requested,
        }
    }

    /// Channel count implied for a profile learned from a peer.
    pub(crate) fn default_channels(address: u8) -> u16 {
        if address::is_group_or_function_block(address) {
            0
        } else {
            1
        }
    }

    fn same_target(&self, other: &MidiCiProfile) -> bool {
        self.profile == other.profile && self.group == other.group && self.address == other.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfilesChange {
    Added(MidiCiProfile),
    Removed(MidiCiProfile),
    EnabledChanged(MidiCiProfile),
}

/// Profile list that reports every change to its listeners.
#[derive(Debug, Default)]
pub struct ObservableProfileList {
    profiles: Vec<MidiCiProfile>,
    pub changed: Listeners<ProfilesChange>,
}

impl ObservableProfileList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profiles(&self) -> &[MidiCiProfile] {
        &self.profiles
    }

    pub fn iter(&self) -> impl Iterator<Item = &MidiCiProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Adds a profile, replacing an entry with the same id, group and address.
    pub fn add(&mut self, profile: MidiCiProfile) {
        match self.profiles.iter_mut().find(|p| p.same_target(&profile)) {
            Some(existing) => {
                let enabled_changed = existing.enabled != profile.enabled;
                *existing = profile.clone();
                if enabled_changed {
                    self.changed.notify(&ProfilesChange::EnabledChanged(profile));
                }
            }
            None => {
                self.profiles.push(profile.clone());
                self.changed.notify(&ProfilesChange::Added(profile));
            }
        }
    }

    pub fn remove(&mut self, profile: &MidiCiProfileId, group: u8, address: u8) -> Option<MidiCiProfile> {
        let index = self
            .profiles
            .iter()
            .position(|p| p.profile == *profile && p.group == group && p.address == address)?;
        let removed = self.profiles.remove(index);
        self.changed.notify(&ProfilesChange::Removed(removed.clone()));
        Some(removed)
    }

    /// Updates the enabled state of every entry at `address`. Returns whether
    /// any entry actually changed.
    pub fn set_enabled(&mut self, enabled: bool, address: u8, profile: &MidiCiProfileId, num_channels_requested: u16) -> bool {
        let mut changed = Vec::new();
        for p in self
            .profiles
            .iter_mut()
            .filter(|p| p.address == address && p.profile == *profile)
        {
            p.num_channels_requested = num_channels_requested;
            if p.enabled != enabled {
                p.enabled = enabled;
                changed.push(p.clone());
            }
        }
        for p in &changed {
            self.changed.notify(&ProfilesChange::EnabledChanged(p.clone()));
        }
        !changed.is_empty()
    }

    pub fn find(&self, profile: &MidiCiProfileId, address: u8) -> Option<&MidiCiProfile> {
        self.profiles.iter().find(|p| p.profile == *profile && p.address == address)
    }

    pub fn matching_profiles(&self, address: u8, enabled: bool) -> Vec<MidiCiProfileId> {
        self.profiles
            .iter()
            .filter(|p| p.address == address && p.enabled == enabled)
            .map(|p| p.profile)
            .collect()
    }

    /// Distinct addresses in ascending order.
    pub fn addresses(&self) -> Vec<u8> {
        let mut addresses: Vec<u8> = self.profiles.iter().map(|p| p.address).collect();
        addresses.sort_unstable();
        addresses.dedup();
        addresses
    }

    pub fn clear(&mut self) {
        for removed in std::mem::take(&mut self.profiles) {
            self.changed.notify(&ProfilesChange::Removed(removed));
        }
    }
}
