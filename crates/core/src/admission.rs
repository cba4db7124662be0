//! Bounded device admission.
//!
//! Each identity may hold at most `max_devices` admitted devices. Admitting a
//! device that is already a member only refreshes its recency. Admitting a new
//! device into a full roster evicts the least-recently-active members first.
//!
//! [`AdmissionPolicy::decide`] is pure: it inspects a roster snapshot and
//! reports what the caller must apply. Session index implementations apply
//! the decision inside their own atomic section.

use crate::lifetimes::MAX_DEVICES;
use crate::types::DeviceId;

/// What admitting a device into a roster requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// The device is already a member; only its recency changes.
    Existing,
    /// The device is new and fits under the cap.
    Admit,
    /// The device is new; these members (oldest first) must be removed first.
    Evict(Vec<DeviceId>),
}

impl AdmissionDecision {
    /// Devices to remove before admission.
    pub fn evicted(&self) -> &[DeviceId] {
        match self {
            AdmissionDecision::Evict(devices) => devices,
            _ => &[],
        }
    }
}

/// Per-identity device cap with oldest-first eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    max_devices: usize,
}

impl AdmissionPolicy {
    /// A policy admitting at most `max_devices` (at least one) devices.
    pub fn new(max_devices: usize) -> Self {
        Self {
            max_devices: max_devices.max(1),
        }
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// Decide how `incoming` enters a roster of `(device, recency)` pairs.
    ///
    /// Lower recency means less recently active. Ties are broken by whatever
    /// order the roster yields them in.
    pub fn decide<'a, S, I>(&self, roster: I, incoming: &str) -> AdmissionDecision
    where
        S: Ord + 'a,
        I: IntoIterator<Item = (&'a DeviceId, &'a S)>,
    {
        let mut members: Vec<(&DeviceId, &S)> = Vec::new();
        for (device, recency) in roster {
            if device == incoming {
                return AdmissionDecision::Existing;
            }
            members.push((device, recency));
        }

        if members.len() < self.max_devices {
            return AdmissionDecision::Admit;
        }

        // Keep max_devices - 1 members so the newcomer fits.
        let excess = members.len() + 1 - self.max_devices;
        members.sort_by(|a, b| a.1.cmp(b.1));
        AdmissionDecision::Evict(
            members
                .into_iter()
                .take(excess)
                .map(|(device, _)| device.clone())
                .collect(),
        )
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(MAX_DEVICES)
    }
}
