//! Working state while acquiring the next armband.
//!
//! A [`Session`] is a value: every transition consumes the current state and
//! returns the next one. Handlers never poke at individual flags.

use myolink_bgapi::myohw::MYO_SERVICE_ID;
use myolink_bgapi::{Address, ConnectionStatus, ScanResponse, CONNECTION_FULLY_CONNECTED};

use crate::registry::{Device, Registry};

/// Which advertisements may become a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryFilter {
    /// Bytes the advertisement data must end with.
    pub service_id: Vec<u8>,
    /// If set, only this hardware address is accepted.
    pub address: Option<Address>,
}

impl Default for DiscoveryFilter {
    fn default() -> Self {
        DiscoveryFilter {
            service_id: MYO_SERVICE_ID.to_vec(),
            address: None,
        }
    }
}

impl DiscoveryFilter {
    /// Restrict to one hardware address.
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    pub fn accepts(&self, adv: &ScanResponse) -> bool {
        if !adv.data.ends_with(&self.service_id) {
            return false;
        }
        match self.address {
            Some(expected) => expected == adv.sender,
            None => true,
        }
    }
}

/// Acquisition state for the next device slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    /// Nothing in progress.
    #[default]
    Idle,
    /// Discovery running, no candidate yet.
    Scanning,
    /// A matching advertiser was found; discovery should be stopped.
    Candidate(Device),
    /// Direct connect issued, waiting for the link to come up.
    Connecting(Device),
    /// Link is up and the connection handle is known.
    Connected(Device),
}

impl Session {
    /// Discovery command was issued.
    pub fn start_scan(self) -> Session {
        Session::Scanning
    }

    /// Offer an advertisement. Only a scanning session with no candidate can
    /// accept it, and never for an address the registry already holds.
    pub fn on_advertisement(self, adv: &ScanResponse, filter: &DiscoveryFilter, registry: &Registry) -> Session {
        match self {
            Session::Scanning if filter.accepts(adv) && !registry.contains_address(&adv.sender) => {
                Session::Candidate(Device::new(adv.sender))
            }
            other => other,
        }
    }

    /// Direct connect was issued for the candidate.
    pub fn begin_connect(self) -> Session {
        match self {
            Session::Candidate(device) => Session::Connecting(device),
            other => other,
        }
    }

    /// Apply a connection status event. Only a fully connected status for the
    /// address being connected advances the session.
    pub fn on_connection_status(self, status: &ConnectionStatus) -> Session {
        match self {
            Session::Connecting(mut device)
                if device.address == status.address && status.flags == CONNECTION_FULLY_CONNECTED =>
            {
                device.connection = Some(status.connection);
                Session::Connected(device)
            }
            other => other,
        }
    }

    /// The device being acquired, if there is one yet.
    pub fn device(&self) -> Option<&Device> {
        match self {
            Session::Candidate(d) | Session::Connecting(d) | Session::Connected(d) => Some(d),
            Session::Idle | Session::Scanning => None,
        }
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, Session::Scanning)
    }

    pub fn has_candidate(&self) -> bool {
        matches!(self, Session::Candidate(_))
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Session::Connected(_))
    }
}
