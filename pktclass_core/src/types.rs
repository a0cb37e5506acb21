//! Rule-facing value types and the per-packet field view

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};

use crate::attribute::MatchValue;
use crate::constants::VLAN_MAX;
use crate::errors::Error;
use crate::helpers::Prefix;

/// Index of a rule within one classifier generation.
pub type RuleIndex = u32;

/// Opaque action token; its meaning belongs to the caller.
pub type ActionId = u32;

/// Exact-match device token.
pub type DeviceId = u32;

/// IPv4 network in canonical form, host bits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Net4 {
    addr: u32,
    plen: u8,
}

impl Net4 {
    /// Canonicalize `addr` to `plen` bits; fails when `plen` exceeds 32.
    pub fn new(addr: Ipv4Addr, plen: u8) -> Result<Net4, Error> {
        let prefix = Prefix::new(u32::from(addr), plen)?;
        Ok(Net4 {
            addr: prefix.key(),
            plen,
        })
    }

    /// The /32 network of a single address.
    pub fn host(addr: Ipv4Addr) -> Net4 {
        Net4 {
            addr: u32::from(addr),
            plen: 32,
        }
    }

    pub fn addr(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    pub fn plen(&self) -> u8 {
        self.plen
    }

    pub(crate) fn prefix(&self) -> Prefix<u32> {
        Prefix::from_raw(self.addr, self.plen)
    }
}

impl From<Ipv4Net> for Net4 {
    fn from(net: Ipv4Net) -> Net4 {
        Net4 {
            addr: u32::from(net.network()),
            plen: net.prefix_len(),
        }
    }
}

impl From<Ipv4Addr> for Net4 {
    fn from(addr: Ipv4Addr) -> Net4 {
        Net4::host(addr)
    }
}

/// IPv6 network in canonical form, host bits zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Net6 {
    addr: u128,
    plen: u8,
}

impl Net6 {
    /// Canonicalize `addr` to `plen` bits; fails when `plen` exceeds 128.
    pub fn new(addr: Ipv6Addr, plen: u8) -> Result<Net6, Error> {
        let prefix = Prefix::new(u128::from(addr), plen)?;
        Ok(Net6 {
            addr: prefix.key(),
            plen,
        })
    }

    /// The /128 network of a single address.
    pub fn host(addr: Ipv6Addr) -> Net6 {
        Net6 {
            addr: u128::from(addr),
            plen: 128,
        }
    }

    pub fn addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.addr)
    }

    pub fn plen(&self) -> u8 {
        self.plen
    }

    pub(crate) fn prefix(&self) -> Prefix<u128> {
        Prefix::from_raw(self.addr, self.plen)
    }
}

impl From<Ipv6Net> for Net6 {
    fn from(net: Ipv6Net) -> Net6 {
        Net6 {
            addr: u128::from(net.network()),
            plen: net.prefix_len(),
        }
    }
}

impl From<Ipv6Addr> for Net6 {
    fn from(addr: Ipv6Addr) -> Net6 {
        Net6::host(addr)
    }
}

/// Inclusive VLAN id range within the 12-bit 802.1Q domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VlanRange {
    from: u16,
    to: u16,
}

impl VlanRange {
    pub fn new(from: u16, to: u16) -> Result<VlanRange, Error> {
        if from > to {
            return Err(Error::InvalidRange {
                from: from as u32,
                to: to as u32,
            });
        }
        if to > VLAN_MAX {
            return Err(Error::InvalidVlan { id: to });
        }
        Ok(VlanRange { from, to })
    }

    pub fn exact(id: u16) -> Result<VlanRange, Error> {
        VlanRange::new(id, id)
    }

    /// The whole VLAN id space.
    pub fn any() -> VlanRange {
        VlanRange {
            from: 0,
            to: VLAN_MAX,
        }
    }

    pub fn bounds(&self) -> (u16, u16) {
        (self.from, self.to)
    }
}

/// Inclusive TCP/UDP port range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    from: u16,
    to: u16,
}

impl PortRange {
    pub fn new(from: u16, to: u16) -> Result<PortRange, Error> {
        if from > to {
            return Err(Error::InvalidRange {
                from: from as u32,
                to: to as u32,
            });
        }
        Ok(PortRange { from, to })
    }

    pub fn exact(port: u16) -> PortRange {
        PortRange {
            from: port,
            to: port,
        }
    }

    /// The whole port space.
    pub fn any() -> PortRange {
        PortRange {
            from: 0,
            to: u16::MAX,
        }
    }

    pub fn bounds(&self) -> (u16, u16) {
        (self.from, self.to)
    }
}

/// Inclusive protocol-number range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtoRange {
    from: u16,
    to: u16,
}

impl ProtoRange {
    pub fn new(from: u16, to: u16) -> Result<ProtoRange, Error> {
        if from > to {
            return Err(Error::InvalidRange {
                from: from as u32,
                to: to as u32,
            });
        }
        Ok(ProtoRange { from, to })
    }

    pub fn exact(proto: u16) -> ProtoRange {
        ProtoRange {
            from: proto,
            to: proto,
        }
    }

    /// The whole protocol-number space.
    pub fn any() -> ProtoRange {
        ProtoRange {
            from: 0,
            to: u16::MAX,
        }
    }

    pub fn bounds(&self) -> (u16, u16) {
        (self.from, self.to)
    }
}

/// One classification rule: a match value per signature dimension plus the
/// action returned on match.
#[derive(Debug, Clone)]
pub struct Rule {
    pub values: Vec<MatchValue>,
    pub action: ActionId,
}

impl Rule {
    pub fn new(values: Vec<MatchValue>, action: ActionId) -> Rule {
        Rule { values, action }
    }
}

/// Concrete field values for one packet, handed to `query`. The caller
/// fills the fields its signature declares; the rest are ignored.
#[derive(Debug, Clone, Copy)]
pub struct PacketFields {
    pub device: DeviceId,
    pub vlan: u16,
    pub src4: Ipv4Addr,
    pub dst4: Ipv4Addr,
    pub src6: Ipv6Addr,
    pub dst6: Ipv6Addr,
    pub proto: u16,
    pub src_port: u16,
    pub dst_port: u16,
}

impl Default for PacketFields {
    fn default() -> PacketFields {
        PacketFields {
            device: 0,
            vlan: 0,
            src4: Ipv4Addr::UNSPECIFIED,
            dst4: Ipv4Addr::UNSPECIFIED,
            src6: Ipv6Addr::UNSPECIFIED,
            dst6: Ipv6Addr::UNSPECIFIED,
            proto: 0,
            src_port: 0,
            dst_port: 0,
        }
    }
}
