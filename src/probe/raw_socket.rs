// SPDX-License-Identifier: MIT
use log::debug;
use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};

use super::{Probe, ProbeResult};

/// Tries to open an `AF_PACKET` raw socket, which needs `CAP_NET_RAW` in the
/// user namespace owning the current network namespace.
#[derive(Debug, Default, Clone, Copy)]
pub struct RawSocketProbe;

impl RawSocketProbe {
    pub const NAME: &'static str = "net-raw";
}

impl Probe for RawSocketProbe {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(&self) -> ProbeResult {
        match socket(
            AddressFamily::Packet,
            SockType::Raw,
            SockFlag::SOCK_CLOEXEC,
            None,
        ) {
            Ok(fd) => {
                debug!("opened raw packet socket {:?}", fd);
                // only creation is tested, the socket is closed right away
                drop(fd);
                ProbeResult::success(Self::NAME, "Raw socket successfully created.")
            }
            Err(e) => ProbeResult::failure(Self::NAME, format!("Error creating raw socket: {}", e)),
        }
    }
}
