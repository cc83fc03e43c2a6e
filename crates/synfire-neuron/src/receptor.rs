//! Receptor channels and spike-port addressing
//!
//! Spike events address one of four receptor channels through the r-port.
//! Valid spike r-ports are the open interval (0, 4]: port 0 is deliberately
//! reserved so that a default-constructed connection can never silently wire
//! itself to a channel. The rule is enforced at connection-setup time; by the
//! time an event is delivered its r-port is known to be good.

use core::fmt;

use synfire_event::RPort;

/// The four synaptic receptor channels of the neuron
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Receptor {
    /// Fast glutamatergic channel
    Ampa,
    /// Voltage-gated glutamatergic channel
    Nmda,
    /// Fast GABAergic channel
    GabaA,
    /// Slow GABAergic channel
    GabaB,
}

impl Receptor {
    /// Number of receptor channels
    pub const COUNT: usize = 4;

    /// All channels in r-port order
    pub const ALL: [Receptor; Receptor::COUNT] =
        [Receptor::Ampa, Receptor::Nmda, Receptor::GabaA, Receptor::GabaB];

    /// Zero-based channel index
    pub const fn index(self) -> usize {
        match self {
            Receptor::Ampa => 0,
            Receptor::Nmda => 1,
            Receptor::GabaA => 2,
            Receptor::GabaB => 3,
        }
    }

    /// One-based r-port addressing this channel
    pub const fn rport(self) -> RPort {
        self.index() as RPort + 1
    }

    /// Resolve an r-port against the addressing rule; `None` for anything
    /// outside (0, 4], including the reserved port 0
    pub fn from_rport(rport: RPort) -> Option<Receptor> {
        match rport {
            1 => Some(Receptor::Ampa),
            2 => Some(Receptor::Nmda),
            3 => Some(Receptor::GabaA),
            4 => Some(Receptor::GabaB),
            _ => None,
        }
    }
}

impl fmt::Display for Receptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Receptor::Ampa => "AMPA",
            Receptor::Nmda => "NMDA",
            Receptor::GabaA => "GABA_A",
            Receptor::GabaB => "GABA_B",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rport_round_trip() {
        for receptor in Receptor::ALL {
            assert_eq!(Receptor::from_rport(receptor.rport()), Some(receptor));
        }
    }

    #[test]
    fn test_port_zero_is_reserved() {
        assert_eq!(Receptor::from_rport(0), None);
    }

    #[test]
    fn test_out_of_range_ports() {
        assert_eq!(Receptor::from_rport(5), None);
        assert_eq!(Receptor::from_rport(RPort::MAX), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Receptor::GabaA), "GABA_A");
    }
}
