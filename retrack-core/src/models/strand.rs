use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::TrackError;

///
/// Strand assignment of a junction or read, `.` when the library layout
/// gives no orientation information.
///
/// The derived ordering (`+` < `-` < `.`) is part of the deterministic
/// output ordering of intron files, where keys sort by start, end, strand.
///
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Clone, Copy)]
pub enum Strand {
    Forward,
    Reverse,
    Unknown,
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
            Strand::Unknown => ".",
        };
        write!(f, "{}", symbol)
    }
}

impl FromStr for Strand {
    type Err = TrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Strand::Forward),
            "-" => Ok(Strand::Reverse),
            "." => Ok(Strand::Unknown),
            _ => Err(TrackError::InvalidStrand(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strand_round_trips_through_symbols() {
        for symbol in ["+", "-", "."] {
            let strand: Strand = symbol.parse().unwrap();
            assert_eq!(strand.to_string(), symbol);
        }
    }

    #[test]
    fn strand_rejects_garbage() {
        assert!("fwd".parse::<Strand>().is_err());
        assert!("".parse::<Strand>().is_err());
    }

    #[test]
    fn strand_orders_forward_reverse_unknown() {
        assert!(Strand::Forward < Strand::Reverse);
        assert!(Strand::Reverse < Strand::Unknown);
    }
}
