//! Tracking codes and observation code identifiers
use std::str::FromStr;

use crate::prelude::{Constellation, Error, SV};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical observable a residual column refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Observable {
    /// Code (pseudo range) residuals
    PseudoRange,
    /// Carrier phase residuals
    Phase,
    Doppler,
    SignalStrength,
}

impl Observable {
    /// RINEX observable letter
    pub fn letter(&self) -> char {
        match self {
            Self::PseudoRange => 'C',
            Self::Phase => 'L',
            Self::Doppler => 'D',
            Self::SignalStrength => 'S',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c {
            'C' => Some(Self::PseudoRange),
            'L' => Some(Self::Phase),
            'D' => Some(Self::Doppler),
            'S' => Some(Self::SignalStrength),
            _ => None,
        }
    }

    fn index(&self) -> u32 {
        match self {
            Self::PseudoRange => 1,
            Self::Phase => 2,
            Self::Doppler => 3,
            Self::SignalStrength => 4,
        }
    }
}

impl std::fmt::Display for Observable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PseudoRange => write!(f, "pseudo-range"),
            Self::Phase => write!(f, "phase"),
            Self::Doppler => write!(f, "doppler"),
            Self::SignalStrength => write!(f, "ssi"),
        }
    }
}

impl FromStr for Observable {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "c" | "pr" | "pseudo-range" | "code" => Ok(Self::PseudoRange),
            "l" | "cp" | "phase" => Ok(Self::Phase),
            "d" | "dop" | "doppler" => Ok(Self::Doppler),
            "s" | "ssi" | "snr" => Ok(Self::SignalStrength),
            _ => Err(Error::UnknownObservable(s.to_string())),
        }
    }
}

/// [TrackingCode] describes one tracked signal, in the 4 character
/// `<system><observable><band><attribute>` format, for example "GL1C".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrackingCode {
    /// [Constellation] letter
    pub constellation: Constellation,
    /// [Observable]
    pub observable: Observable,
    /// Frequency band digit
    pub band: u8,
    /// Tracking attribute
    pub attribute: char,
}

impl TrackingCode {
    /// Frequency band digit, like '1' for L1
    pub fn frequency(&self) -> char {
        (b'0' + self.band) as char
    }

    pub fn is_phase(&self) -> bool {
        self.observable == Observable::Phase
    }

    pub fn is_pseudo_range(&self) -> bool {
        self.observable == Observable::PseudoRange
    }
}

impl std::fmt::Display for TrackingCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:x}{}{}{}",
            self.constellation,
            self.observable.letter(),
            self.band,
            self.attribute
        )
    }
}

impl FromStr for TrackingCode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let chars = trimmed.chars().collect::<Vec<_>>();

        if chars.len() != 4 {
            return Err(Error::InvalidTrackingCode(s.to_string()));
        }

        let constellation = Constellation::from_str(&chars[0].to_string())
            .map_err(|_| Error::InvalidTrackingCode(s.to_string()))?;

        let observable =
            Observable::from_letter(chars[1]).ok_or(Error::InvalidTrackingCode(s.to_string()))?;

        let band = chars[2]
            .to_digit(10)
            .filter(|band| *band > 0)
            .ok_or(Error::InvalidTrackingCode(s.to_string()))? as u8;

        let attribute = chars[3];
        if !attribute.is_ascii_uppercase() {
            return Err(Error::InvalidTrackingCode(s.to_string()));
        }

        Ok(Self {
            constellation,
            observable,
            band,
            attribute,
        })
    }
}

/// Unrecognized observation code
pub const INVALID_CODE_ID: u32 = 0;

/// [CodeDecoder] turns a (tracking code, satellite) pair into a numeric identifier.
/// Two columns describe the same signal if and only if they share the same identifier.
/// [INVALID_CODE_ID] is returned for unrecognized codes.
pub trait CodeDecoder {
    fn decode(&self, code: &str, sv: SV) -> u32;
}

/// [CodeDecoder] following the RINEX observation code definitions.
/// Only pseudo range and phase codes, on bands the constellation
/// actually transmits, are recognized.
#[derive(Debug, Default, Clone, Copy)]
pub struct RinexCodeDecoder {}

fn constellation_index(constellation: Constellation) -> Option<u32> {
    match constellation {
        Constellation::GPS => Some(1),
        Constellation::Glonass => Some(2),
        Constellation::Galileo => Some(3),
        Constellation::BeiDou => Some(4),
        Constellation::QZSS => Some(5),
        Constellation::IRNSS => Some(6),
        c if c.is_sbas() => Some(7),
        _ => None,
    }
}

fn transmitted_bands(constellation: Constellation) -> &'static [u8] {
    match constellation {
        Constellation::GPS => &[1, 2, 5],
        Constellation::Glonass => &[1, 2, 3, 4, 6],
        Constellation::Galileo => &[1, 5, 6, 7, 8],
        Constellation::BeiDou => &[1, 2, 5, 6, 7, 8],
        Constellation::QZSS => &[1, 2, 5, 6],
        Constellation::IRNSS => &[1, 5, 9],
        c if c.is_sbas() => &[1, 5],
        _ => &[],
    }
}

fn same_system(lhs: Constellation, rhs: Constellation) -> bool {
    lhs == rhs || (lhs.is_sbas() && rhs.is_sbas())
}

impl RinexCodeDecoder {
    fn identify(code: &TrackingCode, sv: SV) -> Option<u32> {
        if !same_system(code.constellation, sv.constellation) {
            return None;
        }

        if !matches!(code.observable, Observable::PseudoRange | Observable::Phase) {
            return None;
        }

        if !transmitted_bands(code.constellation).contains(&code.band) {
            return None;
        }

        let system = constellation_index(code.constellation)?;

        Some(
            (system << 24)
                | (code.observable.index() << 20)
                | ((code.band as u32) << 16)
                | ((code.attribute as u32) << 8)
                | sv.prn as u32,
        )
    }
}

impl CodeDecoder for RinexCodeDecoder {
    fn decode(&self, code: &str, sv: SV) -> u32 {
        code.parse::<TrackingCode>()
            .ok()
            .and_then(|code| Self::identify(&code, sv))
            .unwrap_or(INVALID_CODE_ID)
    }
}

/// Identifier shared by all satellites tracking the same signal
pub(crate) fn group_id(id: u32) -> u32 {
    id & !0xff
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn tracking_code_parsing() {
        for (desc, constellation, observable, band, attribute) in [
            ("GL1C", Constellation::GPS, Observable::Phase, 1, 'C'),
            ("GC1C", Constellation::GPS, Observable::PseudoRange, 1, 'C'),
            ("EC5Q", Constellation::Galileo, Observable::PseudoRange, 5, 'Q'),
            ("RL2P", Constellation::Glonass, Observable::Phase, 2, 'P'),
            ("CL7I", Constellation::BeiDou, Observable::Phase, 7, 'I'),
        ] {
            let code = TrackingCode::from_str(desc).unwrap();
            assert_eq!(code.constellation, constellation);
            assert_eq!(code.observable, observable);
            assert_eq!(code.band, band);
            assert_eq!(code.attribute, attribute);
            assert_eq!(code.to_string(), desc);
        }

        for invalid in ["", "GL1", "GX1C", "GL0C", "GL1c", "ZL1C", "GL1CX"] {
            assert!(
                TrackingCode::from_str(invalid).is_err(),
                "\"{}\" should not parse",
                invalid
            );
        }
    }

    #[test]
    fn rinex_decoder() {
        let decoder = RinexCodeDecoder::default();
        let g01 = SV::from_str("G01").unwrap();
        let g02 = SV::from_str("G02").unwrap();
        let e01 = SV::from_str("E01").unwrap();

        let l1c_g01 = decoder.decode("GL1C", g01);
        let l1c_g02 = decoder.decode("GL1C", g02);
        let c1c_g01 = decoder.decode("GC1C", g01);

        assert_ne!(l1c_g01, INVALID_CODE_ID);
        assert_ne!(l1c_g01, l1c_g02);
        assert_ne!(l1c_g01, c1c_g01);
        assert_eq!(group_id(l1c_g01), group_id(l1c_g02));
        assert_ne!(group_id(l1c_g01), group_id(c1c_g01));

        // system mismatch
        assert_eq!(decoder.decode("GL1C", e01), INVALID_CODE_ID);
        // not transmitted
        assert_eq!(decoder.decode("GL7Q", g01), INVALID_CODE_ID);
        // not a range
        assert_eq!(decoder.decode("GS1C", g01), INVALID_CODE_ID);
        // garbage
        assert_eq!(decoder.decode("hello", g01), INVALID_CODE_ID);
    }
}
