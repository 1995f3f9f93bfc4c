//! Station identity and metadata types.
//!
//! [`StationIdentity`] is the cache key for presets and pre-scanned stations.
//! [`StationMetadata`] is transient RDS information attached to the currently
//! tuned station and is never part of identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Radio frequency range / modulation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    Am,
    Fm,
    AmHd,
    FmHd,
}

impl Band {
    /// Returns true for AM and AM HD.
    #[must_use]
    pub fn is_am(self) -> bool {
        matches!(self, Band::Am | Band::AmHd)
    }

    /// Returns true for FM and FM HD.
    #[must_use]
    pub fn is_fm(self) -> bool {
        matches!(self, Band::Fm | Band::FmHd)
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Am => "AM",
            Band::Fm => "FM",
            Band::AmHd => "AM_HD",
            Band::FmHd => "FM_HD",
        };
        f.write_str(name)
    }
}

/// Immutable identity of a station: channel (Hz for FM, kHz for AM as the
/// hardware reports it), sub-channel and band.
///
/// Equality and ordering are structural on all three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationIdentity {
    channel: u32,
    sub_channel: u32,
    band: Band,
}

impl StationIdentity {
    #[must_use]
    pub fn new(channel: u32, sub_channel: u32, band: Band) -> Self {
        Self {
            channel,
            sub_channel,
            band,
        }
    }

    /// Identity for the main program of a channel (sub-channel 0).
    #[must_use]
    pub fn main(channel: u32, band: Band) -> Self {
        Self::new(channel, 0, band)
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub fn sub_channel(&self) -> u32 {
        self.sub_channel
    }

    pub fn band(&self) -> Band {
        self.band
    }
}

impl fmt::Display for StationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.band, self.channel)?;
        if self.sub_channel != 0 {
            write!(f, "-{}", self.sub_channel)?;
        }
        Ok(())
    }
}

/// RDS metadata for the currently tuned station.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationMetadata {
    /// RDS program service name (PS).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl StationMetadata {
    /// Metadata carrying only a program service name.
    pub fn program_service(name: impl Into<String>) -> Self {
        Self {
            program_service: Some(name.into()),
            ..Self::default()
        }
    }

    /// True when every field is missing or empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        fn blank(value: &Option<String>) -> bool {
            value.as_deref().map_or(true, str::is_empty)
        }
        blank(&self.program_service) && blank(&self.artist) && blank(&self.title)
    }

    /// Returns `None` for empty metadata, so listeners never see a blank record.
    #[must_use]
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

/// A station identity with optional metadata, as stored and reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub identity: StationIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<StationMetadata>,
}

impl Station {
    pub fn new(identity: StationIdentity, metadata: Option<StationMetadata>) -> Self {
        Self { identity, metadata }
    }

    /// A station without metadata.
    pub fn bare(identity: StationIdentity) -> Self {
        Self::new(identity, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_equality_is_structural() {
        let a = StationIdentity::new(98_700, 0, Band::Fm);
        assert_eq!(a, StationIdentity::main(98_700, Band::Fm));
        assert_ne!(a, StationIdentity::new(98_700, 1, Band::Fm));
        assert_ne!(a, StationIdentity::new(98_700, 0, Band::FmHd));
        assert_ne!(a, StationIdentity::new(88_100, 0, Band::Fm));
    }

    #[test]
    fn identity_orders_by_channel_first() {
        let mut ids = vec![
            StationIdentity::main(98_700, Band::Fm),
            StationIdentity::main(88_100, Band::Fm),
            StationIdentity::new(88_100, 2, Band::Fm),
        ];
        ids.sort();
        assert_eq!(ids[0], StationIdentity::main(88_100, Band::Fm));
        assert_eq!(ids[1], StationIdentity::new(88_100, 2, Band::Fm));
        assert_eq!(ids[2], StationIdentity::main(98_700, Band::Fm));
    }

    #[test]
    fn band_families() {
        assert!(Band::Am.is_am() && Band::AmHd.is_am());
        assert!(Band::Fm.is_fm() && Band::FmHd.is_fm());
        assert!(!Band::Fm.is_am());
    }

    #[test]
    fn blank_metadata_collapses_to_none() {
        let blank = StationMetadata {
            program_service: Some(String::new()),
            artist: None,
            title: None,
        };
        assert!(blank.is_empty());
        assert_eq!(blank.non_empty(), None);

        let named = StationMetadata::program_service("KQED");
        assert_eq!(named.clone().non_empty(), Some(named));
    }

    #[test]
    fn identity_serializes_camel_case() {
        let json = serde_json::to_value(StationIdentity::new(88_100, 1, Band::FmHd)).unwrap();
        assert_eq!(json["channel"], 88_100);
        assert_eq!(json["subChannel"], 1);
        assert_eq!(json["band"], "FM_HD");
    }

    #[test]
    fn display_includes_sub_channel_only_when_set() {
        assert_eq!(StationIdentity::main(1_010, Band::Am).to_string(), "AM 1010");
        assert_eq!(StationIdentity::new(88_500, 2, Band::FmHd).to_string(), "FM_HD 88500-2");
    }
}
