//! Band descriptors and per-band hardware configuration.
//!
//! Descriptors come from the hardware capability report of a module. The
//! [`BandConfigTable`] derives one immutable [`BandConfig`] per band family
//! (AM, FM) at startup and is consulted by band afterwards.

use serde::{Deserialize, Serialize};

use crate::station::Band;

/// Capability descriptor of a band as reported by a hardware module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandDescriptor {
    pub band: Band,
    /// Lowest tunable channel.
    pub lower_limit: u32,
    /// Highest tunable channel.
    pub upper_limit: u32,
    /// Channel spacing.
    pub spacing: u32,
    pub stereo_supported: bool,
}

/// Hardware configuration applied when opening or reconfiguring a tuner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandConfig {
    pub band: Band,
    pub lower_limit: u32,
    pub upper_limit: u32,
    pub spacing: u32,
    pub stereo: bool,
}

impl BandConfig {
    /// Builds a config from a descriptor. Stereo is only enabled when the
    /// hardware supports it.
    #[must_use]
    pub fn from_descriptor(descriptor: &BandDescriptor, stereo: bool) -> Self {
        Self {
            band: descriptor.band,
            lower_limit: descriptor.lower_limit,
            upper_limit: descriptor.upper_limit,
            spacing: descriptor.spacing,
            stereo: stereo && descriptor.stereo_supported,
        }
    }

    /// Returns true if `channel` lies inside the frequency table.
    #[must_use]
    pub fn contains(&self, channel: u32) -> bool {
        (self.lower_limit..=self.upper_limit).contains(&channel)
    }
}

/// Immutable lookup of band configs, derived once from descriptors.
#[derive(Debug, Clone, Default)]
pub struct BandConfigTable {
    am: Option<BandConfig>,
    fm: Option<BandConfig>,
}

impl BandConfigTable {
    /// Derives the table from a module's descriptors.
    ///
    /// The first FM-family and the first AM-family descriptor win; later
    /// descriptors of the same family are ignored.
    #[must_use]
    pub fn from_descriptors(descriptors: &[BandDescriptor], stereo: bool) -> Self {
        let mut table = Self::default();
        for descriptor in descriptors {
            log::debug!("[BandConfigTable] loading band: {:?}", descriptor);
            if table.fm.is_none() && descriptor.band.is_fm() {
                table.fm = Some(BandConfig::from_descriptor(descriptor, stereo));
            }
            if table.am.is_none() && descriptor.band.is_am() {
                table.am = Some(BandConfig::from_descriptor(descriptor, stereo));
            }
        }
        table
    }

    /// Config for a band. AM and AM HD share the AM config, FM and FM HD
    /// share the FM config.
    #[must_use]
    pub fn get(&self, band: Band) -> Option<&BandConfig> {
        match band {
            Band::Am | Band::AmHd => self.am.as_ref(),
            Band::Fm | Band::FmHd => self.fm.as_ref(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.am.is_none() && self.fm.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{am_descriptor, fm_descriptor};

    #[test]
    fn hd_bands_share_family_config() {
        let table = BandConfigTable::from_descriptors(&[fm_descriptor(), am_descriptor()], true);
        assert_eq!(table.get(Band::FmHd), table.get(Band::Fm));
        assert_eq!(table.get(Band::AmHd), table.get(Band::Am));
        assert_eq!(table.get(Band::Fm).unwrap().band, Band::Fm);
        assert_eq!(table.get(Band::Am).unwrap().band, Band::Am);
    }

    #[test]
    fn first_descriptor_of_a_family_wins() {
        let mut second_fm = fm_descriptor();
        second_fm.lower_limit = 76_000;
        let table = BandConfigTable::from_descriptors(&[fm_descriptor(), second_fm], true);
        assert_eq!(table.get(Band::Fm).unwrap().lower_limit, 87_500);
        assert!(table.get(Band::Am).is_none());
    }

    #[test]
    fn stereo_requires_hardware_support() {
        let mut mono = am_descriptor();
        mono.stereo_supported = false;
        let table = BandConfigTable::from_descriptors(&[mono, fm_descriptor()], true);
        assert!(!table.get(Band::Am).unwrap().stereo);
        assert!(table.get(Band::Fm).unwrap().stereo);

        let table = BandConfigTable::from_descriptors(&[fm_descriptor()], false);
        assert!(!table.get(Band::Fm).unwrap().stereo);
    }

    #[test]
    fn empty_descriptors_give_empty_table() {
        assert!(BandConfigTable::from_descriptors(&[], true).is_empty());
    }

    #[test]
    fn contains_checks_frequency_table() {
        let config = BandConfig::from_descriptor(&fm_descriptor(), true);
        assert!(config.contains(87_500));
        assert!(config.contains(108_000));
        assert!(!config.contains(108_100));
    }
}
