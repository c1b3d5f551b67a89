//! Client version handling: the six DAT wire versions and the feature
//! tuple that further modulates the wire format within a version
//! (spec §3 "Client features", §4.8, GLOSSARY).

use bitflags::bitflags;

/// One of the six DAT wire versions, selected purely by client-version
/// thresholds (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DatVersion {
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
}

impl DatVersion {
    /// `<740 → V1, <755 → V2, <780 → V3, <860 → V4, <1010 → V5, else V6`.
    pub fn from_client_version(client_version: u16) -> DatVersion {
        if client_version < 740 {
            DatVersion::V1
        } else if client_version < 755 {
            DatVersion::V2
        } else if client_version < 780 {
            DatVersion::V3
        } else if client_version < 860 {
            DatVersion::V4
        } else if client_version < 1010 {
            DatVersion::V5
        } else {
            DatVersion::V6
        }
    }

    /// True from version 755 onward, the point at which the texture
    /// pattern block gains the `patternZ` byte (spec §4.6).
    pub fn has_pattern_z(self, client_version: u16) -> bool {
        client_version >= 755
    }
}

bitflags! {
    /// A tuple of wire-format-altering switches, independent of the DAT
    /// version proper (spec §3 "Client features").
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ClientFeatures: u8 {
        /// Sprite ids widen from 16-bit to 32-bit inside `spriteIndex`,
        /// and the SPR sprite count widens to 32-bit.
        const EXTENDED = 0b0001;
        /// Sprite RLE pixels carry an explicit alpha byte per coloured
        /// pixel.
        const TRANSPARENCY = 0b0010;
        /// The frame group emits the animation descriptor explicitly
        /// instead of the reader synthesising durations.
        const IMPROVED_ANIMATIONS = 0b0100;
        /// Outfits emit a group-count byte and one group-tag byte per
        /// group, allowing a second (Walking) frame group.
        const FRAME_GROUPS = 0b1000;
    }
}

impl ClientFeatures {
    /// ORs in the feature flags implied by `client_version`'s
    /// thresholds: 960 → extended, 1050 → improved animations, 1057 →
    /// frame groups (spec §4.8, GLOSSARY). `transparency` has no
    /// implied default — it does not correspond to a DAT version
    /// threshold in spec.md and must be set explicitly by the caller.
    pub fn apply_version_defaults(self, client_version: u16) -> ClientFeatures {
        let mut features = self;
        if client_version >= 960 {
            features |= ClientFeatures::EXTENDED;
        }
        if client_version >= 1050 {
            features |= ClientFeatures::IMPROVED_ANIMATIONS;
        }
        if client_version >= 1057 {
            features |= ClientFeatures::FRAME_GROUPS;
        }
        features
    }
}

impl Default for ClientFeatures {
    fn default() -> Self {
        ClientFeatures::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_thresholds_match_spec_table() {
        assert_eq!(DatVersion::from_client_version(739), DatVersion::V1);
        assert_eq!(DatVersion::from_client_version(740), DatVersion::V2);
        assert_eq!(DatVersion::from_client_version(754), DatVersion::V2);
        assert_eq!(DatVersion::from_client_version(755), DatVersion::V3);
        assert_eq!(DatVersion::from_client_version(779), DatVersion::V3);
        assert_eq!(DatVersion::from_client_version(780), DatVersion::V4);
        assert_eq!(DatVersion::from_client_version(859), DatVersion::V4);
        assert_eq!(DatVersion::from_client_version(860), DatVersion::V5);
        assert_eq!(DatVersion::from_client_version(1009), DatVersion::V5);
        assert_eq!(DatVersion::from_client_version(1010), DatVersion::V6);
    }

    #[test]
    fn feature_defaults_follow_thresholds() {
        let features = ClientFeatures::empty().apply_version_defaults(1056);
        assert!(!features.contains(ClientFeatures::FRAME_GROUPS));
        assert!(features.contains(ClientFeatures::IMPROVED_ANIMATIONS));

        let features = ClientFeatures::empty().apply_version_defaults(1057);
        assert!(features.contains(ClientFeatures::FRAME_GROUPS));
    }
}
