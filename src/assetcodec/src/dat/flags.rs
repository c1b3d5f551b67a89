//! The six per-version DAT flag tables (spec §4.5, component C5).
//!
//! Each version is represented as a bidirectional map between a
//! one-byte tag and a semantic [`Flag`], rather than six hand-written
//! switch statements, so the 80% of semantics every version shares is
//! expressed once (spec §9 "Flag tables as data"). `0xFF` terminates the
//! flag block in every version.
//!
//! Two observable legacy quirks are preserved verbatim (spec §4.5
//! "Known-legacy quirks to preserve", §9): the V4 writer emits
//! Wrap/Unwrap using the tag numbers V6's table assigns them, and the
//! V5 writer emits HasBones using the tag number V4's table assigns it.
//! Readers always dispatch by the *reading* version's own table; only
//! the writer substitutes the foreign tag.

use std::collections::HashMap;

use super::features::DatVersion;
use crate::error::{AssetError, Result};

/// Table-terminator sentinel, identical across all six versions.
pub const TERMINATOR: u8 = 0xFF;

/// A semantic flag identity, independent of which byte tag represents
/// it in a given version's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    // Mutually exclusive layer selectors; at most one is ever set, and
    // whichever is set is always emitted first (spec §4.5 "Ordering").
    Ground,
    GroundBorder,
    OnBottom,
    OnTop,

    Container,
    Stackable,
    ForceUse,
    MultiUse,
    Writable,
    WritableOnce,
    FluidContainer,
    Splash,
    NotWalkable,
    NotMoveable,
    BlockProjectile,
    Pickupable,
    Hangable,
    Vertical,
    Horizontal,
    Rotatable,
    LightInfo,
    HasOffset,
    Elevation,
    LensHelp,
    MinimapColor,
    DontHide,
    HasCharges,
    Wrap,
    Unwrap,
    HasBones,
    IgnoreLook,
    Cloth,
    Translucent,
    MarketItem,
    NoMoveAnimation,
    DefaultAction,
    TopEffect,
    Usable,
}

/// Canonical tag byte for each flag — the value every version's table
/// uses unless overridden below for V5/V6.
fn canonical_tag(flag: Flag) -> u8 {
    match flag {
        Flag::Ground => 0x00,
        Flag::GroundBorder => 0x01,
        Flag::OnBottom => 0x02,
        Flag::OnTop => 0x03,
        Flag::Container => 0x04,
        Flag::Stackable => 0x05,
        Flag::ForceUse => 0x06,
        Flag::MultiUse => 0x07,
        Flag::Writable => 0x08,
        Flag::WritableOnce => 0x09,
        Flag::FluidContainer => 0x0A,
        Flag::Splash => 0x0B,
        Flag::NotWalkable => 0x0C,
        Flag::NotMoveable => 0x0D,
        Flag::BlockProjectile => 0x0E,
        Flag::Pickupable => 0x0F,
        Flag::Hangable => 0x10,
        Flag::Vertical => 0x11,
        Flag::Horizontal => 0x12,
        Flag::Rotatable => 0x13,
        Flag::LightInfo => 0x14,
        Flag::HasOffset => 0x15,
        Flag::Elevation => 0x16,
        Flag::LensHelp => 0x17,
        Flag::MinimapColor => 0x18,
        Flag::DontHide => 0x19,
        Flag::HasCharges => 0x1A,
        Flag::Wrap => 0x1B,
        Flag::Unwrap => 0x1C,
        Flag::HasBones => 0x1D,
        Flag::IgnoreLook => 0x1E,
        Flag::Cloth => 0x1F,
        Flag::Translucent => 0x20,
        Flag::MarketItem => 0x21,
        Flag::NoMoveAnimation => 0x22,
        Flag::DefaultAction => 0x23,
        Flag::TopEffect => 0x24,
        Flag::Usable => 0x25,
    }
}

/// V6's table assigns Wrap/Unwrap these tags instead of the canonical
/// 0x1B/0x1C. V4's own table would otherwise assign the canonical tags,
/// but the legacy V4 writer actually puts these V6 tag bytes on the wire
/// (spec §4.5 "Known-legacy quirks to preserve"), so V4's *read* table
/// must recognise them too -- the quirk is a non-canonical wire byte,
/// not a read/write asymmetry within one version.
const WRAP_V6_TAG: u8 = 0x30;
const UNWRAP_V6_TAG: u8 = 0x31;

/// Every flag that exists in `version`'s table, in the fixed order the
/// writer emits them (the four layer selectors excepted — the writer
/// emits whichever one is set before anything else, per spec §4.5).
fn flags_in_version(version: DatVersion) -> Vec<Flag> {
    use Flag::*;
    let mut flags = vec![
        Container,
        Stackable,
        ForceUse,
        MultiUse,
        Writable,
    ];
    if version == DatVersion::V1 {
        flags.push(WritableOnce);
    }
    flags.extend([
        FluidContainer,
        Splash,
        NotWalkable,
        NotMoveable,
        BlockProjectile,
        Pickupable,
    ]);
    if version >= DatVersion::V2 {
        flags.extend([Hangable, Vertical, Horizontal]);
    }
    flags.extend([Rotatable, LightInfo, HasOffset, Elevation, LensHelp, MinimapColor]);
    if version >= DatVersion::V4 {
        flags.extend([DontHide, HasCharges, Wrap, Unwrap, HasBones, IgnoreLook]);
    }
    if version >= DatVersion::V5 {
        flags.extend([Cloth, Translucent, MarketItem]);
    }
    if version >= DatVersion::V6 {
        flags.extend([NoMoveAnimation, DefaultAction, TopEffect, Usable]);
    }
    flags
}

/// The layer-selector flags valid for `version`, in write priority order.
fn layer_selectors(version: DatVersion) -> &'static [Flag] {
    use Flag::*;
    if version >= DatVersion::V3 {
        &[Ground, GroundBorder, OnBottom, OnTop]
    } else {
        &[Ground, OnBottom, OnTop]
    }
}

/// The tag byte `version`'s table assigns to `flag`, used for both
/// reading and writing -- whatever byte the writer actually puts on the
/// wire for a version/flag pair is exactly the byte that version's
/// reader must recognise, or the two legacy quirks below would make a
/// version unable to read its own writer's output (spec §8 "DAT
/// round-trip"). The quirks are non-canonical wire bytes, not read/write
/// asymmetry: V4 puts V6's Wrap/Unwrap tags on the wire, and V5 puts
/// V4's (canonical) HasBones tag on the wire, instead of either
/// version's own table-assigned byte.
pub fn read_tag(version: DatVersion, flag: Flag) -> Option<u8> {
    if !(layer_selectors(version).contains(&flag) || flags_in_version(version).contains(&flag)) {
        return None;
    }
    match (version, flag) {
        (DatVersion::V4, Flag::Wrap) | (DatVersion::V6, Flag::Wrap) => Some(WRAP_V6_TAG),
        (DatVersion::V4, Flag::Unwrap) | (DatVersion::V6, Flag::Unwrap) => Some(UNWRAP_V6_TAG),
        (DatVersion::V5, Flag::HasBones) => Some(canonical_tag(Flag::HasBones)),
        _ => Some(canonical_tag(flag)),
    }
}

/// The tag byte `version`'s writer emits for `flag`. Identical to
/// [`read_tag`] -- see its doc comment for why the two must agree.
pub fn write_tag(version: DatVersion, flag: Flag) -> Option<u8> {
    read_tag(version, flag)
}

/// Reverse lookup used by the reader: which flag does `tag` mean in
/// `version`'s table? Built from the same per-version flag list as
/// [`read_tag`], so the two can never drift apart.
pub fn flag_for_tag(version: DatVersion, tag: u8) -> Option<Flag> {
    let mut map = HashMap::new();
    for flag in layer_selectors(version).iter().chain(flags_in_version(version).iter()) {
        if let Some(t) = read_tag(version, *flag) {
            map.insert(t, *flag);
        }
    }
    map.get(&tag).copied()
}

/// All flags recognised by `version`, layer selectors first, in the
/// writer's fixed emission order.
pub fn write_order(version: DatVersion) -> Vec<Flag> {
    let mut order = Vec::new();
    order.extend(layer_selectors(version).iter().copied());
    order.extend(flags_in_version(version));
    order
}

/// Validates that `tag` is recognised in `version`'s table, returning a
/// diagnostic naming the previous tag on failure (spec §4.5 "An unknown
/// tag is a fatal error that reports the previous tag").
pub fn require_known_tag(version: DatVersion, tag: u8, previous_tag: Option<u8>) -> Result<Flag> {
    flag_for_tag(version, tag)
        .ok_or_else(|| AssetError::unknown_tag("dat_flags", tag, previous_tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminator_is_0xff_everywhere() {
        // The sentinel must never collide with a real tag in any table.
        for version in [
            DatVersion::V1,
            DatVersion::V2,
            DatVersion::V3,
            DatVersion::V4,
            DatVersion::V5,
            DatVersion::V6,
        ] {
            assert!(flag_for_tag(version, TERMINATOR).is_none());
        }
    }

    #[test]
    fn v1_has_writable_once_v2_does_not() {
        assert!(read_tag(DatVersion::V1, Flag::WritableOnce).is_some());
        assert!(read_tag(DatVersion::V2, Flag::WritableOnce).is_none());
    }

    #[test]
    fn v4_writer_borrows_v6_wrap_unwrap_tags_and_can_read_them_back() {
        let v4_write_wrap = write_tag(DatVersion::V4, Flag::Wrap).unwrap();
        let v6_read_wrap = read_tag(DatVersion::V6, Flag::Wrap).unwrap();
        assert_eq!(v4_write_wrap, v6_read_wrap);
        // The quirk must not make V4 unable to read its own writer's output.
        assert_eq!(v4_write_wrap, read_tag(DatVersion::V4, Flag::Wrap).unwrap());
        assert_eq!(flag_for_tag(DatVersion::V4, v4_write_wrap), Some(Flag::Wrap));
    }

    #[test]
    fn v5_writer_borrows_v4_has_bones_tag_and_can_read_it_back() {
        let v5_write = write_tag(DatVersion::V5, Flag::HasBones).unwrap();
        let v4_read = read_tag(DatVersion::V4, Flag::HasBones).unwrap();
        assert_eq!(v5_write, v4_read);
        assert_eq!(v5_write, read_tag(DatVersion::V5, Flag::HasBones).unwrap());
        assert_eq!(flag_for_tag(DatVersion::V5, v5_write), Some(Flag::HasBones));
    }

    #[test]
    fn layer_selectors_come_first_in_write_order() {
        let order = write_order(DatVersion::V6);
        assert_eq!(&order[..4], &[Flag::Ground, Flag::GroundBorder, Flag::OnBottom, Flag::OnTop]);
    }

    #[test]
    fn unknown_tag_reports_previous() {
        let err = require_known_tag(DatVersion::V1, 0xAB, Some(0x04)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("0xab"));
        assert!(message.contains("0x04"));
    }
}
