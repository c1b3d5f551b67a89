//! Caller-supplied animation-duration defaults (spec §4.6 point 3, §9
//! "OBD version 1 duration policy").
//!
//! Neither the DAT nor the OBD wire format stores a `frameDurations` pair
//! for a multi-frame group once the *improvedAnimations* feature is off
//! (DAT) or for any OBD V1 file (which never carries improved animations
//! at all). A reader must still produce a `(minDuration, maxDuration)`
//! pair per frame, and spec §9 is explicit that the historical
//! per-category numbers are "external configuration", not something this
//! crate may hard-code into the codec itself. So every read path that can
//! hit this case takes a `&dyn DurationPolicy` from its caller.

use super::thing::ThingCategory;

/// Supplies a default `(minDuration, maxDuration)` pair, in milliseconds,
/// for a category whose frame group has no explicit duration data on the
/// wire.
pub trait DurationPolicy {
    fn default_duration(&self, category: ThingCategory) -> (u32, u32);
}

/// The durations the original client shipped with, before any title
/// exposed per-item duration configuration: Items 500ms, Outfits 300ms,
/// Effects 100ms, Missiles 75ms. A convenience implementation, not a
/// built-in default -- nothing in this crate selects it automatically.
pub struct HistoricalDurationPolicy;

impl DurationPolicy for HistoricalDurationPolicy {
    fn default_duration(&self, category: ThingCategory) -> (u32, u32) {
        let ms = match category {
            ThingCategory::Item => 500,
            ThingCategory::Outfit => 300,
            ThingCategory::Effect => 100,
            ThingCategory::Missile => 75,
        };
        (ms, ms)
    }
}
