//! The SPR sprite sheet format (spec §4.3-§4.4, component C4).

pub mod accessor;
pub mod writer;

pub use accessor::SprAccessor;
pub use writer::{write_spr, MAX_CLASSIC_SPRITE_COUNT};
