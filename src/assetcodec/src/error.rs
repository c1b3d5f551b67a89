//! Error taxonomy for the codec core.
//!
//! Five kinds of failure are distinguished, per the component's error
//! handling design: format errors from malformed wire data, state errors
//! from calling the session in the wrong state, not-found errors for a
//! missing DAT/SPR pair, host errors surfaced verbatim from the host
//! capability interface, and resource errors from touching a disposed
//! accessor or a terminated worker pool.

use std::fmt;

/// Top-level error type returned by every fallible operation in this crate.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("malformed {component}: {detail}")]
    Format {
        component: &'static str,
        detail: String,
    },

    #[error("invalid session state: {0}")]
    State(&'static str),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("host error: {0}")]
    Host(String),

    #[error("resource error: {0}")]
    Resource(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssetError {
    pub fn format(component: &'static str, detail: impl Into<String>) -> Self {
        AssetError::Format {
            component,
            detail: detail.into(),
        }
    }

    /// Format error carrying the previously-seen tag byte, for diagnosing
    /// an unknown flag tag during DAT/OBD property decoding (spec §4.5/§4.7).
    pub fn unknown_tag(component: &'static str, tag: u8, previous_tag: Option<u8>) -> Self {
        AssetError::Format {
            component,
            detail: format!(
                "unknown tag 0x{tag:02x} (previous tag: {})",
                OptTag(previous_tag)
            ),
        }
    }
}

struct OptTag(Option<u8>);

impl fmt::Display for OptTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(t) => write!(f, "0x{t:02x}"),
            None => write!(f, "none"),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssetError>;
