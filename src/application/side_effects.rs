//! Non-fatal side effects.
//!
//! Cache traffic and image cleanup may fail without failing the request that
//! triggered them. Such failures are handed to a [`SideEffectSink`] instead of
//! being dropped, so operators see them in logs and tests can assert on them.

use metrics::counter;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffectFailure {
    CacheRead { key: String, reason: String },
    CacheDecode { key: String, reason: String },
    CacheEncode { key: String, reason: String },
    CacheWrite { key: String, reason: String },
    CacheInvalidate { key: String, reason: String },
    ImageRemoval { image: String, reason: String },
}

impl SideEffectFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CacheRead { .. } => "cache_read",
            Self::CacheDecode { .. } => "cache_decode",
            Self::CacheEncode { .. } => "cache_encode",
            Self::CacheWrite { .. } => "cache_write",
            Self::CacheInvalidate { .. } => "cache_invalidate",
            Self::ImageRemoval { .. } => "image_removal",
        }
    }

    /// Cache key, key prefix or image name the failure concerns.
    pub fn subject(&self) -> &str {
        match self {
            Self::CacheRead { key, .. }
            | Self::CacheDecode { key, .. }
            | Self::CacheEncode { key, .. }
            | Self::CacheWrite { key, .. }
            | Self::CacheInvalidate { key, .. } => key,
            Self::ImageRemoval { image, .. } => image,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::CacheRead { reason, .. }
            | Self::CacheDecode { reason, .. }
            | Self::CacheEncode { reason, .. }
            | Self::CacheWrite { reason, .. }
            | Self::CacheInvalidate { reason, .. }
            | Self::ImageRemoval { reason, .. } => reason,
        }
    }
}

pub trait SideEffectSink: Send + Sync {
    fn report(&self, failure: SideEffectFailure);
}

/// Logs each failure and counts it under `scriptorium_side_effect_failure_total`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SideEffectSink for TracingSink {
    fn report(&self, failure: SideEffectFailure) {
        let kind = failure.kind();
        counter!("scriptorium_side_effect_failure_total", "kind" => kind).increment(1);
        warn!(
            kind,
            subject = failure.subject(),
            reason = failure.reason(),
            "Side effect failed; request continues"
        );
    }
}
