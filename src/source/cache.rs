//! Time-boxed cache around another source

use super::{SourceResult, TicketSource};
use crate::record::RawRow;
use std::time::{Duration, Instant};
use tracing::debug;

/// One hour, the refresh window of the ticket dashboards
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Reuses the last successful load until it is older than the TTL
///
/// Failed loads are not cached; the next call tries the inner source again.
#[derive(Debug)]
pub struct CachedSource<S> {
    inner: S,
    ttl: Duration,
    cached: Option<(Instant, Vec<RawRow>)>,
}

impl<S: TicketSource> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: None,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached rows so the next load hits the inner source
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    pub fn is_fresh(&self) -> bool {
        self.cached
            .as_ref()
            .map_or(false, |(loaded_at, _)| loaded_at.elapsed() < self.ttl)
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TicketSource> TicketSource for CachedSource<S> {
    fn load(&mut self) -> SourceResult<Vec<RawRow>> {
        if self.is_fresh() {
            if let Some((_, rows)) = &self.cached {
                debug!("Cache hit for {}", self.inner.describe());
                return Ok(rows.clone());
            }
        }

        let rows = self.inner.load()?;
        self.cached = Some((Instant::now(), rows.clone()));
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("{} (cached {}s)", self.inner.describe(), self.ttl.as_secs())
    }
}
