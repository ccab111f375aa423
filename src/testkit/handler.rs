//! Instrumented scan handler.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::application::scheduler::{ScanContext, ScanHandler, ScanReport};
use crate::domain::{Category, TokenAddress};
use crate::error::{Error, Result};

/// Counts scans and flags any overlap of two runs for the same token.
#[derive(Default)]
pub struct CountingHandler {
    calls: AtomicU32,
    overlaps: AtomicU32,
    running: Mutex<HashSet<TokenAddress>>,
    seen: Mutex<Vec<(TokenAddress, Category)>>,
    delay: Option<Duration>,
    fail: AtomicBool,
    panic: AtomicBool,
}

impl CountingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold each scan for `delay` (honours cancellation).
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make subsequent scans fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent scans panic.
    pub fn set_panicking(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Times a scan started while another for the same token was running.
    pub fn overlaps(&self) -> u32 {
        self.overlaps.load(Ordering::SeqCst)
    }

    /// `(address, category)` of every scan, in start order.
    pub fn seen(&self) -> Vec<(TokenAddress, Category)> {
        self.seen.lock().clone()
    }
}

/// Removes the token from the running set when the scan ends, panics
/// included.
struct Running<'a> {
    set: &'a Mutex<HashSet<TokenAddress>>,
    address: TokenAddress,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.address);
    }
}

#[async_trait]
impl ScanHandler for CountingHandler {
    async fn scan(&self, ctx: ScanContext) -> Result<ScanReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push((ctx.address.clone(), ctx.category));
        if !self.running.lock().insert(ctx.address.clone()) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let _running = Running {
            set: &self.running,
            address: ctx.address.clone(),
        };

        if let Some(delay) = self.delay {
            tokio::select! {
                () = ctx.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
        }
        if self.panic.load(Ordering::SeqCst) {
            panic!("scripted handler panic");
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Scan("scripted failure".into()));
        }
        Ok(ScanReport::default())
    }
}
