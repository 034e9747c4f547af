//! Coalesced redraw requests.
//!
//! Gesture handling and state changes only *request* redraws. The host calls
//! [`RenderTriggerBus::flush`] once the current event has been handled,
//! which dispatches every pending view exactly once.

use std::collections::BTreeSet;

/// Receiver of coalesced redraw batches.
pub trait RenderSink {
    fn render(&mut self, view_ids: &[String]);
}

impl<F: FnMut(&[String])> RenderSink for F {
    fn render(&mut self, view_ids: &[String]) {
        self(view_ids)
    }
}

/// Pending redraw requests for the current tick.
#[derive(Debug, Default)]
pub struct RenderTriggerBus {
    pending: BTreeSet<String>,
    tick: u64,
}

impl RenderTriggerBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark views as needing a redraw. Repeated requests within one tick
    /// collapse into one.
    pub fn request<I, S>(&mut self, view_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending.extend(view_ids.into_iter().map(Into::into));
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, view_id: &str) -> bool {
        self.pending.contains(view_id)
    }

    /// Number of completed flushes.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Take the pending set, ending the tick.
    pub fn take_pending(&mut self) -> Vec<String> {
        self.tick += 1;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Dispatch pending views to `sink`. Returns how many views were sent.
    pub fn flush(&mut self, sink: &mut dyn RenderSink) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let views = self.take_pending();
        log::trace!("Redrawing {} view(s)", views.len());
        sink.render(&views);
        views.len()
    }
}
