//! One wake cycle of the display
//!
//! Every time the device wakes it runs the same straight line of steps:
//! load the persisted window, reconcile it against the clock, fetch the days
//! that are due, persist, and lay out the chart. [`WakeCycle`] owns the
//! collaborators for those steps; sleeping in between is up to the caller.

use embedded_graphics::prelude::Size;
use log::{debug, error, info, warn};

use crate::chart::{ChartError, ChartSeries, RenderPlan, unavailable_notice};
use crate::prices::{PriceWindow, ReconcileResult, SlotSet};
use crate::source::{HttpClient, PriceSource};
use crate::storage::{KeyValueStore, load_window, save_window};
use crate::time::Timestamp;

/// What [`WakeCycle::refresh`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub reconcile: ReconcileResult,
    /// Slots filled by this cycle's fetches
    pub fetched: SlotSet,
    /// Whether the window reached storage at least once
    pub persisted: bool,
}

pub struct WakeCycle<'a, K: KeyValueStore, C: HttpClient> {
    storage: K,
    source: PriceSource<'a, C>,
    canvas: Size,
}

impl<'a, K: KeyValueStore, C: HttpClient> WakeCycle<'a, K, C> {
    pub fn new(storage: K, source: PriceSource<'a, C>, canvas: Size) -> Self {
        Self {
            storage,
            source,
            canvas,
        }
    }

    pub fn storage_mut(&mut self) -> &mut K {
        &mut self.storage
    }

    pub fn source_mut(&mut self) -> &mut PriceSource<'a, C> {
        &mut self.source
    }

    /// Read the window left by the previous cycle
    pub fn load(&mut self, now: Timestamp) -> PriceWindow {
        load_window(&mut self.storage, now)
    }

    /// Bring `window` up to date for `now`
    ///
    /// Due days are fetched one after another. The window is persisted after
    /// each successful merge, so a later failure keeps the earlier progress.
    /// A failed fetch leaves its slot unavailable until the next cycle.
    pub fn refresh(&mut self, window: &mut PriceWindow, now: Timestamp) -> CycleReport {
        let reconcile = window.reconcile(now);
        let mut fetched = SlotSet::empty();
        let mut persisted = false;

        if !reconcile.needs_fetch {
            debug!("Price window is current");
            return CycleReport {
                reconcile,
                fetched,
                persisted,
            };
        }

        for slot in reconcile.due().iter() {
            let day = window.bucket(slot).day();
            info!("Fetching {} prices ({})", slot, day);
            let bucket = self.source.fetch_day(day);
            if !window.merge_fetched(slot, bucket) {
                continue;
            }
            fetched.insert(slot);

            match save_window(&mut self.storage, window) {
                Ok(()) => persisted = true,
                Err(e) => warn!("Price window not persisted: {}", e),
            }
        }

        info!(
            "Fetched {} of {} due days",
            fetched.len(),
            reconcile.due().len()
        );
        CycleReport {
            reconcile,
            fetched,
            persisted,
        }
    }

    /// Lay out the chart with its header
    pub fn render(
        &self,
        window: &PriceWindow,
        now: Timestamp,
        battery_volts: Option<f32>,
    ) -> Result<RenderPlan, ChartError> {
        let series = ChartSeries::from_window(window, now)?;
        let mut plan = series.layout(self.canvas)?;
        plan.push_header(now, battery_volts);
        Ok(plan)
    }

    /// Like [`render`](Self::render), showing the unavailable notice on error
    pub fn render_or_notice(
        &self,
        window: &PriceWindow,
        now: Timestamp,
        battery_volts: Option<f32>,
    ) -> RenderPlan {
        match self.render(window, now, battery_volts) {
            Ok(plan) => plan,
            Err(e) => {
                error!("Cannot draw price chart: {}", e);
                unavailable_notice(self.canvas, now, &e)
            }
        }
    }
}
