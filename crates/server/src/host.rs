use std::{
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Arc, PoisonError,
    },
    time::Duration,
};

use frame_sync::{FrameSync, StatusHooks, StripHandle, TreeBuffers};
use shared::domain::{BranchId, Layout, Rgb};
use smart_leds::hsv::{hsv2rgb, Hsv};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info};

const HUE_STEP_PER_PIXEL: u8 = 4;
const HUE_STEP_PER_TICK: u8 = 3;

/// Stand-in for the firmware sketch: owns the strips and power/brightness,
/// paints a hue sweep, and fires the cadence signal after every repaint.
#[derive(Debug)]
pub(crate) struct DemoHost {
    layout: Layout,
    buffers: TreeBuffers,
    power: AtomicBool,
    brightness: AtomicU8,
}

impl DemoHost {
    pub(crate) fn new(layout: Layout, brightness: u8, power: bool) -> Arc<Self> {
        let buffers = TreeBuffers::allocate(&layout);
        Arc::new(Self {
            layout,
            buffers,
            power: AtomicBool::new(power),
            brightness: AtomicU8::new(brightness),
        })
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn buffers(&self) -> TreeBuffers {
        self.buffers.clone()
    }

    pub(crate) fn power(&self) -> bool {
        self.power.load(Ordering::Relaxed)
    }

    pub(crate) fn brightness(&self) -> u8 {
        self.brightness.load(Ordering::Relaxed)
    }

    pub(crate) fn status_hooks(self: &Arc<Self>) -> StatusHooks {
        let read_power = Arc::clone(self);
        let apply_power = Arc::clone(self);
        let read_brightness = Arc::clone(self);
        let apply_brightness = Arc::clone(self);
        StatusHooks::default()
            .read_power(move || read_power.power())
            .apply_power(move |on| {
                info!(on, "power changed");
                apply_power.power.store(on, Ordering::Relaxed);
            })
            .read_brightness(move || read_brightness.brightness())
            .apply_brightness(move |level| {
                info!(level, "brightness changed");
                apply_brightness.brightness.store(level, Ordering::Relaxed);
            })
    }

    /// Repaints every strip for animation step `tick`. Colors are stored
    /// unscaled; brightness is applied by the LED driver, not the buffer.
    pub(crate) fn render(&self, tick: u32) {
        let on = self.power();
        let base_hue = (tick as u8).wrapping_mul(HUE_STEP_PER_TICK);
        let mut linear = 0usize;
        let mut paint = |strip: &StripHandle| {
            let mut pixels = strip.write().unwrap_or_else(PoisonError::into_inner);
            for pixel in pixels.iter_mut() {
                *pixel = if on {
                    let hue = base_hue.wrapping_add((linear as u8).wrapping_mul(HUE_STEP_PER_PIXEL));
                    hsv2rgb(Hsv {
                        hue,
                        sat: 255,
                        val: 255,
                    })
                } else {
                    Rgb::new(0, 0, 0)
                };
                linear += 1;
            }
        };
        paint(&self.buffers.trunk);
        for branch in BranchId::ALL {
            paint(self.buffers.branch(branch));
        }
    }
}

/// Repaints and pushes a frame on a fixed interval, both under the sync
/// gate. A zero interval disables it.
pub(crate) fn spawn_render_loop(
    host: Arc<DemoHost>,
    sync: Arc<FrameSync>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        info!("render loop disabled");
        return None;
    }
    info!(interval_ms = interval.as_millis() as u64, "render loop started");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick = 0u32;
        loop {
            ticker.tick().await;
            let reached = sync.render_and_push(|| host.render(tick));
            debug!(tick, reached, "frame pushed");
            tick = tick.wrapping_add(1);
        }
    }))
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
