//! Task Watchdog Timer (TWDT) driver.
//!
//! Resets the board if the main loop stops iterating.  The loop never
//! blocks by construction, so a stall here means a hung driver call and a
//! reset is the only way the alarm comes back.
//!
//! The main loop must call [`LoopWatchdog::feed`] once per iteration.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{
    esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure, esp_task_wdt_reset, ESP_OK,
};

/// Stall budget for one loop iteration.
pub const DEFAULT_TIMEOUT_MS: u32 = 10_000;

pub struct LoopWatchdog {
    timeout_ms: u32,
    subscribed: bool,
    feeds: u64,
}

impl LoopWatchdog {
    /// Configure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        let subscribed = Self::subscribe(timeout_ms);
        Self {
            timeout_ms,
            subscribed,
            feeds: 0,
        }
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(timeout_ms: u32) -> bool {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: called once from the main task before the loop starts.
        let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
        if ret != ESP_OK {
            log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
        }
        // SAFETY: a null handle subscribes the current task.
        let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
        if ret == ESP_OK {
            log::info!("Watchdog: subscribed ({} ms timeout, panic on trigger)", timeout_ms);
            true
        } else {
            log::warn!("Watchdog: failed to subscribe ({})", ret);
            false
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(timeout_ms: u32) -> bool {
        log::info!("Watchdog(sim): {} ms timeout, not enforced", timeout_ms);
        false
    }

    /// Reset the countdown.
    pub fn feed(&mut self) {
        self.feeds = self.feeds.wrapping_add(1);
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: the current task is subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Feeds since start-up.
    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}

impl Default for LoopWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}
