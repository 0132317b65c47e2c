//! LEDC adapters — implementations of [`PwmPort`].
//!
//! | Adapter   | Target  | Backing                                   |
//! |-----------|---------|-------------------------------------------|
//! | `EspLedc` | espidf  | raw `ledc_*` calls from ESP-IDF           |
//! | `SimLedc` | any     | in-memory duty table, fades finish on demand |

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;

use crate::app::ports::{ChannelConfig, PwmPort, TimerConfig};
use crate::bridge::FadeBinding;
use crate::config::MAX_CHANNELS;
use crate::error::HwError;
use crate::led::ChannelId;

#[cfg(target_os = "espidf")]
pub use esp::EspLedc;

// ── ESP-IDF LEDC ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod esp {
    use core::ffi::c_void;

    use esp_idf_svc::sys::*;
    use log::info;

    use super::{ChannelConfig, ChannelId, FadeBinding, HwError, PwmPort, TimerConfig};

    /// Low-speed LEDC group driven through the ESP-IDF C API.
    ///
    /// The `ledc_*` functions take their own spinlocks, so the adapter is
    /// stateless and can be shared freely between tasks.
    pub struct EspLedc {
        speed_mode: ledc_mode_t,
    }

    impl Default for EspLedc {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EspLedc {
        pub fn new() -> Self {
            Self {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
            }
        }
    }

    /// Fade-end trampoline registered with `ledc_cb_register`.
    ///
    /// Runs in interrupt context.  Forwards to the bridge and nothing else.
    unsafe extern "C" fn fade_end_isr(param: *const ledc_cb_param_t, user_arg: *mut c_void) -> bool {
        if param.is_null() || user_arg.is_null() {
            return false;
        }
        // SAFETY: `param` is provided by the LEDC ISR for the duration of
        // this call.
        let event = unsafe { (*param).event };
        if event != ledc_cb_event_t_LEDC_FADE_END_EVT {
            return false;
        }
        // SAFETY: `user_arg` is the leaked `FadeBinding` registered in
        // `register_fade_callback`; it is never freed.
        let binding = unsafe { &*user_arg.cast::<FadeBinding>() };
        binding.on_fade_end();
        false
    }

    impl PwmPort for EspLedc {
        fn configure_timer(&self, timer: &TimerConfig) -> Result<(), HwError> {
            let cfg = ledc_timer_config_t {
                speed_mode: self.speed_mode,
                timer_num: ledc_timer_t::from(timer.timer_id),
                duty_resolution: ledc_timer_bit_t::from(timer.resolution_bits),
                freq_hz: timer.frequency_hz,
                clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
                ..Default::default()
            };
            // SAFETY: `cfg` is a fully initialised config living across the call.
            esp!(unsafe { ledc_timer_config(&cfg) })?;
            Ok(())
        }

        fn install_fade_service(&self) -> Result<(), HwError> {
            // SAFETY: plain FFI call; installing twice is reported, not UB.
            let ret = unsafe { ledc_fade_func_install(0) };
            if ret == ESP_ERR_INVALID_STATE as i32 {
                info!("ledc: fade service already installed");
                return Ok(());
            }
            esp!(ret)?;
            Ok(())
        }

        fn configure_channel(&self, channel: &ChannelConfig) -> Result<(), HwError> {
            let cfg = ledc_channel_config_t {
                gpio_num: channel.gpio,
                speed_mode: self.speed_mode,
                channel: ledc_channel_t::from(channel.channel.raw()),
                intr_type: ledc_intr_type_t_LEDC_INTR_DISABLE,
                timer_sel: ledc_timer_t::from(channel.timer_id),
                duty: channel.initial_duty,
                hpoint: 0,
                ..Default::default()
            };
            // SAFETY: `cfg` is a fully initialised config living across the call.
            esp!(unsafe { ledc_channel_config(&cfg) })?;
            Ok(())
        }

        fn set_duty(&self, channel: ChannelId, duty: u32) -> Result<(), HwError> {
            // SAFETY: channel was configured by `configure_channel`.
            esp!(unsafe { ledc_set_duty(self.speed_mode, ledc_channel_t::from(channel.raw()), duty) })?;
            Ok(())
        }

        fn update_duty(&self, channel: ChannelId) -> Result<(), HwError> {
            // SAFETY: channel was configured by `configure_channel`.
            esp!(unsafe { ledc_update_duty(self.speed_mode, ledc_channel_t::from(channel.raw())) })?;
            Ok(())
        }

        fn start_fade(
            &self,
            channel: ChannelId,
            target_duty: u32,
            duration_ms: u32,
        ) -> Result<(), HwError> {
            let ch = ledc_channel_t::from(channel.raw());
            let duration = i32::try_from(duration_ms).unwrap_or(i32::MAX);
            // SAFETY: channel was configured and the fade service installed
            // before any LED can reach the worker.
            unsafe {
                esp!(ledc_set_fade_with_time(self.speed_mode, ch, target_duty, duration))?;
                esp!(ledc_fade_start(self.speed_mode, ch, ledc_fade_mode_t_LEDC_FADE_NO_WAIT))?;
            }
            Ok(())
        }

        fn stop(&self, channel: ChannelId) -> Result<(), HwError> {
            // SAFETY: channel was configured by `configure_channel`.
            esp!(unsafe { ledc_stop(self.speed_mode, ledc_channel_t::from(channel.raw()), 0) })?;
            Ok(())
        }

        fn register_fade_callback(
            &self,
            channel: ChannelId,
            binding: FadeBinding,
        ) -> Result<(), HwError> {
            // One leaked binding per channel, bounded by the channel count.
            let arg: *mut FadeBinding = Box::leak(Box::new(binding));
            let mut cbs = ledc_cbs_t {
                fade_cb: Some(fade_end_isr),
            };
            // SAFETY: `arg` is 'static; `cbs` is copied by the driver.
            esp!(unsafe {
                ledc_cb_register(
                    self.speed_mode,
                    ledc_channel_t::from(channel.raw()),
                    &mut cbs,
                    arg.cast(),
                )
            })?;
            Ok(())
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

#[derive(Default)]
struct SimState {
    timer_configs: u32,
    fade_service: bool,
    gpio: [Option<i32>; MAX_CHANNELS],
    duty: [u32; MAX_CHANNELS],
    latched: [u32; MAX_CHANNELS],
    fading: [bool; MAX_CHANNELS],
    bindings: [Option<FadeBinding>; MAX_CHANNELS],
}

/// In-memory LEDC for host runs.  Fades complete instantly in the duty
/// table; the fade-end "interrupt" fires when [`SimLedc::complete_fade`] is
/// called.
#[derive(Default)]
pub struct SimLedc {
    state: Mutex<SimState>,
}

const SIM_ERR_NOT_CONFIGURED: HwError = HwError(-2);

impl SimLedc {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn configured(state: &SimState, channel: ChannelId) -> Result<usize, HwError> {
        let idx = channel.index();
        match state.gpio.get(idx) {
            Some(Some(_)) => Ok(idx),
            _ => Err(SIM_ERR_NOT_CONFIGURED),
        }
    }

    /// Output duty of `channel`.
    pub fn duty(&self, channel: ChannelId) -> u32 {
        self.state().duty.get(channel.index()).copied().unwrap_or(0)
    }

    /// Whether a fade is in flight on `channel`.
    pub fn is_fading(&self, channel: ChannelId) -> bool {
        self.state().fading.get(channel.index()).copied().unwrap_or(false)
    }

    /// How many times the shared timer was configured.
    pub fn timer_configs(&self) -> u32 {
        self.state().timer_configs
    }

    /// Finish the in-flight fade on `channel` and raise its fade-end
    /// callback.  Returns the bridge's push result, `false` when nothing
    /// was fading.
    pub fn complete_fade(&self, channel: ChannelId) -> bool {
        let binding = {
            let mut state = self.state();
            let idx = channel.index();
            if !state.fading.get(idx).copied().unwrap_or(false) {
                return false;
            }
            state.fading[idx] = false;
            state.bindings[idx]
        };
        binding.is_some_and(|b| b.on_fade_end())
    }
}

impl PwmPort for SimLedc {
    fn configure_timer(&self, timer: &TimerConfig) -> Result<(), HwError> {
        debug!(
            "ledc(sim): timer {} @ {} Hz, {}-bit",
            timer.timer_id, timer.frequency_hz, timer.resolution_bits
        );
        self.state().timer_configs += 1;
        Ok(())
    }

    fn install_fade_service(&self) -> Result<(), HwError> {
        self.state().fade_service = true;
        Ok(())
    }

    fn configure_channel(&self, channel: &ChannelConfig) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = channel.channel.index();
        if idx >= MAX_CHANNELS {
            return Err(SIM_ERR_NOT_CONFIGURED);
        }
        state.gpio[idx] = Some(channel.gpio);
        state.duty[idx] = channel.initial_duty;
        state.latched[idx] = channel.initial_duty;
        debug!("ledc(sim): ch{} -> gpio {}", idx, channel.gpio);
        Ok(())
    }

    fn set_duty(&self, channel: ChannelId, duty: u32) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = Self::configured(&state, channel)?;
        state.latched[idx] = duty;
        Ok(())
    }

    fn update_duty(&self, channel: ChannelId) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = Self::configured(&state, channel)?;
        state.duty[idx] = state.latched[idx];
        debug!("ledc(sim): ch{} duty={}", idx, state.duty[idx]);
        Ok(())
    }

    fn start_fade(
        &self,
        channel: ChannelId,
        target_duty: u32,
        duration_ms: u32,
    ) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = Self::configured(&state, channel)?;
        if !state.fade_service {
            return Err(SIM_ERR_NOT_CONFIGURED);
        }
        state.duty[idx] = target_duty;
        state.latched[idx] = target_duty;
        state.fading[idx] = true;
        debug!("ledc(sim): ch{} fade -> {} over {}ms", idx, target_duty, duration_ms);
        Ok(())
    }

    fn stop(&self, channel: ChannelId) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = Self::configured(&state, channel)?;
        state.duty[idx] = 0;
        state.fading[idx] = false;
        Ok(())
    }

    fn register_fade_callback(
        &self,
        channel: ChannelId,
        binding: FadeBinding,
    ) -> Result<(), HwError> {
        let mut state = self.state();
        let idx = Self::configured(&state, channel)?;
        state.bindings[idx] = Some(binding);
        Ok(())
    }
}
