//! The bench coordinator: one owner for every instrument handle and lock.
//!
//! A single `Setup` owns the supplies, the digitizer, and the lock table.
//! Two independent layers of exclusion apply:
//! - Cross-process named locks express *who controls* a resource for an
//!   extended period: one bias lock per slot, one signal-acquisition lock.
//!   Mutating calls take the relevant lock with the caller's identity.
//! - In-process mutexes serialize raw traffic to each instrument, so reads
//!   such as telemetry never need a named lock.
//!
//! The named locks are re-entrant per identity, so a caller that already
//! holds a slot with [`Setup::hold_bias`] can keep calling mutating methods
//! on that slot with the same identity.

mod instruments;


pub use instruments::{BiasSupply, OutputState, SignalDigitizer, Waveform};

use crate::config::{Config, SlotConfig};
use crate::context::LockContext;
use crate::error::{BenchError, Result};
use crate::locks::{LockGuard, LockTable, NamedFileLock, OwnerRecord, ResourceName, TableMode};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Every instrument of one bench, plus the locks guarding them.
pub struct Setup<S, D> {
    config: Config,
    locks: LockTable,
    supplies: BTreeMap<String, Mutex<S>>,
    digitizer: Mutex<D>,
}

impl<S: BiasSupply, D: SignalDigitizer> Setup<S, D> {
    /// Take ownership of the instruments. `supplies` is keyed by serial
    /// number, matching `supply_serial` in the slot configuration.
    pub fn new<I>(ctx: &LockContext, supplies: I, digitizer: D) -> Result<Self>
    where
        I: IntoIterator<Item = (String, S)>,
    {
        let config = ctx.config.clone();
        config.validate()?;

        let supplies: BTreeMap<String, Mutex<S>> = supplies
            .into_iter()
            .map(|(serial, supply)| (serial, Mutex::new(supply)))
            .collect();

        let locks = LockTable::new(&ctx.lock_dir, TableMode::Strict)
            .with_poll_interval(config.poll_interval())
            .with_reentrancy(true)
            .register_all(config.resource_names()?);

        let setup = Self {
            config,
            locks,
            supplies,
            digitizer: Mutex::new(digitizer),
        };
        for slot in &setup.config.slots {
            setup.supply_for(slot)?;
        }

        info!(
            slots = setup.config.slots.len(),
            supplies = setup.supplies.len(),
            lock_dir = %ctx.lock_dir.display(),
            "bench setup ready"
        );
        Ok(setup)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    pub fn slots(&self) -> &[SlotConfig] {
        &self.config.slots
    }

    pub fn device_name(&self, slot: u32) -> Result<&str> {
        Ok(self.slot(slot)?.device_name.as_str())
    }

    // ========================================================================
    // Bias control
    // ========================================================================

    /// Take exclusive control of a slot's bias until the guard is dropped.
    ///
    /// Others can still measure the slot, but not change its voltage,
    /// compliance, or output state.
    pub fn hold_bias(&self, slot: u32, who: &str) -> Result<LockGuard> {
        self.bias_lock(slot)?.acquire(who)
    }

    pub fn is_bias_held(&self, slot: u32) -> Result<bool> {
        self.bias_lock(slot)?.is_locked()
    }

    pub fn bias_owner(&self, slot: u32) -> Result<Option<OwnerRecord>> {
        self.bias_lock(slot)?.current_owner()
    }

    pub fn measure_bias_voltage(&self, slot: u32) -> Result<f64> {
        self.with_supply(slot, |supply, channel| supply.voltage(channel))
    }

    pub fn measure_bias_current(&self, slot: u32) -> Result<f64> {
        self.with_supply(slot, |supply, channel| supply.current(channel))
    }

    pub fn is_ramping_bias_voltage(&self, slot: u32) -> Result<bool> {
        self.with_supply(slot, |supply, channel| supply.is_ramping(channel))
    }

    pub fn current_compliance(&self, slot: u32) -> Result<f64> {
        self.with_supply(slot, |supply, channel| supply.current_compliance(channel))
    }

    /// Set the bias voltage of a slot.
    ///
    /// With `wait_until_settled`, blocks until the supply stops ramping plus
    /// the configured settle time. The wait keeps the slot's bias lock but
    /// not the supply mutex, so other slots stay usable meanwhile.
    pub fn set_bias_voltage(
        &self,
        slot: u32,
        volts: f64,
        who: &str,
        wait_until_settled: bool,
    ) -> Result<()> {
        require_finite("volts", volts)?;
        self.bias_lock(slot)?.hold(who, |_| {
            self.with_supply(slot, |supply, channel| supply.set_voltage(channel, volts))?;
            debug!(slot, volts, owner = who, "bias voltage set");
            if wait_until_settled {
                self.wait_until_settled(slot)?;
            }
            Ok(())
        })
    }

    pub fn set_current_compliance(&self, slot: u32, amperes: f64, who: &str) -> Result<()> {
        require_finite("amperes", amperes)?;
        self.bias_lock(slot)?.hold(who, |_| {
            self.with_supply(slot, |supply, channel| {
                supply.set_current_compliance(channel, amperes)
            })
        })
    }

    pub fn set_bias_output(&self, slot: u32, state: OutputState, who: &str) -> Result<()> {
        self.bias_lock(slot)?.hold(who, |_| {
            self.with_supply(slot, |supply, channel| supply.set_output(channel, state))
        })
    }

    // ========================================================================
    // Signal acquisition
    // ========================================================================

    /// Take exclusive control of the signal-acquisition chain until the
    /// guard is dropped.
    pub fn hold_signal_acquisition(&self, who: &str) -> Result<LockGuard> {
        self.signal_lock()?.acquire(who)
    }

    pub fn set_vdiv(&self, channel: u32, vdiv: f64, who: &str) -> Result<()> {
        require_finite("vdiv", vdiv)?;
        self.signal_lock()?
            .hold(who, |_| self.digitizer().set_vdiv(channel, vdiv))
    }

    pub fn set_trigger_level(&self, level: f64, who: &str) -> Result<()> {
        require_finite("level", level)?;
        self.signal_lock()?
            .hold(who, |_| self.digitizer().set_trigger_level(level))
    }

    /// Block until the digitizer triggers.
    pub fn wait_for_trigger(&self, who: &str) -> Result<()> {
        self.signal_lock()?
            .hold(who, |_| self.digitizer().wait_for_trigger())
    }

    /// Read a trace. Needs no named lock: reading never changes the chain.
    pub fn waveform(&self, channel: u32) -> Result<Waveform> {
        self.digitizer().waveform(channel)
    }

    // ========================================================================
    // Description
    // ========================================================================

    /// Human description of the bench, meant to be stored next to measured data.
    pub fn description(&self) -> Result<String> {
        let mut out = String::from("Instruments\n-----------\n\n");
        let _ = writeln!(out, "digitizer: {}", self.digitizer().idn()?);
        for (serial, supply) in &self.supplies {
            let idn = lock_instrument(supply).idn()?;
            let _ = writeln!(out, "supply {}: {}", serial, idn);
        }

        out.push_str("\nSlots configuration\n-------------------\n\n");
        let _ = writeln!(
            out,
            "{:>4}  {:<20} {:<10} {:>7} {:>9}",
            "slot", "device", "supply", "channel", "digitizer"
        );
        for slot in &self.config.slots {
            let _ = writeln!(
                out,
                "{:>4}  {:<20} {:<10} {:>7} {:>9}",
                slot.slot,
                slot.device_name,
                slot.supply_serial.as_deref().unwrap_or("-"),
                slot.supply_channel,
                slot.digitizer_channel
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            );
        }
        Ok(out)
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn slot(&self, slot: u32) -> Result<&SlotConfig> {
        self.config
            .slot(slot)
            .ok_or_else(|| BenchError::UnknownResource(ResourceName::slot(slot).to_string()))
    }

    fn bias_lock(&self, slot: u32) -> Result<Arc<NamedFileLock>> {
        self.slot(slot)?;
        self.locks.lock_for(ResourceName::slot(slot).as_str())
    }

    fn signal_lock(&self) -> Result<Arc<NamedFileLock>> {
        self.locks.lock_for(&self.config.signal_acquisition)
    }

    fn supply_for(&self, slot: &SlotConfig) -> Result<&Mutex<S>> {
        match &slot.supply_serial {
            Some(serial) => self.supplies.get(serial).ok_or_else(|| {
                BenchError::ConfigError(format!(
                    "slot {} uses supply '{}', which is not connected",
                    slot.slot, serial
                ))
            }),
            // Without a serial, a slot is only unambiguous on a single-supply bench.
            None => match self.supplies.values().next() {
                Some(only) if self.supplies.len() == 1 => Ok(only),
                _ => Err(BenchError::ConfigError(format!(
                    "slot {} has no supply_serial and {} supplies are connected",
                    slot.slot,
                    self.supplies.len()
                ))),
            },
        }
    }

    fn with_supply<T, F>(&self, slot: u32, f: F) -> Result<T>
    where
        F: FnOnce(&mut S, u32) -> Result<T>,
    {
        let slot = self.slot(slot)?;
        let mut supply = lock_instrument(self.supply_for(slot)?);
        f(&mut supply, slot.supply_channel)
    }

    fn digitizer(&self) -> MutexGuard<'_, D> {
        lock_instrument(&self.digitizer)
    }

    fn wait_until_settled(&self, slot: u32) -> Result<()> {
        // The supply takes a moment to notice a new setpoint.
        thread::sleep(Duration::from_millis(self.config.ramp_start_delay_ms));
        while self.is_ramping_bias_voltage(slot)? {
            thread::sleep(Duration::from_millis(self.config.ramp_poll_ms));
        }
        thread::sleep(Duration::from_millis(self.config.ramp_settle_ms));
        debug!(slot, "bias settled");
        Ok(())
    }
}

fn lock_instrument<T>(instrument: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic mid-command does not leave the handle itself unusable.
    instrument.lock().unwrap_or_else(|poison| poison.into_inner())
}

fn require_finite(what: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BenchError::ConfigError(format!(
            "{} must be a finite number, got {}",
            what, value
        )))
    }
}
