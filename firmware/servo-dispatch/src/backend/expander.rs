use core::fmt::Debug;

use embedded_hal::i2c::I2c;
use log::{debug, warn};
use pwm_pca9685::Pca9685;

use crate::backend::Backend;
use crate::channel::ServoConfig;
use crate::error::BackendError;

/// Servo refresh period at 50 Hz.
const PERIOD_US: u32 = 20_000;
/// 25 MHz internal oscillator / (4096 counts * 50 Hz) - 1.
const PRESCALE_50HZ: u8 = 121;
/// Channels addressable on one PCA9685.
pub const EXPANDER_CHANNELS: usize = 16;

/// Expander backend: up to 16 outputs multiplexed over one PCA9685.
///
/// Positions are staged per channel and committed in a single full-bank
/// transaction per tick, so a rig of panels costs one bus write instead of
/// sixteen. A failed transaction leaves the stage dirty; the next tick's
/// flush resends it. There is no blocking retry.
pub struct ExpanderBackend<I2C> {
    pwm: Pca9685<I2C>,
    /// Staged off-counts, one per expander channel.
    staged: [u16; EXPANDER_CHANNELS],
    dirty: bool,
}

impl<I2C, E> ExpanderBackend<I2C>
where
    I2C: I2c<Error = E>,
    E: Debug,
{
    /// Bind a PCA9685 at the given 7-bit address (0x40 for a lone chip).
    pub fn new(i2c: I2C, address: u8) -> Result<Self, BackendError> {
        let pwm = Pca9685::new(i2c, address).map_err(|e| {
            warn!("pca9685 at {:#04x} rejected: {:?}", address, e);
            BackendError::Bus
        })?;
        Ok(Self {
            pwm,
            staged: [0; EXPANDER_CHANNELS],
            dirty: false,
        })
    }

    fn counts_for(pulse_us: u16) -> u16 {
        ((pulse_us as u32 * 4096) / PERIOD_US) as u16
    }
}

impl<I2C, E> Backend for ExpanderBackend<I2C>
where
    I2C: I2c<Error = E>,
    E: Debug,
{
    fn configure(&mut self, configs: &[ServoConfig]) -> Result<(), BackendError> {
        if configs.len() > EXPANDER_CHANNELS {
            return Err(BackendError::Capacity {
                requested: configs.len(),
                available: EXPANDER_CHANNELS,
            });
        }
        for config in configs {
            if config.output as usize >= EXPANDER_CHANNELS {
                return Err(BackendError::UnboundOutput {
                    output: config.output,
                });
            }
        }
        self.pwm.set_prescale(PRESCALE_50HZ).map_err(|e| {
            warn!("pca9685 prescale write failed: {:?}", e);
            BackendError::Bus
        })?;
        self.pwm.enable().map_err(|e| {
            warn!("pca9685 enable failed: {:?}", e);
            BackendError::Bus
        })?;
        // Push an all-off bank on the first flush so unbound channels idle low.
        self.staged = [0; EXPANDER_CHANNELS];
        self.dirty = true;
        Ok(())
    }

    fn set_position(&mut self, output: u8, pulse_us: u16) -> Result<(), BackendError> {
        let slot = self
            .staged
            .get_mut(output as usize)
            .ok_or(BackendError::UnboundOutput { output })?;
        let counts = Self::counts_for(pulse_us);
        if *slot != counts {
            *slot = counts;
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BackendError> {
        if !self.dirty {
            return Ok(());
        }
        const ALL_ON: [u16; EXPANDER_CHANNELS] = [0; EXPANDER_CHANNELS];
        match self.pwm.set_all_on_off(&ALL_ON, &self.staged) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(e) => {
                // Stage stays dirty; the next tick resends the whole batch.
                debug!("pca9685 batch dropped, retrying next tick: {:?}", e);
                Err(BackendError::Bus)
            }
        }
    }

    fn release(&mut self, output: u8) -> Result<(), BackendError> {
        // A zero-width pulse stops driving the horn without touching the
        // other channels in the bank.
        self.set_position(output, 0)
    }
}
