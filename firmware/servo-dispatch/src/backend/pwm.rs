use embedded_hal::pwm::SetDutyCycle;
use log::warn;

use crate::backend::Backend;
use crate::channel::ServoConfig;
use crate::error::BackendError;

/// Servo refresh period at 50 Hz.
const PERIOD_US: u32 = 20_000;

/// Direct backend: one PWM pin per output, synchronous register writes.
///
/// The pins must already be configured for a 50 Hz period (LEDC timer,
/// hardware timer channel, etc.); this backend only translates pulse
/// widths into duty cycles.
pub struct PwmBackend<P> {
    pins: Vec<P>,
}

impl<P: SetDutyCycle> PwmBackend<P> {
    /// Output `n` drives `pins[n]`.
    pub fn new(pins: Vec<P>) -> Self {
        Self { pins }
    }
}

impl<P: SetDutyCycle> Backend for PwmBackend<P> {
    fn configure(&mut self, configs: &[ServoConfig]) -> Result<(), BackendError> {
        if configs.len() > self.pins.len() {
            return Err(BackendError::Capacity {
                requested: configs.len(),
                available: self.pins.len(),
            });
        }
        for config in configs {
            if config.output as usize >= self.pins.len() {
                return Err(BackendError::UnboundOutput {
                    output: config.output,
                });
            }
        }
        Ok(())
    }

    fn set_position(&mut self, output: u8, pulse_us: u16) -> Result<(), BackendError> {
        let pin = self
            .pins
            .get_mut(output as usize)
            .ok_or(BackendError::UnboundOutput { output })?;
        let duty = ((pulse_us as u32 * pin.max_duty_cycle() as u32) / PERIOD_US) as u16;
        pin.set_duty_cycle(duty).map_err(|e| {
            warn!("pwm write on output {} failed: {:?}", output, e);
            BackendError::Bus
        })
    }

    fn release(&mut self, output: u8) -> Result<(), BackendError> {
        let pin = self
            .pins
            .get_mut(output as usize)
            .ok_or(BackendError::UnboundOutput { output })?;
        // Zero duty stops the pulse train and lets the servo go limp.
        pin.set_duty_cycle(0).map_err(|e| {
            warn!("pwm release on output {} failed: {:?}", output, e);
            BackendError::Bus
        })
    }
}
