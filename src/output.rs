//! Brightness output.
//!
//! Defines the [`PwmOutput`] trait for the hardware, [`LevelDriver`], which
//! maps ramp levels onto PWM duty values, and [`Ticker`], the busy-wait used
//! to pace blinks and the main loop.

use crate::config::TICKS_PER_SECOND;
use embedded_hal::delay::DelayNs;

/// Trait for abstracting the PWM channel driving the emitter.
///
/// Implement this for your timer hardware. Timer mode selection (fast versus
/// phase-correct PWM for low duties) belongs in the implementation.
pub trait PwmOutput {
    /// Sets the raw duty cycle, 0 = off, 255 = full.
    fn set_duty(&mut self, duty: u8);
}

/// Renders ramp levels on a PWM output.
pub struct LevelDriver<O: PwmOutput> {
    pwm: O,
    ramp: &'static [u8],
    level: u8,
}

impl<O: PwmOutput> LevelDriver<O> {
    /// Creates a driver with the output turned off.
    pub fn new(mut pwm: O, ramp: &'static [u8]) -> Self {
        pwm.set_duty(0);
        Self { pwm, ramp, level: 0 }
    }

    /// Sets the output to ramp `level`. Level 0 is off; levels past the top
    /// of the ramp render at full ramp brightness.
    pub fn set_level(&mut self, level: u8) {
        let duty = match level {
            0 => 0,
            _ => {
                let index = (level as usize).min(self.ramp.len()).saturating_sub(1);
                self.ramp.get(index).copied().unwrap_or(0)
            }
        };
        self.pwm.set_duty(duty);
        self.level = level;
    }

    /// The level most recently set.
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Highest ramp level.
    pub fn ramp_size(&self) -> u8 {
        self.ramp.len() as u8
    }

    /// Returns a reference to the PWM output.
    pub fn pwm(&self) -> &O {
        &self.pwm
    }
}

/// Blocking delay counted in driver ticks.
///
/// Delays are not interruptible: the switch is ignored until they finish.
pub struct Ticker<D: DelayNs> {
    delay: D,
    tick_ms: u32,
}

impl<D: DelayNs> Ticker<D> {
    /// Creates a ticker with `tick_ms` milliseconds per tick.
    pub fn new(delay: D, tick_ms: u32) -> Self {
        Self { delay, tick_ms }
    }

    /// Waits `ticks` ticks.
    pub fn ticks(&mut self, ticks: u16) {
        self.delay.delay_ms(u32::from(ticks).saturating_mul(self.tick_ms));
    }

    /// Waits one second.
    pub fn second(&mut self) {
        self.ticks(TICKS_PER_SECOND);
    }

    /// Returns a reference to the delay provider.
    pub fn delay(&self) -> &D {
        &self.delay
    }
}

/// Blinks `count` times at `level`: on for `speed` ticks, off for twice that.
pub fn blink<O: PwmOutput, D: DelayNs>(
    output: &mut LevelDriver<O>,
    ticker: &mut Ticker<D>,
    level: u8,
    count: u8,
    speed: u16,
) {
    for _ in 0..count {
        output.set_level(level);
        ticker.ticks(speed);
        output.set_level(0);
        ticker.ticks(speed);
        ticker.ticks(speed);
    }
}
