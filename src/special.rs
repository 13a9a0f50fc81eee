//! Special mode behaviors.
//!
//! Each behavior runs one pass of its pattern and returns; the controller
//! calls it again on the next loop pass. Group selection needs the store and
//! is run by the controller itself.

use crate::battery::{BatterySensor, battery_blinks};
use crate::config::DriverConfig;
use crate::output::{LevelDriver, PwmOutput, Ticker, blink};
use crate::types::SpecialMode;
use embedded_hal::delay::DelayNs;

const STROBE_FLASHES: u8 = 8;
const SOS_SPEED: u16 = 200 / 4;
const RAMP_STEP_TICKS: u16 = 6;

/// Collaborators a special mode may drive.
pub struct SpecialContext<'a, O: PwmOutput, D: DelayNs, B: BatterySensor> {
    pub output: &'a mut LevelDriver<O>,
    pub ticker: &'a mut Ticker<D>,
    pub battery: &'a mut B,
    pub config: &'a DriverConfig,
}

impl<O: PwmOutput, D: DelayNs, B: BatterySensor> SpecialContext<'_, O, D, B> {
    /// Runs one pass of `mode`.
    pub fn run(&mut self, mode: SpecialMode) {
        match mode {
            SpecialMode::Strobe => self.strobe(33 / 4, 67 / 4),
            SpecialMode::PoliceStrobe => {
                self.strobe(20 / 4, 40 / 4);
                self.strobe(40 / 4, 80 / 4);
            }
            SpecialMode::BikingStrobe => self.biking_strobe(),
            SpecialMode::RampTest => self.ramp_test(),
            SpecialMode::Sos => self.sos(),
            SpecialMode::BatteryCheck => self.battery_check(),
            // Owned by the controller.
            SpecialMode::GroupSelect => {}
        }
    }

    fn strobe(&mut self, on_ticks: u16, off_ticks: u16) {
        let top = self.output.ramp_size();
        for _ in 0..STROBE_FLASHES {
            self.output.set_level(top);
            self.ticker.ticks(on_ticks);
            self.output.set_level(0);
            self.ticker.ticks(off_ticks);
        }
    }

    fn biking_strobe(&mut self) {
        let top = self.output.ramp_size();
        self.output.set_level(top);
        self.ticker.ticks(8);
        self.output.set_level(top.min(3));
        self.ticker.second();
    }

    fn ramp_test(&mut self) {
        let top = self.output.ramp_size();
        for level in (1..=top).chain((1..=top).rev()) {
            self.output.set_level(level);
            self.ticker.ticks(RAMP_STEP_TICKS);
        }
    }

    fn sos(&mut self) {
        let level = self.config.blink_level;
        blink(self.output, self.ticker, level, 3, SOS_SPEED);
        self.ticker.ticks(SOS_SPEED * 5);
        blink(self.output, self.ticker, level, 3, SOS_SPEED * 5 / 2);
        blink(self.output, self.ticker, level, 3, SOS_SPEED);
        self.ticker.second();
        self.ticker.second();
    }

    fn battery_check(&mut self) {
        let sample = self.battery.measure();
        let blinks = battery_blinks(sample, self.config.battcheck);
        debug!("battery check: reading {} -> {} blinks", sample, blinks);

        let speed = u16::from(self.config.blink_ticks / 4);
        blink(self.output, self.ticker, self.config.blink_level, blinks, speed);
        self.ticker.second();
        self.ticker.second();
    }
}
