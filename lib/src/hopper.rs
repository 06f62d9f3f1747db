//! Channel hopper: a tick-driven actor with no input queue, cycling a
//! [`ChannelPlan`] for one interface through a [`ChannelControl`].
//!
//! Grounded in `threads/hopper.cpp`'s `recurring()`/`setChannel()` pair,
//! with the netlink-specific `initLibnl80211`/`setChannel` plumbing
//! replaced by the `ChannelControl` capability boundary (§1: radio/link
//! primitives are an external collaborator).

use crate::channel_control::ChannelControl;
use crate::errors::StageInitError;
use crate::settings::ChannelPlan;
use crate::stage::{StageContext, StageWork};

/// C5. Holds a plan, a cyclic `position`, and a dwell countdown measured
/// in ticks (the stage is initialized with a 1ms tick per §4.10, so the
/// countdown is effectively in milliseconds).
pub struct HopperStageWork {
    control: Box<dyn ChannelControl>,
    iface: String,
    plan: ChannelPlan,
    freqs: Vec<u32>,
    position: usize,
    remaining_ticks: u32,
}

impl HopperStageWork {
    pub fn new(control: Box<dyn ChannelControl>, iface: String, plan: ChannelPlan) -> Self {
        HopperStageWork {
            control,
            iface,
            plan,
            freqs: Vec::new(),
            position: 0,
            remaining_ticks: 0,
        }
    }

    /// Number of channel changes observed so far; exposed for tests
    /// (scenario S3/testable property 5) that don't have access to the
    /// `ChannelControl` the hopper owns.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl StageWork for HopperStageWork {
    fn init_function(&mut self) -> Result<(), StageInitError> {
        if self.plan.is_empty() {
            return Err(StageInitError::EmptyChannelPlan);
        }
        for entry in &self.plan {
            let freq = self
                .control
                .channel_to_freq(entry.channel)
                .ok_or_else(|| StageInitError::InvalidInterface(self.iface.clone()))?;
            self.freqs.push(freq);
        }
        // Set the card on the first channel and advance past it, matching
        // `hopper::init_function`'s call to `setChannel(channels[0])`.
        self.apply(0)?;
        self.position = 1 % self.plan.len();
        self.remaining_ticks = self.plan[self.position].dwell_ms;
        Ok(())
    }

    fn recurring(
        &mut self,
        _ctx: &mut StageContext,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.plan.len() == 1 {
            return Ok(());
        }
        if self.remaining_ticks > 0 {
            self.remaining_ticks -= 1;
            return Ok(());
        }
        self.apply(self.position)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
        self.position = (self.position + 1) % self.plan.len();
        self.remaining_ticks = self.plan[self.position].dwell_ms;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("hopper({})", self.iface)
    }
}

impl HopperStageWork {
    fn apply(&mut self, index: usize) -> Result<(), StageInitError> {
        let entry = self.plan[index];
        let freq = self.freqs[index];
        self.control
            .set(&self.iface, freq, entry.ht_mode)
            .map_err(StageInitError::CaptureOpen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel_control::{HtMode, RecordingChannelControl};
    use crate::settings::ChannelSetting;

    fn plan(entries: &[(u32, u32)]) -> ChannelPlan {
        entries
            .iter()
            .map(|&(channel, dwell_ms)| ChannelSetting {
                channel,
                dwell_ms,
                ht_mode: HtMode::NoHt,
            })
            .collect()
    }

    #[test]
    fn single_channel_plan_never_hops() {
        let control = Box::new(RecordingChannelControl::default());
        let mut work = HopperStageWork::new(control, "wlan0".into(), plan(&[(6, 300)]));
        work.init_function().unwrap();

        let mut ctx = StageContext::for_test();
        for _ in 0..10 {
            work.recurring(&mut ctx).unwrap();
        }
        assert_eq!(work.position, 0);
    }

    #[test]
    fn cycles_through_plan_after_dwell() {
        let control = Box::new(RecordingChannelControl::default());
        let mut work = HopperStageWork::new(
            control,
            "wlan0".into(),
            plan(&[(1, 3), (6, 3), (11, 3)]),
        );
        work.init_function().unwrap();
        assert_eq!(work.position(), 1);

        let mut ctx = StageContext::for_test();
        // First entry's dwell (3 ticks) must elapse before the next switch.
        for _ in 0..3 {
            work.recurring(&mut ctx).unwrap();
        }
        assert_eq!(work.position(), 2);
    }
}
