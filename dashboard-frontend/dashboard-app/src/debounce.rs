/// What the caller should do with its timer after a trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebounceAction {
    /// Cancel any pending timer and run the callback now.
    FireNow,
    /// Cancel any pending timer and schedule a new one after this many milliseconds.
    Schedule(u32),
}

/// Debounce that gives up postponing after `max_debounce_times` consecutive triggers, so a
/// user who types without pause still gets saved periodically.
///
/// Timers are owned by the caller; this only counts.
#[derive(Clone, Debug)]
pub struct ThrottledDebounce {
    max_debounce_times: u32,
    delay_ms: u32,
    times_debounced: u32,
}

impl ThrottledDebounce {
    pub fn new(max_debounce_times: u32, delay_ms: u32) -> Self {
        Self {
            max_debounce_times,
            delay_ms,
            times_debounced: 0,
        }
    }

    pub fn trigger(&mut self) -> DebounceAction {
        if self.times_debounced == self.max_debounce_times {
            self.times_debounced = 0;
            return DebounceAction::FireNow;
        }
        self.times_debounced += 1;
        DebounceAction::Schedule(self.delay_ms)
    }

    /// The scheduled timer ran out and the callback fired.
    pub fn timer_elapsed(&mut self) {
        self.times_debounced = 0;
    }

    pub fn times_debounced(&self) -> u32 {
        self.times_debounced
    }
}
