/// Counts consecutive ticks with `wait` asserted.
///
/// `done` is a level that holds once `limit` ticks have been counted and
/// drops on the tick after `wait` is released. The count is a register, so
/// `done` always reflects the inputs seen up to the previous tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimer {
    limit: u32,
    count: u32,
}

impl WaitTimer {
    pub fn new(limit: u32) -> Self {
        Self { limit, count: 0 }
    }

    pub fn done(&self) -> bool {
        self.count >= self.limit
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn tick(&mut self, wait: bool) {
        if !wait {
            self.count = 0;
        } else if self.count < self.limit {
            self.count += 1;
        }
    }
}
