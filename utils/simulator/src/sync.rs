/// Clock and data line levels for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pins {
    pub clk: bool,
    pub dat: bool,
}

impl Pins {
    /// Both lines released and pulled up
    pub const IDLE: Pins = Pins {
        clk: true,
        dat: true,
    };

    pub fn new(clk: bool, dat: bool) -> Self {
        Self { clk, dat }
    }
}

impl Default for Pins {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Two-register synchronizer for one asynchronous line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Synchronizer {
    stages: [bool; 2],
}

impl Synchronizer {
    pub fn new(reset: bool) -> Self {
        Self {
            stages: [reset; 2],
        }
    }

    pub fn output(&self) -> bool {
        self.stages[1]
    }

    pub fn tick(&mut self, input: bool) {
        self.stages = [input, self.stages[0]];
    }
}

/// Synchronizers for both PS/2 lines.
///
/// Output lags the raw pins by exactly two ticks. Reset state is the idle
/// bus, so a freshly built receiver does not see a spurious falling edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSync {
    clk: Synchronizer,
    dat: Synchronizer,
}

impl LineSync {
    pub fn new() -> Self {
        Self {
            clk: Synchronizer::new(Pins::IDLE.clk),
            dat: Synchronizer::new(Pins::IDLE.dat),
        }
    }

    pub fn output(&self) -> Pins {
        Pins {
            clk: self.clk.output(),
            dat: self.dat.output(),
        }
    }

    pub fn tick(&mut self, raw: Pins) {
        self.clk.tick(raw.clk);
        self.dat.tick(raw.dat);
    }
}

impl Default for LineSync {
    fn default() -> Self {
        Self::new()
    }
}
