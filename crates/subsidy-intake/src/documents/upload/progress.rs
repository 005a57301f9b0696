/// Simulated transfer percentage shown while the real upload is in flight.
///
/// Each step covers a quarter of the remaining distance to the ceiling, so the value rises
/// quickly at first and slows down, never reaching 100 on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatedProgress {
    percent: u8,
}

impl SimulatedProgress {
    pub const CEILING: u8 = 95;

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn advance(&mut self) -> u8 {
        let remaining = Self::CEILING.saturating_sub(self.percent);
        if remaining > 0 {
            self.percent += (remaining / 4).max(1);
        }
        self.percent
    }
}
