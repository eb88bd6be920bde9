use super::DischargeModel;

/// Every unit drawn is gone for good.
#[derive(Debug, Clone, Default)]
pub struct Linear {
    drawn: u64,
}

impl Linear {
    pub fn drawn(&self) -> u64 {
        self.drawn
    }
}

impl DischargeModel for Linear {
    fn consume(&mut self, drawn: u64, _elapsed_ms: u64) {
        self.drawn = self.drawn.saturating_add(drawn);
    }

    fn used(&self) -> u64 {
        self.drawn
    }
}
