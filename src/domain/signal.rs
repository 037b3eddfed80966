//! Entry signal derived from the indicator frame.
//!
//! Long when RSI is oversold while the 20DMA sits above the 50DMA, flat
//! otherwise. There is no short or explicit exit signal.

use std::fmt;

use crate::domain::indicator::IndicatorFrame;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalRule {
    pub rsi_below: f64,
}

impl Default for SignalRule {
    fn default() -> Self {
        Self { rsi_below: 40.0 }
    }
}

impl SignalRule {
    /// 1 when every input is defined and the rule holds, 0 otherwise.
    pub fn evaluate(&self, rsi: Option<f64>, dma_20: Option<f64>, dma_50: Option<f64>) -> u8 {
        match (rsi, dma_20, dma_50) {
            (Some(rsi), Some(short), Some(long)) if rsi < self.rsi_below && short > long => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for SignalRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RSI < {} + 20DMA > 50DMA", self.rsi_below)
    }
}

#[derive(Debug, Clone)]
pub struct SignalFrame {
    pub indicators: IndicatorFrame,
    pub signal: Vec<u8>,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.signal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signal.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.signal.iter().filter(|&&s| s == 1).count()
    }
}

pub fn generate_signal(indicators: IndicatorFrame, rule: &SignalRule) -> SignalFrame {
    let signal = (0..indicators.len())
        .map(|i| rule.evaluate(indicators.rsi[i], indicators.dma_20[i], indicators.dma_50[i]))
        .collect();

    SignalFrame { indicators, signal }
}
