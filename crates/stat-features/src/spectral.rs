//! Normalized-Frequency Spectral Analysis

use rustfft::{num_complex::Complex, FftPlanner};

/// Band split points as fractions of the Nyquist frequency
const LOW_BAND_END: f64 = 0.1;
const MID_BAND_END: f64 = 0.4;

/// Power spectral density split into normalized frequency bands
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BandPower {
    /// Power below 10% of Nyquist
    pub low: f64,
    /// Power between 10% and 40% of Nyquist
    pub mid: f64,
    /// Power above 40% of Nyquist
    pub high: f64,
    /// Total spectral power
    pub total: f64,
}

impl BandPower {
    /// Fraction of total power in the high band.
    ///
    /// High-frequency content tracks fine detail, so over image scanlines
    /// this ratio serves as an edge-density proxy.
    pub fn high_ratio(&self) -> Option<f64> {
        if self.total > 0.0 {
            Some(self.high / self.total)
        } else {
            None
        }
    }
}

/// FFT analyzer over unit-rate signals.
///
/// Bands are fractions of Nyquist, so the analyzer applies to any sampled
/// sequence without a physical sample rate (image scanlines, value traces).
pub struct SpectralAnalyzer {
    planner: FftPlanner<f64>,
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralAnalyzer {
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Apply Hamming window to reduce spectral leakage
    fn apply_hamming_window(signal: &mut [f64]) {
        let n = signal.len();
        for (i, v) in signal.iter_mut().enumerate() {
            let window =
                0.54 - 0.46 * (2.0 * std::f64::consts::PI * i as f64 / (n - 1) as f64).cos();
            *v *= window;
        }
    }

    /// Compute band powers for a signal
    pub fn analyze(&mut self, signal: &[f64]) -> BandPower {
        if signal.len() < 4 {
            return BandPower::default();
        }

        let n = signal.len();

        let mut windowed: Vec<f64> = signal.to_vec();
        Self::apply_hamming_window(&mut windowed);

        let mut buffer: Vec<Complex<f64>> =
            windowed.iter().map(|&v| Complex::new(v, 0.0)).collect();

        let fft = self.planner.plan_fft_forward(n);
        fft.process(&mut buffer);

        // Positive frequencies only; magnitude squared, normalized
        let half = n / 2;
        let mut band = BandPower::default();
        for (i, c) in buffer.iter().take(half).enumerate() {
            let power = c.norm_sqr() / n as f64;
            let frac = i as f64 / half as f64;

            if frac < LOW_BAND_END {
                band.low += power;
            } else if frac < MID_BAND_END {
                band.mid += power;
            } else {
                band.high += power;
            }
            band.total += power;
        }

        band
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slow_wave_lands_in_low_band() {
        let mut analyzer = SpectralAnalyzer::new();

        // 2 cycles over 256 samples: ~1.6% of Nyquist
        let signal: Vec<f64> = (0..256)
            .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / 256.0).sin())
            .collect();

        let band = analyzer.analyze(&signal);
        assert!(band.low > band.high);
        assert!(band.total > 0.0);
    }

    #[test]
    fn test_alternating_signal_lands_in_high_band() {
        let mut analyzer = SpectralAnalyzer::new();

        let signal: Vec<f64> = (0..256).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();

        let band = analyzer.analyze(&signal);
        assert!(band.high > band.low);
        assert!(band.high_ratio().unwrap() > 0.5);
    }

    #[test]
    fn test_short_signal_yields_default() {
        let mut analyzer = SpectralAnalyzer::new();
        let band = analyzer.analyze(&[1.0, 2.0]);
        assert_eq!(band.total, 0.0);
        assert!(band.high_ratio().is_none());
    }
}
