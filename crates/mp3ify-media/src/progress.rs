//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Calculate progress percentage given total duration in milliseconds.
    pub fn percentage(&self, total_duration_ms: i64) -> f64 {
        if total_duration_ms <= 0 {
            return 0.0;
        }
        ((self.out_time_ms as f64 / total_duration_ms as f64) * 100.0).min(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(out_time_ms: i64) -> FfmpegProgress {
        FfmpegProgress {
            out_time_ms,
            ..Default::default()
        }
    }

    #[test]
    fn test_progress_percentage() {
        assert!((at(5000).percentage(10000) - 50.0).abs() < 0.01);
        assert!((at(5000).percentage(5000) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_percentage_is_capped_at_100() {
        assert!((at(20000).percentage(10000) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_zero_duration_yields_zero() {
        assert_eq!(at(5000).percentage(0), 0.0);
        assert_eq!(at(5000).percentage(-1), 0.0);
    }

    #[test]
    fn test_marker_sequence_maps_to_expected_percentages() {
        // Elapsed markers at 0s, 5s and 10s of a 10 second input.
        let observed: Vec<f64> = [0, 5_000, 10_000]
            .into_iter()
            .map(|ms| at(ms).percentage(10_000))
            .collect();
        assert_eq!(observed, vec![0.0, 50.0, 100.0]);
    }
}
