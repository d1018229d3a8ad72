//! Download progress arithmetic (percent, rate, ETA).

/// Whole-number percentage `floor(done / total * 100)` clamped to [0, 100].
/// Unknown or zero totals report 0; the terminal state forces 100 on success.
pub fn percent(bytes_done: u64, total_bytes: Option<u64>) -> u8 {
    match total_bytes {
        Some(total) if total > 0 => {
            let pct = (u128::from(bytes_done) * 100) / u128::from(total);
            pct.min(100) as u8
        }
        _ => 0,
    }
}

/// Snapshot of one job's download.
#[derive(Debug, Clone, Copy)]
pub struct ProgressStats {
    /// Bytes written to the temporary sink so far.
    pub bytes_done: u64,
    /// `Content-Length` of the source, if the server sent one.
    pub total_bytes: Option<u64>,
    /// Seconds since the first byte was requested.
    pub elapsed_secs: f64,
}

impl ProgressStats {
    pub fn percent(&self) -> u8 {
        percent(self.bytes_done, self.total_bytes)
    }

    /// Download rate in bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Projected seconds remaining. None when the total is unknown or no
    /// bytes have arrived yet.
    pub fn eta_secs(&self) -> Option<f64> {
        let total = self.total_bytes?;
        let remaining = total.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floors_and_clamps() {
        assert_eq!(percent(0, Some(1000)), 0);
        assert_eq!(percent(999, Some(1000)), 99);
        assert_eq!(percent(1000, Some(1000)), 100);
        assert_eq!(percent(5000, Some(1000)), 100);
        assert_eq!(percent(1, Some(3)), 33);
    }

    #[test]
    fn percent_unknown_total_is_zero() {
        assert_eq!(percent(12345, None), 0);
        assert_eq!(percent(12345, Some(0)), 0);
    }

    #[test]
    fn percent_no_overflow_on_huge_sizes() {
        assert_eq!(percent(u64::MAX / 2, Some(u64::MAX)), 49);
    }

    #[test]
    fn eta_from_rate() {
        let s = ProgressStats {
            bytes_done: 100,
            total_bytes: Some(1000),
            elapsed_secs: 10.0,
        };
        assert!((s.bytes_per_sec() - 10.0).abs() < 1e-9);
        assert!((s.eta_secs().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn eta_unknown_without_total_or_rate() {
        let no_total = ProgressStats {
            bytes_done: 100,
            total_bytes: None,
            elapsed_secs: 1.0,
        };
        assert!(no_total.eta_secs().is_none());
        let no_rate = ProgressStats {
            bytes_done: 0,
            total_bytes: Some(10),
            elapsed_secs: 0.0,
        };
        assert!(no_rate.eta_secs().is_none());
    }
}
