//! Health score and critical classification.

/// Scores below this are critical.
pub const CRITICAL_SCORE: f64 = 50.0;

/// Mean CPU and memory headroom, in percent. Inputs are not clamped.
pub fn health_score(cpu_usage_percent: f64, mem_used_percent: f64) -> f64 {
    let cpu_score = 100.0 - cpu_usage_percent;
    let mem_score = 100.0 - mem_used_percent;
    (cpu_score + mem_score) / 2.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Normal,
    Critical,
}

impl Classification {
    pub fn of(score: f64) -> Self {
        if score < CRITICAL_SCORE {
            Self::Critical
        } else {
            Self::Normal
        }
    }

    pub fn is_critical(self) -> bool {
        matches!(self, Self::Critical)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Critical => "critical",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_is_mean_headroom() {
        for cpu in [0.0, 12.5, 50.0, 99.9, 100.0] {
            for mem in [0.0, 33.3, 75.0, 100.0] {
                let score = health_score(cpu, mem);
                assert!((score - ((100.0 - cpu) + (100.0 - mem)) / 2.0).abs() < 1e-9);
                assert_eq!(Classification::of(score).is_critical(), score < 50.0);
            }
        }
    }

    #[test]
    fn exactly_fifty_is_normal() {
        assert_eq!(health_score(50.0, 50.0), 50.0);
        assert_eq!(Classification::of(50.0), Classification::Normal);
        assert_eq!(Classification::of(49.999), Classification::Critical);
    }

    #[test]
    fn light_and_heavy_load_examples() {
        assert_eq!(health_score(10.0, 10.0), 90.0);
        assert_eq!(Classification::of(90.0), Classification::Normal);
        assert_eq!(health_score(90.0, 90.0), 10.0);
        assert_eq!(Classification::of(10.0), Classification::Critical);
    }

    #[test]
    fn out_of_range_inputs_are_not_clamped() {
        assert_eq!(health_score(-20.0, 0.0), 110.0);
        assert_eq!(health_score(150.0, 100.0), -25.0);
    }
}
