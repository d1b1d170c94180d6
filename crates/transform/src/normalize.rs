//! Numeric clamping shared by the project and job transformers.
//!
//! Out-of-range values are pulled to the nearest bound instead of being
//! rejected. Every adjustment is logged with the original value.
use messages::{PhaseProgress, PhaseProgressInput, Progress, ProgressInput};
use tracing::warn;

/// Clamp a percentage into `[0, 100]`. In-range values pass through untouched.
pub fn clamp_percentage(field: &'static str, value: f64) -> f64 {
    let clamped = if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    };
    if clamped != value {
        warn!(field, original = value, clamped, "percentage_clamped");
    }
    clamped
}

/// Clamp an ETA to be non-negative.
pub fn clamp_eta(value: f64) -> f64 {
    if value >= 0.0 {
        return value;
    }
    warn!(field = "eta", original = value, clamped = 0.0, "eta_clamped");
    0.0
}

/// Normalize a progress block. `errors` is moved into the output, and a
/// missing list becomes an empty one.
pub fn transform_progress(input: ProgressInput) -> Progress {
    Progress {
        current: input.current,
        total: input.total,
        percentage: clamp_percentage("progress.percentage", input.percentage),
        eta: clamp_eta(input.eta),
        errors: input.errors.unwrap_or_default(),
    }
}

pub fn transform_phase_progress(field: &'static str, input: PhaseProgressInput) -> PhaseProgress {
    PhaseProgress {
        total: input.total,
        done: input.done,
        errors: input.errors,
        progress_percent: clamp_percentage(field, input.progress_percent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_is_clamped_into_range() {
        for (input, expected) in [
            (-5.0, 0.0),
            (-0.001, 0.0),
            (100.5, 100.0),
            (1e9, 100.0),
            (f64::NAN, 0.0),
        ] {
            assert_eq!(clamp_percentage("p", input), expected, "{input}");
        }
    }

    #[test]
    fn in_range_percentage_is_unchanged() {
        for value in [0.0, 0.1, 33.333_333, 50.0, 99.999, 100.0] {
            assert_eq!(clamp_percentage("p", value), value);
        }
    }

    #[test]
    fn negative_eta_becomes_zero() {
        assert_eq!(clamp_eta(-1.0), 0.0);
        assert_eq!(clamp_eta(-0.5), 0.0);
        assert_eq!(clamp_eta(0.0), 0.0);
        assert_eq!(clamp_eta(42.5), 42.5);
    }

    #[test]
    fn missing_errors_become_empty_list() {
        let progress = transform_progress(ProgressInput {
            current: 1,
            total: 2,
            percentage: 50.0,
            eta: 10.0,
            errors: None,
        });
        assert!(progress.errors.is_empty());
    }

    #[test]
    fn errors_are_carried_over() {
        let progress = transform_progress(ProgressInput {
            current: 1,
            total: 2,
            percentage: 120.0,
            eta: -3.0,
            errors: Some(vec!["timeout".into(), "404".into()]),
        });
        assert_eq!(progress.errors, vec!["timeout".to_string(), "404".to_string()]);
        assert_eq!(progress.percentage, 100.0);
        assert_eq!(progress.eta, 0.0);
    }

    #[test]
    fn phase_progress_keeps_counts() {
        let phase = transform_phase_progress(
            "payload.crawl.progress_percent",
            PhaseProgressInput {
                total: 10,
                done: 4,
                errors: 1,
                progress_percent: -2.0,
            },
        );
        assert_eq!((phase.total, phase.done, phase.errors), (10, 4, 1));
        assert_eq!(phase.progress_percent, 0.0);
    }
}
