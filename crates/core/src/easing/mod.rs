//! Closed-form easing curves.
//!
//! Every curve maps normalised progress in `[0, 1]` to eased progress. The
//! endpoints are pinned: `ease(0, k) == 0` and `ease(1, k) == 1` for every
//! kind. Back and elastic curves leave `[0, 1]` between the endpoints and the
//! output is never clamped here; consumers that need a bounded value clamp it
//! themselves.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;
const BACK_C3: f64 = BACK_C1 + 1.0;
const ELASTIC_C4: f64 = (2.0 * PI) / 3.0;
const ELASTIC_C5: f64 = (2.0 * PI) / 4.5;
const BOUNCE_N1: f64 = 7.5625;
const BOUNCE_D1: f64 = 2.75;

/// Identifies one easing curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingKind {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InBack,
    OutBack,
    InOutBack,
    InElastic,
    OutElastic,
    InOutElastic,
    InBounce,
    OutBounce,
    InOutBounce,
}

impl EasingKind {
    pub const ALL: [EasingKind; 31] = [
        EasingKind::Linear,
        EasingKind::InQuad,
        EasingKind::OutQuad,
        EasingKind::InOutQuad,
        EasingKind::InCubic,
        EasingKind::OutCubic,
        EasingKind::InOutCubic,
        EasingKind::InQuart,
        EasingKind::OutQuart,
        EasingKind::InOutQuart,
        EasingKind::InQuint,
        EasingKind::OutQuint,
        EasingKind::InOutQuint,
        EasingKind::InSine,
        EasingKind::OutSine,
        EasingKind::InOutSine,
        EasingKind::InExpo,
        EasingKind::OutExpo,
        EasingKind::InOutExpo,
        EasingKind::InCirc,
        EasingKind::OutCirc,
        EasingKind::InOutCirc,
        EasingKind::InBack,
        EasingKind::OutBack,
        EasingKind::InOutBack,
        EasingKind::InElastic,
        EasingKind::OutElastic,
        EasingKind::InOutElastic,
        EasingKind::InBounce,
        EasingKind::OutBounce,
        EasingKind::InOutBounce,
    ];

    /// Back and elastic curves deliberately leave `[0, 1]` mid-transition.
    pub fn is_overshooting(self) -> bool {
        matches!(
            self,
            EasingKind::InBack
                | EasingKind::OutBack
                | EasingKind::InOutBack
                | EasingKind::InElastic
                | EasingKind::OutElastic
                | EasingKind::InOutElastic
        )
    }
}

/// Applies the easing curve `kind` to progress `t`.
///
/// Progress outside `[0, 1]` (and NaN) is pinned to the nearest endpoint.
pub fn ease(t: f64, kind: EasingKind) -> f64 {
    if !(t > 0.0) {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    match kind {
        EasingKind::Linear => t,
        EasingKind::InQuad => power_in(t, 2),
        EasingKind::OutQuad => power_out(t, 2),
        EasingKind::InOutQuad => power_in_out(t, 2),
        EasingKind::InCubic => power_in(t, 3),
        EasingKind::OutCubic => power_out(t, 3),
        EasingKind::InOutCubic => power_in_out(t, 3),
        EasingKind::InQuart => power_in(t, 4),
        EasingKind::OutQuart => power_out(t, 4),
        EasingKind::InOutQuart => power_in_out(t, 4),
        EasingKind::InQuint => power_in(t, 5),
        EasingKind::OutQuint => power_out(t, 5),
        EasingKind::InOutQuint => power_in_out(t, 5),
        EasingKind::InSine => 1.0 - (t * PI / 2.0).cos(),
        EasingKind::OutSine => (t * PI / 2.0).sin(),
        EasingKind::InOutSine => -((PI * t).cos() - 1.0) / 2.0,
        EasingKind::InExpo => 2f64.powf(10.0 * t - 10.0),
        EasingKind::OutExpo => 1.0 - 2f64.powf(-10.0 * t),
        EasingKind::InOutExpo => {
            if t < 0.5 {
                2f64.powf(20.0 * t - 10.0) / 2.0
            } else {
                (2.0 - 2f64.powf(-20.0 * t + 10.0)) / 2.0
            }
        }
        EasingKind::InCirc => 1.0 - (1.0 - t * t).sqrt(),
        EasingKind::OutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
        EasingKind::InOutCirc => {
            if t < 0.5 {
                (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
            } else {
                ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
            }
        }
        EasingKind::InBack => BACK_C3 * t * t * t - BACK_C1 * t * t,
        EasingKind::OutBack => {
            1.0 + BACK_C3 * (t - 1.0).powi(3) + BACK_C1 * (t - 1.0).powi(2)
        }
        EasingKind::InOutBack => {
            if t < 0.5 {
                ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
            } else {
                ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0)
                    / 2.0
            }
        }
        EasingKind::InElastic => {
            -(2f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * ELASTIC_C4).sin()
        }
        EasingKind::OutElastic => {
            2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * ELASTIC_C4).sin() + 1.0
        }
        EasingKind::InOutElastic => {
            if t < 0.5 {
                -(2f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
            } else {
                (2f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * ELASTIC_C5).sin()) / 2.0
                    + 1.0
            }
        }
        EasingKind::InBounce => 1.0 - bounce_out(1.0 - t),
        EasingKind::OutBounce => bounce_out(t),
        EasingKind::InOutBounce => {
            if t < 0.5 {
                (1.0 - bounce_out(1.0 - 2.0 * t)) / 2.0
            } else {
                (1.0 + bounce_out(2.0 * t - 1.0)) / 2.0
            }
        }
    }
}

fn power_in(t: f64, exponent: i32) -> f64 {
    t.powi(exponent)
}

fn power_out(t: f64, exponent: i32) -> f64 {
    1.0 - (1.0 - t).powi(exponent)
}

fn power_in_out(t: f64, exponent: i32) -> f64 {
    if t < 0.5 {
        2f64.powi(exponent - 1) * t.powi(exponent)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(exponent) / 2.0
    }
}

fn bounce_out(t: f64) -> f64 {
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_pinned_for_every_kind() {
        for kind in EasingKind::ALL {
            assert_eq!(ease(0.0, kind), 0.0, "{kind:?} at 0");
            assert_eq!(ease(1.0, kind), 1.0, "{kind:?} at 1");
        }
    }

    #[test]
    fn non_overshooting_kinds_stay_in_unit_range() {
        for kind in EasingKind::ALL.iter().copied().filter(|k| !k.is_overshooting()) {
            for step in 0..=100 {
                let value = ease(step as f64 / 100.0, kind);
                assert!(
                    (-1e-9..=1.0 + 1e-9).contains(&value),
                    "{kind:?} left [0,1]: {value}"
                );
            }
        }
    }

    #[test]
    fn back_curves_overshoot() {
        assert!(ease(0.2, EasingKind::InBack) < 0.0);
        assert!(ease(0.8, EasingKind::OutBack) > 1.0);
    }

    #[test]
    fn elastic_out_overshoots_past_one() {
        let peak = (1..100)
            .map(|step| ease(step as f64 / 100.0, EasingKind::OutElastic))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn in_out_curves_are_symmetric_at_midpoint() {
        for kind in [
            EasingKind::InOutQuad,
            EasingKind::InOutCubic,
            EasingKind::InOutSine,
            EasingKind::InOutCirc,
            EasingKind::InOutBounce,
        ] {
            assert!((ease(0.5, kind) - 0.5).abs() < 1e-9, "{kind:?}");
        }
    }

    #[test]
    fn progress_outside_unit_range_is_pinned() {
        assert_eq!(ease(-3.0, EasingKind::OutCubic), 0.0);
        assert_eq!(ease(7.0, EasingKind::InElastic), 1.0);
        assert_eq!(ease(f64::NAN, EasingKind::Linear), 0.0);
    }

    #[test]
    fn serialises_as_snake_case() {
        let json = serde_json::to_string(&EasingKind::InOutQuint).unwrap();
        assert_eq!(json, "\"in_out_quint\"");
    }
}
