/*
Parameter Curves
================

Note voices do not run an ADSR state machine. Their gain and pitch follow a
fixed curve that is fully known at the moment the note is scheduled, so a
curve is plain data evaluated against the time elapsed since the note's
scheduled start:

  Constant(v)                      v forever

  Exponential { from, to, secs }   geometric glide from `from` to `to` over
                                   `secs`, then holds `to`

                                     v(t) = from · (to / from)^(t / secs)

  HoldThenTarget { value, hold, target, tau }
                                   holds `value` until `hold`, then decays
                                   toward `target` with time constant `tau`

                                     v(t) = target + (value - target) · e^(-(t - hold) / tau)

Why exponential
---------------
Loudness and pitch are perceived logarithmically. A linear gain ramp from 1.0
to 0.0 sounds like it hangs and then drops off a cliff; a geometric one
sounds like an even fade. The pitch drop of the kick is the same idea: equal
ratios per unit time sound like a smooth fall.

An exponential glide cannot start or end at zero (the ratio is undefined), so
callers aim for a small "near-zero" value like 0.01 instead. `from <= 0`
evaluates to silence.

Because the curve is a pure function of elapsed time, a note that arrives
late (its start is already in the past when the audio thread sees it) picks
up exactly where the curve would be, with no special casing.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Constant(f32),
    Exponential { from: f32, to: f32, secs: f32 },
    HoldThenTarget { value: f32, hold: f32, target: f32, tau: f32 },
}

impl Curve {
    /// Curve value `elapsed` seconds after the note's scheduled start.
    #[inline]
    pub fn value_at(&self, elapsed: f32) -> f32 {
        let t = elapsed.max(0.0);
        match *self {
            Curve::Constant(v) => v,
            Curve::Exponential { from, to, secs } => {
                if from <= 0.0 || to <= 0.0 {
                    return 0.0;
                }
                if secs <= 0.0 || t >= secs {
                    return to;
                }
                from * (to / from).powf(t / secs)
            }
            Curve::HoldThenTarget { value, hold, target, tau } => {
                if t <= hold {
                    value
                } else if tau <= 0.0 {
                    target
                } else {
                    target + (value - target) * (-(t - hold) / tau).exp()
                }
            }
        }
    }

    /// Value at the scheduled start.
    pub fn initial(&self) -> f32 {
        self.value_at(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponential_hits_endpoints() {
        let curve = Curve::Exponential { from: 150.0, to: 0.01, secs: 0.5 };

        assert!((curve.value_at(0.0) - 150.0).abs() < 1e-3);
        assert!((curve.value_at(0.5) - 0.01).abs() < 1e-6);
        assert!((curve.value_at(2.0) - 0.01).abs() < 1e-6);
    }

    #[test]
    fn exponential_is_geometric_at_midpoint() {
        let curve = Curve::Exponential { from: 1.0, to: 0.01, secs: 0.5 };
        // Halfway in time = geometric mean of the endpoints
        assert!((curve.value_at(0.25) - 0.1).abs() < 1e-4);
    }

    #[test]
    fn exponential_is_monotonic() {
        let curve = Curve::Exponential { from: 0.8, to: 0.01, secs: 0.5 };
        let mut last = f32::INFINITY;
        for i in 0..100 {
            let v = curve.value_at(i as f32 * 0.005);
            assert!(v <= last);
            last = v;
        }
    }

    #[test]
    fn exponential_from_zero_is_silent() {
        let curve = Curve::Exponential { from: 0.0, to: 0.01, secs: 0.5 };
        assert_eq!(curve.value_at(0.1), 0.0);
    }

    #[test]
    fn hold_then_target_holds_then_decays() {
        let curve = Curve::HoldThenTarget { value: 0.5, hold: 0.2, target: 0.0, tau: 0.1 };

        assert_eq!(curve.value_at(0.0), 0.5);
        assert_eq!(curve.value_at(0.2), 0.5);
        // One time constant later: 1/e of the distance remains
        let one_tau = curve.value_at(0.3);
        assert!((one_tau - 0.5 * (-1.0f32).exp()).abs() < 1e-4);
        assert!(curve.value_at(1.0) < 0.001);
    }

    #[test]
    fn negative_elapsed_clamps_to_start() {
        let curve = Curve::Exponential { from: 1.0, to: 0.01, secs: 0.5 };
        assert_eq!(curve.value_at(-1.0), curve.initial());
    }
}
