/*
Parameter Smoothing
===================

Jumping a gain or filter cutoff from one value to another between two
samples puts a step into the waveform, which the ear hears as a click.
Live controls (volume sliders, mute buttons, cutoff knobs) therefore never
write their value directly; they set a *target*, and the parameter moves
toward it with a one-pole exponential approach:

    value[n+1] = value[n] + (target - value[n]) · (1 - e^(-1 / (tau · fs)))

After one time constant `tau` the value has covered ~63% of the distance,
after 3·tau ~95%, after 5·tau ~99.3%. The per-sample change is always a
fraction of the remaining distance, so there is never a discontinuity, and a
new target arriving mid-ramp simply bends the curve toward itself.

The coefficient depends on the sample rate and is computed once.
*/

#[derive(Debug, Clone, Copy)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
}

impl SmoothedParam {
    pub fn new(initial: f32, time_constant_secs: f64, sample_rate: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            coeff: Self::coefficient(time_constant_secs, sample_rate),
        }
    }

    fn coefficient(tau: f64, sample_rate: f32) -> f32 {
        let samples = tau * sample_rate as f64;
        if samples <= 0.0 {
            1.0
        } else {
            (1.0 - (-1.0 / samples).exp()) as f32
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coeff;
        self.current
    }

    pub fn current(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;

    #[test]
    fn reaches_63_percent_after_one_time_constant() {
        let mut p = SmoothedParam::new(0.0, 0.1, SAMPLE_RATE);
        p.set_target(1.0);

        for _ in 0..(0.1 * SAMPLE_RATE) as usize {
            p.next();
        }

        assert!((p.current() - 0.632).abs() < 0.01, "got {}", p.current());
    }

    #[test]
    fn never_jumps() {
        let mut p = SmoothedParam::new(1.0, 0.1, SAMPLE_RATE);
        p.set_target(0.0);

        let mut last = p.current();
        for _ in 0..48_000 {
            let v = p.next();
            // Largest possible step is coeff · full distance
            assert!((last - v).abs() <= p.coeff + 1e-7);
            last = v;
        }
        assert!(p.current() < 1e-3);
    }

    #[test]
    fn retarget_mid_ramp_bends_toward_new_target() {
        let mut p = SmoothedParam::new(0.0, 0.05, SAMPLE_RATE);
        p.set_target(1.0);
        for _ in 0..1_000 {
            p.next();
        }
        let mid = p.current();
        p.set_target(0.0);
        let after = p.next();
        assert!(after < mid);
    }
}
