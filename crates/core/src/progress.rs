//! Progress reporting with cooperative cancellation

/// Receives completion fractions in `[0, 1]` with an optional message.
///
/// Returning `false` asks the running operation to stop as soon as possible.
pub trait Progress {
    fn report(&mut self, fraction: f64, message: &str) -> bool;
}

impl<F> Progress for F
where
    F: FnMut(f64, &str) -> bool,
{
    fn report(&mut self, fraction: f64, message: &str) -> bool {
        self(fraction, message)
    }
}

/// Progress sink that ignores every report and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _fraction: f64, _message: &str) -> bool {
        true
    }
}

/// Maps a nested operation's `[0, 1]` onto `[start, end]` of a parent.
pub struct ScaledProgress<'a> {
    inner: &'a mut dyn Progress,
    start: f64,
    end: f64,
}

impl<'a> ScaledProgress<'a> {
    pub fn new(inner: &'a mut dyn Progress, start: f64, end: f64) -> Self {
        Self { inner, start, end }
    }
}

impl Progress for ScaledProgress<'_> {
    fn report(&mut self, fraction: f64, message: &str) -> bool {
        let f = fraction.clamp(0.0, 1.0);
        self.inner
            .report(self.start + (self.end - self.start) * f, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_closure_progress() {
        let mut seen = Vec::new();
        let mut cb = |f: f64, _: &str| {
            seen.push(f);
            f < 0.5
        };
        assert!(cb.report(0.25, ""));
        assert!(!cb.report(0.75, ""));
        assert_eq!(seen, vec![0.25, 0.75]);
    }

    #[test]
    fn test_scaled_progress() {
        let mut last = 0.0;
        let mut cb = |f: f64, _: &str| {
            last = f;
            true
        };
        {
            let mut scaled = ScaledProgress::new(&mut cb, 0.5, 0.75);
            assert!(scaled.report(0.5, "half"));
        }
        assert_relative_eq!(last, 0.625);
    }
}
