//! Sample sources polled by the monitor on every tick.
//!
//! A source returns the current value of one variable together with the
//! time it was taken. Returning `None` means "no new reading"; the monitor
//! skips that variable for the tick.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One reading of a variable
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value: f64,
    /// Absolute time in seconds; the monitor rebases it on its own origin
    pub timestamp: f64,
}

impl Reading {
    pub fn new(value: f64, timestamp: f64) -> Self {
        Self { value, timestamp }
    }

    /// A reading stamped with the current wall-clock time
    pub fn now(value: f64) -> Self {
        Self::new(value, now_seconds())
    }
}

/// Wall-clock time in seconds since the Unix epoch
pub fn now_seconds() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + now.timestamp_subsec_nanos() as f64 * 1e-9
}

/// Something the monitor can poll for readings
pub trait SampleSource: Send {
    fn read(&mut self) -> Option<Reading>;
}

/// Closure-backed source
pub struct FnSource<F> {
    read: F,
}

impl<F> FnSource<F>
where
    F: FnMut() -> Option<Reading> + Send,
{
    pub fn new(read: F) -> Self {
        Self { read }
    }
}

impl<F> SampleSource for FnSource<F>
where
    F: FnMut() -> Option<Reading> + Send,
{
    fn read(&mut self) -> Option<Reading> {
        (self.read)()
    }
}

impl SampleSource for Box<dyn SampleSource> {
    fn read(&mut self) -> Option<Reading> {
        (**self).read()
    }
}

/// Waveform produced by a [`PatternSource`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pattern {
    Constant { value: f64 },
    Sine {
        frequency: f64,
        amplitude: f64,
        offset: f64,
    },
    /// Adds `step` each reading, wrapping between `min` and `max`
    Counter { step: f64, min: f64, max: f64 },
    Sawtooth { period: f64, amplitude: f64 },
    Square { period: f64, amplitude: f64 },
}

impl Default for Pattern {
    fn default() -> Self {
        Pattern::Sine {
            frequency: 1.0,
            amplitude: 1.0,
            offset: 0.0,
        }
    }
}

/// Synthetic source for demos and tests.
///
/// Time advances by `period` per reading from `start`, independent of the
/// wall clock, so the output is deterministic.
#[derive(Debug, Clone)]
pub struct PatternSource {
    pattern: Pattern,
    start: f64,
    period: f64,
    ticks: u64,
    counter: f64,
    /// Every n-th reading returns `None`
    dropout_every: Option<u64>,
}

impl PatternSource {
    pub fn new(pattern: Pattern, start: f64, period: f64) -> Self {
        let counter = match pattern {
            Pattern::Counter { min, .. } => min,
            _ => 0.0,
        };
        Self {
            pattern,
            start,
            period,
            ticks: 0,
            counter,
            dropout_every: None,
        }
    }

    /// Skip every `n`-th reading (0 disables dropouts)
    pub fn with_dropout(mut self, n: u64) -> Self {
        self.dropout_every = (n > 0).then_some(n);
        self
    }

    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Value of the pattern at `elapsed` seconds from the start
    fn value_at(&mut self, elapsed: f64) -> f64 {
        match self.pattern {
            Pattern::Constant { value } => value,
            Pattern::Sine {
                frequency,
                amplitude,
                offset,
            } => offset + amplitude * (2.0 * PI * frequency * elapsed).sin(),
            Pattern::Counter { step, min, max } => {
                let value = self.counter;
                self.counter += step;
                if self.counter > max {
                    self.counter = min;
                } else if self.counter < min {
                    self.counter = max;
                }
                value
            }
            Pattern::Sawtooth { period, amplitude } => amplitude * ((elapsed % period) / period),
            Pattern::Square { period, amplitude } => {
                if elapsed % period < period / 2.0 {
                    amplitude
                } else {
                    -amplitude
                }
            }
        }
    }
}

impl SampleSource for PatternSource {
    fn read(&mut self) -> Option<Reading> {
        let tick = self.ticks;
        self.ticks += 1;
        if let Some(n) = self.dropout_every {
            if (tick + 1) % n == 0 {
                return None;
            }
        }
        let elapsed = tick as f64 * self.period;
        let value = self.value_at(elapsed);
        Some(Reading::new(value, self.start + elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_wraps() {
        let mut source = PatternSource::new(
            Pattern::Counter {
                step: 1.0,
                min: 0.0,
                max: 2.0,
            },
            0.0,
            0.1,
        );
        let values: Vec<f64> = (0..5).map(|_| source.read().unwrap().value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_timestamps_advance_by_period() {
        let mut source = PatternSource::new(Pattern::Constant { value: 3.0 }, 100.0, 0.5);
        let a = source.read().unwrap();
        let b = source.read().unwrap();
        assert_eq!(a.timestamp, 100.0);
        assert_eq!(b.timestamp, 100.5);
        assert_eq!(b.value, 3.0);
    }

    #[test]
    fn test_square_and_sawtooth() {
        let mut square = PatternSource::new(
            Pattern::Square {
                period: 1.0,
                amplitude: 2.0,
            },
            0.0,
            0.25,
        );
        let values: Vec<f64> = (0..4).map(|_| square.read().unwrap().value).collect();
        assert_eq!(values, vec![2.0, 2.0, -2.0, -2.0]);

        let mut saw = PatternSource::new(
            Pattern::Sawtooth {
                period: 1.0,
                amplitude: 4.0,
            },
            0.0,
            0.25,
        );
        let values: Vec<f64> = (0..3).map(|_| saw.read().unwrap().value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_dropout_skips_readings() {
        let mut source = PatternSource::new(Pattern::default(), 0.0, 0.1).with_dropout(3);
        let got: Vec<bool> = (0..6).map(|_| source.read().is_some()).collect();
        assert_eq!(got, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_fn_source() {
        let mut n = 0.0;
        let mut source = FnSource::new(move || {
            n += 1.0;
            Some(Reading::new(n, n))
        });
        assert_eq!(source.read().unwrap().value, 1.0);
        assert_eq!(source.read().unwrap().value, 2.0);
    }

    #[test]
    fn test_pattern_serde() {
        let json = serde_json::to_string(&Pattern::Constant { value: 1.5 }).unwrap();
        assert_eq!(json, r#"{"kind":"constant","value":1.5}"#);
        let back: Pattern = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Pattern::Constant { value: 1.5 });
    }
}
