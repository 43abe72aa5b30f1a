//! Signal framing
//!
//! Slices a sample sequence into overlapping analysis frames. The step may
//! be fractional: frame starts are spread evenly over the signal and rounded
//! to whole samples, so the first frame starts at sample 0 and the last one
//! ends at the final sample. Spacing between starts is not constant.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FramingError {
    #[error("frame length {frame_len} exceeds signal length {signal_len}")]
    InvalidFrameLength { frame_len: usize, signal_len: usize },

    #[error("frame step must be a positive number of samples, got {0}")]
    InvalidStep(f64),

    #[error("frame length must be at least one sample")]
    EmptyFrame,
}

/// Frames borrowed from a signal
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    signal: &'a [f64],
    frame_len: usize,
    starts: Vec<usize>,
}

impl<'a> Frames<'a> {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// First sample of each frame
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }

    pub fn get(&self, index: usize) -> Option<&'a [f64]> {
        let start = *self.starts.get(index)?;
        self.signal.get(start..start + self.frame_len)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [f64]> + '_ {
        let signal = self.signal;
        let frame_len = self.frame_len;
        self.starts
            .iter()
            .map(move |&start| &signal[start..start + frame_len])
    }
}

/// Frame `signal` into windows of `frame_len` samples every `frame_step`
/// samples.
pub fn frame_signal(
    signal: &[f64],
    frame_len: usize,
    frame_step: f64,
) -> Result<Frames<'_>, FramingError> {
    if frame_len == 0 {
        return Err(FramingError::EmptyFrame);
    }
    if !(frame_step > 0.0) || !frame_step.is_finite() {
        return Err(FramingError::InvalidStep(frame_step));
    }
    if frame_len > signal.len() {
        return Err(FramingError::InvalidFrameLength {
            frame_len,
            signal_len: signal.len(),
        });
    }

    let last_start = signal.len() - frame_len;
    let count = 1 + (last_start as f64 / frame_step).round_ties_even() as usize;

    Ok(Frames {
        signal,
        frame_len,
        starts: spread_starts(last_start, count),
    })
}

/// `count` evenly spaced offsets over `[0, last]`, rounded half to even
fn spread_starts(last: usize, count: usize) -> Vec<usize> {
    if count <= 1 {
        return vec![0];
    }

    let spacing = last as f64 / (count - 1) as f64;
    let mut starts: Vec<usize> = (0..count)
        .map(|i| (i as f64 * spacing).round_ties_even() as usize)
        .collect();
    // the final start is pinned to `last` regardless of rounding drift
    starts[count - 1] = last;
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| i as f64).collect()
    }

    #[test]
    fn test_integer_step() {
        let signal = ramp(10);
        let frames = frame_signal(&signal, 4, 2.0).unwrap();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames.starts(), &[0, 2, 4, 6]);
        assert_eq!(frames.get(3).unwrap(), &[6.0, 7.0, 8.0, 9.0]);
    }

    #[test]
    fn test_fractional_step_aligns_edges() {
        let signal = ramp(100);
        let frames = frame_signal(&signal, 10, 7.5).unwrap();

        // 1 + round(90 / 7.5) = 13
        assert_eq!(frames.len(), 13);
        assert_eq!(frames.starts()[0], 0);
        assert_eq!(*frames.starts().last().unwrap(), 90);

        let last = frames.iter().last().unwrap();
        assert_eq!(last[last.len() - 1], 99.0);
        assert!(frames.iter().all(|f| f.len() == 10));
    }

    #[test]
    fn test_rounding_ties_to_even() {
        // 1 + round(5 / 2) = 1 + 2 under ties-to-even
        let signal = ramp(6);
        let frames = frame_signal(&signal, 1, 2.0).unwrap();
        assert_eq!(frames.len(), 3);
        // starts 0, 2.5, 5 -> 0, 2, 5
        assert_eq!(frames.starts(), &[0, 2, 5]);
    }

    #[test]
    fn test_frame_equals_signal() {
        let signal = ramp(8);
        let frames = frame_signal(&signal, 8, 3.0).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.get(0).unwrap().len(), 8);
        assert!(frames.get(1).is_none());
    }

    #[test]
    fn test_frame_too_long() {
        let signal = ramp(5);
        assert_eq!(
            frame_signal(&signal, 6, 1.0).unwrap_err(),
            FramingError::InvalidFrameLength {
                frame_len: 6,
                signal_len: 5
            }
        );
    }

    #[test]
    fn test_invalid_parameters() {
        let signal = ramp(5);
        assert_eq!(frame_signal(&signal, 0, 1.0).unwrap_err(), FramingError::EmptyFrame);
        assert!(matches!(
            frame_signal(&signal, 2, 0.0),
            Err(FramingError::InvalidStep(_))
        ));
        assert!(matches!(
            frame_signal(&signal, 2, f64::NAN),
            Err(FramingError::InvalidStep(_))
        ));
    }
}
