//! `Slice`: Python-style start/stop/step range resolution for LIST and
//! STR indexing (§4.1). Built directly from the spec text; the original
//! C++ source has no slice concept to ground this on.

use crate::error::{NodelError, NodelResult};

/// A slice with optional endpoints, Python semantics: negative indices
/// count from the end, `None` endpoints mean "from the start"/"to the
/// end" (direction-dependent), and the sign of `step` fixes direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slice {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

impl Slice {
    pub fn new(start: Option<i64>, stop: Option<i64>, step: Option<i64>) -> Self {
        Slice { start, stop, step }
    }

    pub fn full() -> Self {
        Slice::default()
    }

    /// Resolves this slice against a sequence of length `len`, returning
    /// the concrete (possibly empty) list of indices to visit in order.
    pub fn resolve(&self, len: usize) -> NodelResult<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(NodelError::Range("slice step must not be zero".into()));
        }
        let len_i = len as i64;

        let clamp = |v: i64| -> i64 {
            if v < 0 {
                (len_i + v).max(0)
            } else {
                v.min(len_i)
            }
        };

        let (mut start, stop) = if step > 0 {
            let start = match self.start {
                Some(s) => clamp(s),
                None => 0,
            };
            let stop = match self.stop {
                Some(s) => clamp(s),
                None => len_i,
            };
            (start, stop)
        } else {
            let start = match self.start {
                Some(s) => {
                    if s < 0 {
                        (len_i + s).max(-1)
                    } else {
                        s.min(len_i - 1)
                    }
                }
                None => len_i - 1,
            };
            let stop = match self.stop {
                Some(s) => {
                    if s < 0 {
                        (len_i + s).max(-1)
                    } else {
                        s.min(len_i - 1)
                    }
                }
                None => -1,
            };
            (start, stop)
        };

        let mut out = Vec::new();
        if step > 0 {
            while start < stop {
                out.push(start as usize);
                start += step;
            }
        } else {
            while start > stop {
                out.push(start as usize);
                start += step;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_slice() {
        let idx = Slice::full().resolve(5).unwrap();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_reverse_full_slice() {
        let s = Slice::new(None, None, Some(-1));
        let idx = s.resolve(5).unwrap();
        assert_eq!(idx, vec![4, 3, 2, 1, 0]);
    }

    #[test]
    fn test_step_two_on_six() {
        let s = Slice::new(None, None, Some(2));
        assert_eq!(s.resolve(6).unwrap(), vec![0, 2, 4]);
    }

    #[test]
    fn test_negative_indices() {
        let s = Slice::new(Some(-3), Some(-1), None);
        assert_eq!(s.resolve(5).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_step_larger_than_len_yields_one_element() {
        let s = Slice::new(None, None, Some(10));
        assert_eq!(s.resolve(3).unwrap(), vec![0]);
    }

    #[test]
    fn test_zero_step_is_range_error() {
        let s = Slice::new(None, None, Some(0));
        assert!(s.resolve(3).is_err());
    }
}
