//! Tagged scalar time and sample-coordinate computation.
//!
//! `FloatOrUint` represents a single scalar that is tagged as either
//! floating-point or unsigned-integer time, never both. All arithmetic
//! on it asserts the two operands share a discriminator rather than
//! silently coercing one into the other.

use std::cmp::Ordering;

/// A time value tagged as either floating-point or unsigned-integer.
///
/// # Examples
///
/// ```
/// use omnicache::FloatOrUint;
///
/// let a = FloatOrUint::from_float(1.5);
/// let b = FloatOrUint::from_float(0.5);
/// assert_eq!(a.add(b), FloatOrUint::from_float(2.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum FloatOrUint {
    Float(f32),
    Uint(u32),
}

impl FloatOrUint {
    pub fn from_float(val: f32) -> Self {
        FloatOrUint::Float(val)
    }

    pub fn from_uint(val: u32) -> Self {
        FloatOrUint::Uint(val)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, FloatOrUint::Float(_))
    }

    fn assert_same_tag(&self, other: &FloatOrUint) {
        assert_eq!(
            self.is_float(),
            other.is_float(),
            "FloatOrUint: mismatched time-type tags in arithmetic/comparison"
        );
    }

    pub fn add(&self, other: FloatOrUint) -> FloatOrUint {
        self.assert_same_tag(&other);
        match (*self, other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => FloatOrUint::Float(a + b),
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => FloatOrUint::Uint(a + b),
            _ => unreachable!(),
        }
    }

    pub fn sub(&self, other: FloatOrUint) -> FloatOrUint {
        self.assert_same_tag(&other);
        match (*self, other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => FloatOrUint::Float(a - b),
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => FloatOrUint::Uint(a.saturating_sub(b)),
            _ => unreachable!(),
        }
    }

    pub fn div(&self, other: FloatOrUint) -> FloatOrUint {
        self.assert_same_tag(&other);
        match (*self, other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => FloatOrUint::Float(a / b),
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => FloatOrUint::Uint(a / b),
            _ => unreachable!(),
        }
    }

    pub fn rem(&self, other: FloatOrUint) -> FloatOrUint {
        self.assert_same_tag(&other);
        match (*self, other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => FloatOrUint::Float(a % b),
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => FloatOrUint::Uint(a % b),
            _ => unreachable!(),
        }
    }

    /// `floor(self / other)` as a `u32` index. Only meaningful for the
    /// `index = floor(delta / tstep)` computation in `gen_sample_time`.
    pub fn floor_div_to_u32(&self, other: FloatOrUint) -> u32 {
        self.assert_same_tag(&other);
        match (*self, other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => (a / b).floor() as u32,
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => a / b,
            _ => unreachable!(),
        }
    }

    /// Float-equality-within-epsilon for floats, exact equality for uints.
    pub fn approx_eq(&self, other: &FloatOrUint) -> bool {
        self.assert_same_tag(other);
        match (*self, *other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => (a - b).abs() <= f32::EPSILON * 8.0,
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => a == b,
            _ => unreachable!(),
        }
    }

    pub fn lt(&self, other: &FloatOrUint) -> bool {
        self.assert_same_tag(other);
        match (*self, *other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => a < b,
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => a < b,
            _ => unreachable!(),
        }
    }

    pub fn le(&self, other: &FloatOrUint) -> bool {
        self.lt(other) || self.approx_eq(other)
    }

    pub fn gt(&self, other: &FloatOrUint) -> bool {
        self.assert_same_tag(other);
        match (*self, *other) {
            (FloatOrUint::Float(a), FloatOrUint::Float(b)) => a > b,
            (FloatOrUint::Uint(a), FloatOrUint::Uint(b)) => a > b,
            _ => unreachable!(),
        }
    }

    /// True if this is the float-valued zero for its tag (used to
    /// distinguish root samples, whose `time_offset` is exactly zero).
    pub fn is_zero(&self) -> bool {
        match *self {
            FloatOrUint::Float(a) => a == 0.0,
            FloatOrUint::Uint(a) => a == 0,
        }
    }
}

impl PartialEq for FloatOrUint {
    fn eq(&self, other: &Self) -> bool {
        self.approx_eq(other)
    }
}

impl PartialOrd for FloatOrUint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.assert_same_tag(other);
        if self.approx_eq(other) {
            Some(Ordering::Equal)
        } else if self.lt(other) {
            Some(Ordering::Less)
        } else {
            Some(Ordering::Greater)
        }
    }
}

/// Discrete vs. continuous time, mirrors `OmniTimeType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeType {
    Int,
    Float,
}

impl TimeType {
    pub fn is_float(&self) -> bool {
        matches!(self, TimeType::Float)
    }

    /// The zero value tagged for this time type, used to express "this
    /// sample is a root" and to bound `time_step` to strictly positive.
    pub fn zero(&self) -> FloatOrUint {
        if self.is_float() {
            FloatOrUint::from_float(0.0)
        } else {
            FloatOrUint::from_uint(0)
        }
    }
}

/// Resolved coordinate of a time value within a cache: which root slot it
/// falls in, and its offset within that slot's step. `None` stands in for
/// the original's `ttype = OMNI_TIME_INVALID` marker — "no such sample".
#[derive(Debug, Clone, Copy)]
pub struct SampleTime {
    pub index: u32,
    pub offset: FloatOrUint,
}

/// Computes the sample-array index and in-step offset for `time`, or
/// `None` if `time` falls outside `[tinitial, tfinal]`.
///
/// # Panics
///
/// Panics (via `assert!`) if `time`'s tag does not match `time_type`.
pub fn gen_sample_time(
    time_type: TimeType,
    tinitial: FloatOrUint,
    tfinal: FloatOrUint,
    tstep: FloatOrUint,
    time: FloatOrUint,
) -> Option<SampleTime> {
    assert_eq!(
        time_type.is_float(),
        time.is_float(),
        "gen_sample_time: time tag does not match cache time type"
    );

    if time.lt(&tinitial) || time.gt(&tfinal) {
        return None;
    }

    let delta = time.sub(tinitial);
    let index = delta.floor_div_to_u32(tstep);
    let offset = delta.rem(tstep);

    Some(SampleTime { index, offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_time_has_zero_offset() {
        let st = gen_sample_time(
            TimeType::Float,
            FloatOrUint::from_float(0.0),
            FloatOrUint::from_float(10.0),
            FloatOrUint::from_float(1.0),
            FloatOrUint::from_float(3.0),
        )
        .unwrap();
        assert_eq!(st.index, 3);
        assert!(st.offset.is_zero());
    }

    #[test]
    fn sub_sample_has_nonzero_offset() {
        let st = gen_sample_time(
            TimeType::Float,
            FloatOrUint::from_float(0.0),
            FloatOrUint::from_float(10.0),
            FloatOrUint::from_float(1.0),
            FloatOrUint::from_float(0.5),
        )
        .unwrap();
        assert_eq!(st.index, 0);
        assert_eq!(st.offset, FloatOrUint::from_float(0.5));
    }

    #[test]
    fn out_of_range_is_none() {
        assert!(gen_sample_time(
            TimeType::Float,
            FloatOrUint::from_float(0.0),
            FloatOrUint::from_float(10.0),
            FloatOrUint::from_float(1.0),
            FloatOrUint::from_float(10.5),
        )
        .is_none());

        assert!(gen_sample_time(
            TimeType::Float,
            FloatOrUint::from_float(0.0),
            FloatOrUint::from_float(10.0),
            FloatOrUint::from_float(1.0),
            FloatOrUint::from_float(-0.1),
        )
        .is_none());
    }

    #[test]
    fn boundary_final_time_is_valid() {
        let st = gen_sample_time(
            TimeType::Float,
            FloatOrUint::from_float(0.0),
            FloatOrUint::from_float(10.0),
            FloatOrUint::from_float(1.0),
            FloatOrUint::from_float(10.0),
        )
        .unwrap();
        assert_eq!(st.index, 10);
        assert!(st.offset.is_zero());
    }

    #[test]
    #[should_panic]
    fn mismatched_tags_panic() {
        FloatOrUint::from_float(1.0).add(FloatOrUint::from_uint(1));
    }

    #[test]
    fn int_time_type_works() {
        let st = gen_sample_time(
            TimeType::Int,
            FloatOrUint::from_uint(0),
            FloatOrUint::from_uint(100),
            FloatOrUint::from_uint(10),
            FloatOrUint::from_uint(35),
        )
        .unwrap();
        assert_eq!(st.index, 3);
        assert_eq!(st.offset, FloatOrUint::from_uint(5));
    }
}
