//! Scalar types a Green's function can hold.

use std::fmt::Debug;
use std::ops::{AddAssign, DivAssign, MulAssign, Neg, SubAssign};

use ndarray::{LinalgScalar, ScalarOperand};
use num_complex::Complex64;

/// Element type of container data: `f64` for real-valued functions and
/// `Complex64` otherwise.
pub trait Scalar:
    LinalgScalar
    + ScalarOperand
    + Debug
    + Default
    + PartialEq
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + Send
    + Sync
    + 'static
{
    /// Whether the type carries an imaginary part.
    const IS_COMPLEX: bool;

    /// Short name used in error messages.
    const DTYPE: &'static str;

    /// Real number as this type.
    fn from_f64(val: f64) -> Self;

    /// `None` when a real type would lose a nonzero imaginary part.
    fn from_complex(z: Complex64) -> Option<Self>;

    /// Widen to a complex number.
    fn to_complex(self) -> Complex64;

    /// Real part.
    fn real_f64(self) -> f64;

    /// Imaginary part, zero for real types.
    fn imag_f64(self) -> f64;

    /// Modulus.
    fn abs_f64(self) -> f64;

    /// Complex conjugate.
    fn conjugate(self) -> Self;

    /// Compact rendering used when printing expressions.
    fn format_value(self) -> String;
}

impl Scalar for f64 {
    const IS_COMPLEX: bool = false;
    const DTYPE: &'static str = "f64";

    fn from_f64(val: f64) -> Self {
        val
    }

    fn from_complex(z: Complex64) -> Option<Self> {
        (z.im == 0.0).then_some(z.re)
    }

    fn to_complex(self) -> Complex64 {
        Complex64::new(self, 0.0)
    }

    fn real_f64(self) -> f64 {
        self
    }

    fn imag_f64(self) -> f64 {
        0.0
    }

    fn abs_f64(self) -> f64 {
        self.abs()
    }

    fn conjugate(self) -> Self {
        self
    }

    fn format_value(self) -> String {
        format!("{self:?}")
    }
}

impl Scalar for Complex64 {
    const IS_COMPLEX: bool = true;
    const DTYPE: &'static str = "Complex64";

    fn from_f64(val: f64) -> Self {
        Complex64::new(val, 0.0)
    }

    fn from_complex(z: Complex64) -> Option<Self> {
        Some(z)
    }

    fn to_complex(self) -> Complex64 {
        self
    }

    fn real_f64(self) -> f64 {
        self.re
    }

    fn imag_f64(self) -> f64 {
        self.im
    }

    fn abs_f64(self) -> f64 {
        self.norm()
    }

    fn conjugate(self) -> Self {
        self.conj()
    }

    fn format_value(self) -> String {
        if self.im == 0.0 {
            format!("{:?}", self.re)
        } else {
            format!("({self})")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_rejects_imaginary_part() {
        assert_eq!(f64::from_complex(Complex64::new(1.5, 0.0)), Some(1.5));
        assert_eq!(f64::from_complex(Complex64::new(1.5, 0.1)), None);
    }

    #[test]
    fn test_complex_helpers() {
        let z = Complex64::new(3.0, -4.0);
        assert_eq!(z.abs_f64(), 5.0);
        assert_eq!(Scalar::conjugate(z), Complex64::new(3.0, 4.0));
        assert_eq!(z.imag_f64(), -4.0);
        assert!(Complex64::IS_COMPLEX);
        assert!(!f64::IS_COMPLEX);
    }

    #[test]
    fn test_format_value() {
        assert_eq!(2.0f64.format_value(), "2.0");
        assert_eq!(Complex64::new(0.5, 0.0).format_value(), "0.5");
        assert_eq!(Complex64::new(1.0, 2.0).format_value(), "(1+2i)");
    }
}
