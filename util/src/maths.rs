//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Get the signed angular distance in degrees from `current` to `target`.
///
/// The result is the shortest rotation which takes `current` onto `target`, in the range
/// (-180, 180]. Positive results are rotations towards increasing heading.
pub fn angle_diff_deg<T>(target: T, current: T) -> T
where
    T: Float
{
    let half_turn = T::from(180.0).unwrap();
    let full_turn = T::from(360.0).unwrap();

    // Shift so that the open end of the range lands on -180 rather than +180
    let mut diff = half_turn - rem_euclid(half_turn - (target - current), full_turn);

    // rem_euclid can return exactly `rhs` due to round-off, which would give -180
    if diff <= -half_turn {
        diff = diff + full_turn;
    }

    diff
}

/// Wrap an absolute angle in degrees into the range [0, 360).
pub fn wrap_deg_360<T>(angle: T) -> T
where
    T: Float
{
    let full_turn = T::from(360.0).unwrap();

    let wrapped = rem_euclid(angle, full_turn);

    if wrapped >= full_turn {
        T::zero()
    }
    else {
        wrapped
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
///
/// In particular, the return value `r` satisfies `0.0 <= r < rhs.abs()` in
/// most cases. However, due to a floating point round-off error it can
/// result in `r == rhs.abs()`, violating the mathematical definition, if
/// `self` is much smaller than `rhs.abs()` in magnitude and `self < 0.0`.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_angle_diff_deg() {
        assert_eq!(angle_diff_deg(350f64, 10f64), -20f64);
        assert_eq!(angle_diff_deg(10f64, 350f64), 20f64);
        assert_eq!(angle_diff_deg(90f64, 0f64), 90f64);
        assert_eq!(angle_diff_deg(0f64, 90f64), -90f64);

        // Half a turn either way is reported as +180
        assert_eq!(angle_diff_deg(180f64, 0f64), 180f64);
        assert_eq!(angle_diff_deg(0f64, 180f64), 180f64);
        assert_eq!(angle_diff_deg(-180f64, 0f64), 180f64);

        // Bearings from atan2 are in (-180, 180], headings in [0, 360)
        assert_eq!(angle_diff_deg(-90f64, 270f64), 0f64);
        assert_eq!(angle_diff_deg(-45f64, 300f64), 15f64);
    }

    #[test]
    fn test_angle_diff_deg_same_angle() {
        for d in -720..=720 {
            let d = d as f64 * 0.5;
            assert_eq!(angle_diff_deg(d, d), 0f64);
        }
    }

    #[test]
    fn test_angle_diff_deg_range() {
        for t in (-400..400).step_by(7) {
            for c in (0..360).step_by(11) {
                let diff = angle_diff_deg(t as f64, c as f64);
                assert!(diff > -180.0 && diff <= 180.0, "{} -> {} gave {}", c, t, diff);
            }
        }
    }

    #[test]
    fn test_wrap_deg_360() {
        assert_eq!(wrap_deg_360(0f64), 0f64);
        assert_eq!(wrap_deg_360(360f64), 0f64);
        assert_eq!(wrap_deg_360(-90f64), 270f64);
        assert_eq!(wrap_deg_360(725f64), 5f64);
    }
}
