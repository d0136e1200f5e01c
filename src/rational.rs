//! Best rational approximation

/// Closest fraction `frac / modulus` to `num / den` with
/// `frac < modulus <= max_mod` and `frac <= max_frac`.
///
/// Walks the continued fraction expansion of `num / den` keeping the last two
/// convergents. When the next convergent would break a bound, the largest
/// admissible semi-convergent is compared with the last convergent and the
/// closer one wins.
///
/// Values that would round up to one (or are not below one) give the largest
/// admissible fraction below one. `max_mod` must be at least 1.
pub fn best_rational_approximation(
    num: u64,
    den: u64,
    max_frac: u64,
    max_mod: u64,
) -> (u64, u64) {
    let (mut n, mut d) = (num, den);

    // p(k-2), q(k-2) and p(k-1), q(k-1)
    let (mut n0, mut d0) = (0u64, 1u64);
    let (mut n1, mut d1) = (1u64, 0u64);

    loop {
        if d == 0 {
            break;
        }

        let dp = d;
        let a = n / d;
        d = n % d;
        n = dp;

        let n2 = n0.saturating_add(a.saturating_mul(n1));
        let d2 = d0.saturating_add(a.saturating_mul(d1));

        if n2 > max_frac || d2 > max_mod {
            // largest t keeping the semi-convergent in bounds
            let mut t = u64::MAX;
            if d1 != 0 {
                t = max_mod.saturating_sub(d0) / d1;
            }
            if n1 != 0 {
                t = t.min(max_frac.saturating_sub(n0) / n1);
            } else if n0 > max_frac {
                t = 0;
            }

            // semi-convergent is closer when t > a/2, or t == a/2 and the
            // remaining tail favors it
            let take_semi = d1 == 0
                || t.saturating_mul(2) > a
                || (t.saturating_mul(2) == a
                    && (d0 as u128) * (dp as u128) > (d1 as u128) * (d as u128));

            if take_semi {
                n1 = n0.saturating_add(t.saturating_mul(n1));
                d1 = d0.saturating_add(t.saturating_mul(d1));
            }
            break;
        }

        n0 = n1;
        n1 = n2;
        d0 = d1;
        d1 = d2;
    }

    if n1 < d1 {
        return (n1, d1);
    }

    // every admissible fraction below one lies below num / den here,
    // the largest of them is (k - 1) / k
    let k = max_mod.min(max_frac.saturating_add(1)).max(1);
    (k - 1, k)
}


#[cfg(test)]
mod tests {
    use super::*;

    const MAX_24: u64 = (1 << 24) - 1;

    #[test]
    fn exact_fractions_are_reduced() {
        assert_eq!(best_rational_approximation(6, 8, MAX_24, MAX_24), (3, 4));
        assert_eq!(best_rational_approximation(5_760_000, 10_000_000, MAX_24, MAX_24), (72, 125));
    }

    #[test]
    fn zero_numerator() {
        assert_eq!(best_rational_approximation(0, 7, MAX_24, MAX_24), (0, 1));
    }

    #[test]
    fn bounded_modulus_picks_closest() {
        // pi - 3
        assert_eq!(best_rational_approximation(14_159_265, 100_000_000, 100, 100), (14, 99));
        assert_eq!(best_rational_approximation(14_159_265, 100_000_000, 1000, 1000), (16, 113));
    }

    #[test]
    fn semi_convergent_beats_last_convergent() {
        // 0.7 with modulus <= 3: convergents 0/1, 1/1, 2/3 -> 2/3
        assert_eq!(best_rational_approximation(7, 10, 10, 3), (2, 3));
        // 0.41 with modulus <= 4: 1/3 is closer than 1/2
        assert_eq!(best_rational_approximation(41, 100, 10, 4), (1, 3));
    }

    #[test]
    fn values_close_to_one_stay_below_one() {
        assert_eq!(best_rational_approximation(999_999_999, 1_000_000_000, 10, 10), (9, 10));
        // numerator bound is the tighter one
        assert_eq!(best_rational_approximation(999_999_999, 1_000_000_000, 4, 10), (4, 5));
        assert_eq!(best_rational_approximation(9, 10, 10, 1), (0, 1));
    }

    #[test]
    fn zero_numerator_bound_allows_only_zero() {
        assert_eq!(best_rational_approximation(7, 10, 0, 40), (0, 1));
        assert_eq!(best_rational_approximation(1, 10, 0, 40), (0, 1));
    }

    #[test]
    fn values_above_one_saturate_below_one() {
        assert_eq!(best_rational_approximation(30, 10, 100, 7), (6, 7));
    }

    #[test]
    fn huge_inputs_do_not_overflow() {
        let (f, m) = best_rational_approximation(u64::MAX - 1, u64::MAX, MAX_24, MAX_24);
        assert!(f < m && m <= MAX_24);
    }
}
