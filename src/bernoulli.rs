//! Exact Bernoulli numbers over reduced `i128` fractions.
//!
//! `B(n) = -1/(n+1) * Σ_{k<n} C(n+1, k) · B(k)`, with `B(0) = 1` (so
//! `B(1) = -1/2`).  Every intermediate sum is GCD‑reduced and all arithmetic
//! is checked: a result that does not fit yields `None` instead of a wrong
//! fraction.

/// `(numerator, denominator)`, reduced, denominator always positive.
pub type Fraction = (i128, i128);

pub fn bernoulli(n: usize) -> Option<Fraction> {
    let mut memo = vec![None; n + 1];
    bernoulli_with(n, &mut memo)
}

/// `B(0)..=B(n)`, sharing one memo table.
pub fn bernoulli_upto(n: usize) -> Option<Vec<Fraction>> {
    let mut memo = vec![None; n + 1];
    (0..=n).map(|k| bernoulli_with(k, &mut memo)).collect()
}

/// `B(n)` against a caller-owned memo table, so a long table can be built
/// one entry at a time.  `memo` must hold at least `n + 1` slots.
pub fn bernoulli_with(n: usize, memo: &mut [Option<Fraction>]) -> Option<Fraction> {
    if let Some(b) = memo[n] {
        return Some(b);
    }

    let b = if n == 0 {
        (1, 1)
    } else {
        let n1 = n as i128 + 1;
        let mut sum: Fraction = (0, 1);
        for k in 0..n {
            let (num, den) = bernoulli_with(k, memo)?;
            let term = (num.checked_mul(comb(k as u64, n as u64 + 1)? as i128)?, den);
            sum = add(sum, term)?;
        }
        reduce(sum.0.checked_neg()?, sum.1.checked_mul(n1)?)?
    };

    memo[n] = Some(b);
    Some(b)
}

fn add(a: Fraction, b: Fraction) -> Option<Fraction> {
    let num = a.0.checked_mul(b.1)?.checked_add(b.0.checked_mul(a.1)?)?;
    let den = a.1.checked_mul(b.1)?;
    reduce(num, den)
}

fn reduce(numerator: i128, denominator: i128) -> Option<Fraction> {
    let g = gcd(numerator, denominator);
    if g == 0 {
        return None;
    }
    let (num, den) = (numerator / g, denominator / g);
    if den < 0 {
        Some((num.checked_neg()?, den.checked_neg()?))
    } else {
        Some((num, den))
    }
}

/// Euclid; the result is non‑negative.
fn gcd(mut a: i128, mut b: i128) -> i128 {
    while b != 0 {
        let c = a % b;
        a = b;
        b = c;
    }
    a.abs()
}

/// Binomial coefficient `C(n, k)`.
///
/// Iterates over the smaller of `k` and `n - k`; each partial product is
/// itself a binomial coefficient, so the division is always exact.
pub fn comb(k: u64, n: u64) -> Option<u64> {
    if k > n {
        return Some(0);
    }
    let k = k.min(n - k);
    let mut result: u64 = 1;
    for i in 0..k {
        result = result.checked_mul(n - i)? / (i + 1);
    }
    Some(result)
}

/// `"num/den"`, or `"0"` for zero.
pub fn render(fraction: Fraction) -> String {
    match fraction {
        (0, _) => "0".to_string(),
        (num, den) => format!("{}/{}", num, den),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combinations() {
        assert_eq!(comb(1, 4), Some(4));
        assert_eq!(comb(2, 4), Some(6));
        assert_eq!(comb(4, 4), Some(1));
        assert_eq!(comb(2, 5), Some(10));
        assert_eq!(comb(3, 5), Some(10));
        assert_eq!(comb(0, 5), Some(1));
        assert_eq!(comb(6, 5), Some(0));
    }

    #[test]
    fn first_numbers() {
        assert_eq!(bernoulli(0), Some((1, 1)));
        assert_eq!(bernoulli(1), Some((-1, 2)));
        assert_eq!(bernoulli(2), Some((1, 6)));
        assert_eq!(bernoulli(3), Some((0, 1)));
        assert_eq!(bernoulli(4), Some((-1, 30)));
    }

    #[test]
    fn twelfth_number() {
        assert_eq!(bernoulli(12), Some((-691, 2730)));
    }

    #[test]
    fn table_matches_single_lookups() {
        let table = bernoulli_upto(14).unwrap();
        assert_eq!(table.len(), 15);
        assert_eq!(table[14], (7, 6));
        assert_eq!(table[10], (5, 66));
    }

    #[test]
    fn growing_memo_one_entry_at_a_time() {
        let mut memo = vec![None, None];
        let mut table = Vec::new();
        for n in 2..=6 {
            memo.push(None);
            table.push(bernoulli_with(n, &mut memo).unwrap());
        }
        assert_eq!(table, vec![(1, 6), (0, 1), (-1, 30), (0, 1), (1, 42)]);
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        assert_eq!(bernoulli(400), None);
    }

    #[test]
    fn rendering() {
        assert_eq!(render((0, 1)), "0");
        assert_eq!(render((-691, 2730)), "-691/2730");
    }
}
