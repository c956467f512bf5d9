use rand::Rng;

const SMALL_PRIMES: [u128; 11] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31];

/// `(a + b) mod m` for `a, b < m`, without overflow.
const fn add_mod(a: u128, b: u128, m: u128) -> u128 {
    if a >= m - b { a - (m - b) } else { a + b }
}

/// `(a * b) mod m`, falling back to double-and-add when the product overflows.
fn mul_mod(a: u128, b: u128, m: u128) -> u128 {
    if let Some(product) = a.checked_mul(b) {
        return product % m;
    }
    let (mut a, mut b) = (a % m, b % m);
    let mut result = 0;
    while b > 0 {
        if b & 1 == 1 {
            result = add_mod(result, a, m);
        }
        a = add_mod(a, a, m);
        b >>= 1;
    }
    result
}

/// `base^exp mod modulus`.
pub fn mod_exp(base: u128, mut exp: u128, modulus: u128) -> u128 {
    if modulus == 1 {
        return 0;
    }
    let mut result = 1;
    let mut base = base % modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        base = mul_mod(base, base, modulus);
        exp >>= 1;
    }
    result
}

/// Whether `a` proves odd `n > 3` composite.
fn witness(a: u128, n: u128) -> bool {
    let d = n - 1;
    let s = d.trailing_zeros();
    let r = d >> s;

    let mut x = mod_exp(a, r, n);
    if x == 1 || x == n - 1 {
        return false;
    }
    for _ in 1..s {
        x = mul_mod(x, x, n);
        if x == 1 {
            return true;
        }
        if x == n - 1 {
            return false;
        }
    }
    true
}

/// Probabilistic primality test with `k` random bases.
///
/// Never reports a prime as composite.
pub fn is_prime(n: u128, k: usize, rng: &mut impl Rng) -> bool {
    if n < 2 {
        return false;
    }
    for p in SMALL_PRIMES {
        if n % p == 0 {
            return n == p;
        }
    }
    (0..k).all(|_| !witness(rng.random_range(2..n - 1), n))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERSENNE_127: u128 = (1 << 127) - 1;
    const MERSENNE_61: u128 = (1 << 61) - 1;

    #[test]
    fn mod_exp_small() {
        assert_eq!(mod_exp(5, 3, 13), 8);
        assert_eq!(mod_exp(2, 0, 7), 1);
        assert_eq!(mod_exp(7, 5, 1), 0);
    }

    #[test]
    fn mod_exp_near_the_top_of_the_range() {
        assert_eq!(mod_exp(u128::MAX, 2, u128::MAX - 1), 1);
        // Fermat: 3^(p-1) = 1 mod p
        assert_eq!(mod_exp(3, MERSENNE_127 - 1, MERSENNE_127), 1);
    }

    #[test]
    fn classifies_known_numbers() {
        let mut rng = rand::rng();
        for (n, expected) in [
            (0, false),
            (1, false),
            (2, true),
            (3, true),
            (4, false),
            (5, true),
            (17, true),
            (25, false),
            (561, false),
            (7919, true),
            (1_000_000_007, true),
            (18_446_744_073_709_551_557, true),
            (MERSENNE_127, true),
            (MERSENNE_61 * MERSENNE_61, false),
        ] {
            assert_eq!(is_prime(n, 5, &mut rng), expected, "{n}");
        }
    }

    #[test]
    fn primes_are_never_rejected() {
        let mut rng = rand::rng();
        for n in [13u128, 101, 65_537, 2_147_483_647, MERSENNE_61] {
            for _ in 0..50 {
                assert!(is_prime(n, 1, &mut rng), "{n}");
            }
        }
    }
}
