use rand::Rng;

use crate::{host, miller_rabin, query};

const ITERATIONS: usize = 5;

/// The line printed for `http_query`, without its trailing newline.
pub fn verdict(http_query: &str, rng: &mut impl Rng) -> String {
    let Some(number) = query::lookup(http_query, "number") else {
        return "No number provided for primality test.".to_string();
    };

    let Ok(n) = number.parse::<u128>() else {
        host::log_string(&format!("rejected number {number:?}"));
        return format!(
            "Error: Unable to parse {number:?} as an unsigned integer below 2^128."
        );
    };

    let prime = miller_rabin::is_prime(n, ITERATIONS, rng);
    host::log_i32(u32::from(prime));
    if prime {
        format!("{n} is likely prime.")
    } else {
        format!("{n} is composite.")
    }
}

#[cfg(test)]
mod tests {
    use super::verdict;

    fn run(query: &str) -> String {
        verdict(query, &mut rand::rng())
    }

    #[test]
    fn reports_primes_and_composites() {
        assert_eq!(run("number=17"), "17 is likely prime.");
        assert_eq!(run("number=25"), "25 is composite.");
        assert_eq!(run("a=1&number=2"), "2 is likely prime.");
    }

    #[test]
    fn missing_number_is_reported() {
        assert_eq!(run(""), "No number provided for primality test.");
        assert_eq!(run("num=17"), "No number provided for primality test.");
    }

    #[test]
    fn unparsable_number_is_reported() {
        assert!(run("number=abc").starts_with("Error: Unable to parse \"abc\""));
        assert!(run("number=-5").starts_with("Error:"));
        assert!(run("number=340282366920938463463374607431768211456").starts_with("Error:"));
    }
}
