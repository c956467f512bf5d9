//! Gateway guest reporting whether `?number=N` is prime.

mod host;
mod miller_rabin;
mod query;
mod report;

fn main() {
    let query = std::env::var("http_query").unwrap_or_default();
    println!("{}", report::verdict(&query, &mut rand::rng()));
}
