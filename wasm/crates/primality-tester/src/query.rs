/// Value of the first `key=value` pair named `key`.
///
/// Pairs without `=` are skipped.
pub fn lookup<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find_map(|(k, v)| (k == key).then_some(v))
}

#[cfg(test)]
mod tests {
    use super::lookup;

    #[test]
    fn finds_number() {
        assert_eq!(lookup("number=17", "number"), Some("17"));
        assert_eq!(lookup("a=1&number=25", "number"), Some("25"));
        assert_eq!(lookup("number=", "number"), Some(""));
    }

    #[test]
    fn missing_key() {
        assert_eq!(lookup("", "number"), None);
        assert_eq!(lookup("number", "number"), None);
        assert_eq!(lookup("numbers=3", "number"), None);
    }
}
