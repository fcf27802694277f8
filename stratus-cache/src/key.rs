//! Cache key construction helpers.
//!
//! Key construction is the caller's responsibility; the cache treats keys
//! as opaque strings. This module is a convenience for the common case of
//! keying by endpoint plus query parameters.

/// Build a deterministic cache key from a base and query parameters.
///
/// Parameters are sorted by name, then value, so logically identical
/// requests map to the same key regardless of argument order. A call with
/// no parameters returns the base unchanged.
pub fn query_key<K, V>(base: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return base.to_owned();
    }
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .collect();
    pairs.sort_unstable();
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_order_does_not_matter() {
        let a = query_key("users", &[("page", "2"), ("limit", "10")]);
        let b = query_key("users", &[("limit", "10"), ("page", "2")]);
        assert_eq!(a, b);
        assert_eq!(a, "users?limit=10&page=2");
    }

    #[test]
    fn test_no_parameters_returns_base() {
        let key = query_key::<&str, &str>("users", &[]);
        assert_eq!(key, "users");
    }

    #[test]
    fn test_repeated_names_sort_by_value() {
        let key = query_key("tags", &[("t", "b"), ("t", "a")]);
        assert_eq!(key, "tags?t=a&t=b");
    }
}
