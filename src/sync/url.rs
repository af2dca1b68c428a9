/// Build a query string from ordered `(name, value)` pairs.
///
/// Values are percent-encoded; names are emitted as-is. Entries keep the
/// order they were given in.
pub fn url_encode<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key.as_ref(), urlencoding::encode(value.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}
