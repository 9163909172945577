/// Normalizes a URL string so equivalent URLs compare equal
///
/// # Normalization Steps
///
/// 1. Drop everything from the first `?` onward
/// 2. Lowercase the remainder
/// 3. Strip the trailing `/`, unless the result is exactly `/`
///
/// A run of trailing slashes is stripped as a whole, which keeps the function
/// idempotent.
///
/// The function never fails: input that is not a URL at all is still
/// lowercased and trimmed the same way.
///
/// # Examples
///
/// ```
/// use siteprobe::url::normalize;
///
/// assert_eq!(normalize("https://EXAMPLE.com/Page/?a=1"), "https://example.com/page");
/// assert_eq!(normalize("/"), "/");
/// ```
pub fn normalize(raw: &str) -> String {
    let without_query = match raw.find('?') {
        Some(index) => &raw[..index],
        None => raw,
    };

    let lowered = without_query.to_lowercase();
    let trimmed = lowered.trim_end_matches('/');

    if trimmed.is_empty() && !lowered.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
