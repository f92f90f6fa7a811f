use std::future::Future;
use std::pin::Pin;

pub mod retry;
pub mod logging;
pub mod circuit_breaker;

/// Boxed future returned by the provider and sink traits so they stay object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Shortens a response body for log and error messages.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(max_chars).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("  short  ", 10), "short");
        assert_eq!(truncate_for_log("abcdefghij", 4), "abcd…");
    }
}
