/// Shell quoting for values interpolated into remote commands
///
/// Hostnames, passwords and key lines typed by the operator end up inside
/// remote shell strings; they are always wrapped in single quotes.

/// Escape a string for use in a single-quote context in shell commands.
///
/// Inside single quotes only the quote itself needs escaping, done by closing
/// the quote, emitting an escaped quote and reopening: '\''
///
/// # Example
/// ```
/// use alice_cli::tools::shell_escape::escape_single_quote;
///
/// assert_eq!(escape_single_quote("my'password"), "my'\\''password");
/// ```
pub fn escape_single_quote(s: &str) -> String {
    s.replace('\'', r"'\''")
}

/// Wrap a value in single quotes, escaping embedded quotes
pub fn single_quoted(s: &str) -> String {
    format!("'{}'", escape_single_quote(s))
}
