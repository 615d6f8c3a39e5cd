//! DOT format helpers for CFG visualization.
//!
//! The output can be rendered with Graphviz (`dot -Tsvg`).

/// Escapes a string for use inside a quoted DOT label.
///
/// Block labels contain instruction text, so quotes, backslashes, newlines and the
/// angle brackets of pointer types all need escaping.
///
/// # Examples
///
/// ```rust
/// use irkit::utils::escape_dot;
///
/// assert_eq!(escape_dot("ptr<int>"), "ptr\\<int\\>");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\l")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_basic() {
        assert_eq!(escape_dot("hello"), "hello");
        assert_eq!(escape_dot("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_dot_lines() {
        assert_eq!(escape_dot("x = add a b;\r\nret x;"), "x = add a b;\\lret x;");
    }

    #[test]
    fn test_escape_dot_record_chars() {
        assert_eq!(escape_dot("{ptr<int>}"), "\\{ptr\\<int\\>\\}");
    }
}
