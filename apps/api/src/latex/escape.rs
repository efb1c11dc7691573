/// Escapes user text for inclusion in a LaTeX body.
///
/// Works in a single pass over the input, so the backslashes and braces that
/// escape sequences introduce are never themselves re-escaped. Line breaks and
/// tabs collapse to spaces; other control characters are dropped.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\textbackslash{}"),
            '&' => out.push_str(r"\&"),
            '%' => out.push_str(r"\%"),
            '$' => out.push_str(r"\$"),
            '#' => out.push_str(r"\#"),
            '_' => out.push_str(r"\_"),
            '{' => out.push_str(r"\{"),
            '}' => out.push_str(r"\}"),
            '~' => out.push_str(r"\textasciitilde{}"),
            '^' => out.push_str(r"\textasciicircum{}"),
            '\n' | '\r' | '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// `escape_latex` for optional fields: absent text becomes the empty string.
pub fn escape_opt(text: Option<&str>) -> String {
    text.map(escape_latex).unwrap_or_default()
}

/// Prepares a URL for the first argument of `\href`.
///
/// `%` and `#` are escaped for hyperref; whitespace, braces and backslashes
/// cannot appear in a valid URL and are removed.
pub fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for c in url.trim().chars() {
        match c {
            '%' => out.push_str(r"\%"),
            '#' => out.push_str(r"\#"),
            '\\' | '{' | '}' => {}
            c if c.is_whitespace() || c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
