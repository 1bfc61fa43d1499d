/// Split one script line into tokens.
///
/// Double quotes toggle a quoted span and are dropped from the output. Spaces
/// outside a span end the current token, so `a  b` yields an empty token in
/// the middle. An empty trailing token is not emitted. An unterminated quote
/// runs to the end of the line.
///
/// A line made only of spaces and quotes has no tokens at all.
pub fn tokenize(line: &str) -> Vec<String> {
    if line.chars().all(|c| c == ' ' || c == '"') {
        return Vec::new();
    }

    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => quoted = !quoted,
            ' ' if !quoted => tokens.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
