//! Delimited list parsing for allow-lists given as one string.

/// Split a list on any run of commas, semicolons, or whitespace.
///
/// Empty fragments are dropped, so `"1,;2 ;3, 4"` yields four entries and an
/// empty string yields none.
pub fn split_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
