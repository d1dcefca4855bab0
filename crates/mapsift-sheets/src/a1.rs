/// Column letter of the 1-based column `index`: `1` is `A`, `27` is `AA`.
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Prefixes `range` with the sheet title, quoted when it is not a plain word.
pub fn sheet_range(title: &str, range: &str) -> String {
    if title.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{title}!{range}")
    } else {
        format!("'{}'!{range}", title.replace('\'', "''"))
    }
}

/// `A{row}:{last}{row}` over `width` columns.
pub fn row_range(row: usize, width: usize) -> String {
    let last = column_letter(width.max(1));
    format!("A{row}:{last}{row}")
}
