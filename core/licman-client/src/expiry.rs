use chrono::NaiveDateTime;

const FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const WIDTH: usize = "0000-00-00 00:00:00".len();

/// Finds the first `YYYY-MM-DD HH:MM:SS` timestamp in `message`.
///
/// A candidate only counts if it parses and formats back to exactly the
/// same text, so `2024-02-30 00:00:00` or `2024-1-01 ...` are ignored.
#[must_use]
pub fn parse_expiry(message: &str) -> Option<String> {
    let bytes = message.as_bytes();
    if bytes.len() < WIDTH {
        return None;
    }

    (0..=bytes.len() - WIDTH)
        .filter(|&start| message.is_char_boundary(start) && message.is_char_boundary(start + WIDTH))
        .map(|start| &message[start..start + WIDTH])
        .find(|candidate| {
            NaiveDateTime::parse_from_str(candidate, FORMAT)
                .is_ok_and(|parsed| parsed.format(FORMAT).to_string() == *candidate)
        })
        .map(str::to_string)
}
