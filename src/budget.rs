// Prompt budgeting for outbound generation requests and reply chunking for
// the transport.

pub const SEPARATOR: &str = " ";

// Joins `prefix` and `items` with a single space and trims the oldest items
// until the result fits in `max_length` characters.
pub fn trim<S: AsRef<str>>(prefix: &str, items: &[S], max_length: usize) -> String {
    trim_with(prefix, items, max_length, SEPARATOR)
}

// Items are ordered oldest first. The newest item is always kept, even when
// it alone overflows the budget.
pub fn trim_with<S: AsRef<str>>(
    prefix: &str,
    items: &[S],
    max_length: usize,
    separator: &str,
) -> String {
    let mut start = 0;
    let mut prompt = compose(prefix, &items[start..], separator);

    while prompt.chars().count() > max_length && items.len() - start > 1 {
        start += 1; // Drop the oldest remaining item.
        prompt = compose(prefix, &items[start..], separator);
    }

    if start > 0 {
        log::debug!(
            "Trimmed {start} of {} items to fit {max_length} characters",
            items.len()
        );
    }
    prompt
}

fn compose<S: AsRef<str>>(prefix: &str, items: &[S], separator: &str) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(items.len() + 1);
    if !prefix.is_empty() {
        parts.push(prefix);
    }
    parts.extend(items.iter().map(AsRef::as_ref));
    parts.join(separator)
}

// Splits `text` into segments of exactly `max_length` characters (the last one
// may be shorter). A zero length means no limit.
pub fn chunk(text: &str, max_length: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_length == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        current.push(c);
        count += 1;
        if count == max_length {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
