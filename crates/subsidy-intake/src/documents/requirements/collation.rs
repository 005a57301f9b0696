use std::cmp::Ordering;

/// Case-insensitive German sort key (DIN 5007 variant 1: umlauts sort with their base vowel).
pub fn sort_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    for ch in title.chars().flat_map(char::to_lowercase) {
        match ch {
            'ä' => key.push('a'),
            'ö' => key.push('o'),
            'ü' => key.push('u'),
            'ß' => key.push_str("ss"),
            other => key.push(other),
        }
    }
    key
}

pub fn compare_titles(left: &str, right: &str) -> Ordering {
    sort_key(left).cmp(&sort_key(right))
}
