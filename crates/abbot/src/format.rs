//! Text helpers for chat output.

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// English words for `n`, e.g. `121` → "one hundred and twenty-one".
pub fn number_to_words(n: u64) -> String {
    if n < 1000 {
        return below_thousand(n);
    }

    let mut parts = Vec::new();
    let mut rest = n;
    for (scale, word) in SCALES {
        if rest >= scale {
            parts.push(format!("{} {}", number_to_words(rest / scale), word));
            rest %= scale;
        }
    }

    match rest {
        0 => parts.join(", "),
        1..=99 => format!("{} and {}", parts.join(", "), below_thousand(rest)),
        _ => format!("{}, {}", parts.join(", "), below_thousand(rest)),
    }
}

fn below_thousand(n: u64) -> String {
    let hundreds = n / 100;
    let rest = n % 100;

    let tail = match rest {
        0 => None,
        1..=19 => Some(ONES[rest as usize].to_string()),
        _ if rest % 10 == 0 => Some(TENS[(rest / 10) as usize].to_string()),
        _ => Some(format!(
            "{}-{}",
            TENS[(rest / 10) as usize],
            ONES[(rest % 10) as usize]
        )),
    };

    match (hundreds, tail) {
        (0, None) => ONES[0].to_string(),
        (0, Some(tail)) => tail,
        (h, None) => format!("{} hundred", ONES[h as usize]),
        (h, Some(tail)) => format!("{} hundred and {}", ONES[h as usize], tail),
    }
}

/// Leaderboard marker for 1-based `rank` out of `total` entries.
pub fn rank_indicator(rank: usize, total: usize) -> String {
    match rank {
        1 => ":first_place:".into(),
        2 => ":second_place:".into(),
        3 => ":third_place:".into(),
        4..=9 if total <= 10 => format!(":{}:", ONES[rank]),
        10 if total <= 10 => ":keycap_ten:".into(),
        _ => rank.to_string(),
    }
}

/// `1 message`, `2 messages`.
pub fn plural(count: i64, noun: &str) -> String {
    if count == 1 {
        format!("{} {}", count, noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_numbers() {
        assert_eq!(number_to_words(0), "zero");
        assert_eq!(number_to_words(2), "two");
        assert_eq!(number_to_words(13), "thirteen");
        assert_eq!(number_to_words(20), "twenty");
        assert_eq!(number_to_words(42), "forty-two");
    }

    #[test]
    fn test_hundreds_and_thousands() {
        assert_eq!(number_to_words(100), "one hundred");
        assert_eq!(number_to_words(121), "one hundred and twenty-one");
        assert_eq!(number_to_words(1000), "one thousand");
        assert_eq!(number_to_words(1005), "one thousand and five");
        assert_eq!(
            number_to_words(2_345_678),
            "two million, three hundred and forty-five thousand, six hundred and seventy-eight"
        );
    }

    #[test]
    fn test_rank_indicator_medals() {
        assert_eq!(rank_indicator(1, 5), ":first_place:");
        assert_eq!(rank_indicator(2, 20), ":second_place:");
        assert_eq!(rank_indicator(3, 3), ":third_place:");
    }

    #[test]
    fn test_rank_indicator_keycaps_only_for_short_boards() {
        assert_eq!(rank_indicator(4, 5), ":four:");
        assert_eq!(rank_indicator(9, 10), ":nine:");
        assert_eq!(rank_indicator(10, 10), ":keycap_ten:");
        assert_eq!(rank_indicator(4, 11), "4");
        assert_eq!(rank_indicator(11, 20), "11");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "message"), "1 message");
        assert_eq!(plural(0, "message"), "0 messages");
    }
}
