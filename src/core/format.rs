//! Display helpers for names, phone numbers, numbers and rates.

/// International dialing codes. Codes sharing a prefix are listed longest
/// first; the first match wins.
const COUNTRY_CODES: &[u32] = &[
    1242, 1246, 1264, 1268, 1284, 1340, 1345, 1441, 1473, 1599, 1649, 1664, 1670, 1671, 1684,
    1758, 1767, 1784, 1809, 1868, 1869, 1876, 1, 20, 212, 213, 216, 218, 220, 221, 222, 223,
    224, 225, 226, 227, 228, 229, 230, 231, 232, 233, 234, 235, 236, 237, 238, 239, 240, 241,
    242, 243, 244, 245, 248, 249, 250, 251, 252, 253, 254, 255, 256, 257, 258, 260, 261, 262,
    263, 264, 265, 266, 267, 268, 269, 27, 290, 291, 297, 298, 299, 30, 31, 32, 33, 34, 350,
    351, 352, 353, 354, 355, 356, 357, 358, 359, 36, 370, 371, 372, 373, 374, 375, 376, 377,
    378, 380, 381, 382, 385, 386, 387, 389, 39, 40, 41, 420, 421, 423, 43, 44, 45, 46, 47, 48,
    49, 500, 501, 502, 503, 504, 505, 506, 507, 508, 509, 51, 52, 53, 54, 55, 56, 57, 58, 590,
    591, 592, 593, 595, 597, 598, 599, 60, 61, 62, 63, 64, 65, 66, 670, 672, 673, 674, 675, 676,
    677, 678, 679, 680, 681, 682, 683, 685, 686, 687, 688, 689, 690, 691, 692, 7, 81, 82, 84,
    850, 852, 853, 855, 856, 86, 870, 880, 886, 90, 91, 92, 93, 94, 95, 960, 961, 962, 963, 964,
    965, 966, 967, 968, 970, 971, 972, 973, 974, 975, 976, 977, 98, 992, 993, 994, 995, 996, 998,
];

/// Capitalizes the first letter of every word and lowercases the rest.
///
/// A word is any run of alphabetic characters, so `kita-central` becomes
/// `Kita-Central`.
#[must_use]
pub fn title_case(text: &str) -> String {
    let mut titled = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                titled.extend(c.to_lowercase());
            } else {
                titled.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            titled.push(c);
            in_word = false;
        }
    }
    titled
}

/// Splits a phone number into its country code (international numbers only)
/// and its digits.
///
/// ```
/// use bolibana::core::format::clean_phone_number;
///
/// assert_eq!(
///     clean_phone_number("+223 76 12 34 56"),
///     (Some("223".to_string()), "76123456".to_string())
/// );
/// assert_eq!(clean_phone_number("76-12-34-56"), (None, "76123456".to_string()));
/// ```
#[must_use]
pub fn clean_phone_number(number: &str) -> (Option<String>, String) {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    let compact: String = number
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();

    if !is_international(&compact) {
        return (None, digits);
    }

    let code = COUNTRY_CODES
        .iter()
        .map(ToString::to_string)
        .find(|code| digits.starts_with(code.as_str()));
    match code {
        Some(code) => {
            let rest = digits[code.len()..].to_string();
            (Some(code), rest)
        }
        None => (None, digits),
    }
}

/// `+…`, `(…` or `CCCC.NNN…` forms.
fn is_international(compact: &str) -> bool {
    if compact.starts_with(['+', '(']) {
        return true;
    }
    match compact.split_once('.') {
        Some((code, rest)) => {
            (1..=4).contains(&code.len())
                && code.chars().all(|c| c.is_ascii_digit())
                && !rest.is_empty()
                && rest.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Groups digits by two, or by three when their count is odd, prefixed with
/// `(code)` for international numbers.
#[must_use]
pub fn format_phone_number(number: &str) -> String {
    let (code, digits) = clean_phone_number(number);
    let span = if digits.len() % 2 == 1 { 3 } else { 2 };
    let grouped = digits
        .as_bytes()
        .chunks(span)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join(" ");

    match code {
        Some(code) => format!("({code}) {grouped}"),
        None => grouped,
    }
}

/// Formats a number with thousands grouping.
///
/// Whole numbers are printed without decimals, others with `precision`
/// decimals. French formatting groups with spaces and uses a decimal comma.
#[must_use]
pub fn number_format(value: f64, precision: usize, french: bool) -> String {
    let raw = if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.precision$}")
    };

    let (sign, unsigned) = raw
        .strip_prefix('-')
        .map_or(("", raw.as_str()), |rest| ("-", rest));
    let (integer, decimals) = unsigned
        .split_once('.')
        .map_or((unsigned, None), |(integer, decimals)| (integer, Some(decimals)));

    let (group_sep, decimal_sep) = if french { (' ', ',') } else { (',', '.') };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (position, digit) in integer.chars().enumerate() {
        if position > 0 && (integer.len() - position) % 3 == 0 {
            grouped.push(group_sep);
        }
        grouped.push(digit);
    }

    match decimals {
        Some(decimals) => format!("{sign}{grouped}{decimal_sep}{decimals}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Formats a ratio as a percentage; `None` gives `n/a`.
#[must_use]
pub fn format_percent(rate: Option<f64>, precision: usize, french: bool) -> String {
    rate.map_or_else(
        || "n/a".to_string(),
        |rate| format!("{}%", number_format(rate * 100.0, precision, french)),
    )
}

/// Display class of a completion rate.
#[must_use]
pub fn rate_class(rate: f64) -> &'static str {
    if rate < 0.20 {
        "error"
    } else if rate < 0.60 {
        "warning"
    } else {
        "success"
    }
}

/// Hard-wraps `text` every `width` characters.
#[must_use]
pub fn ellipsis_wrap(text: &str, width: usize) -> String {
    if width == 0 {
        return text.to_string();
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Label of the validation stage handled at an entity-type level.
#[must_use]
pub fn stage_name(level: &str) -> &str {
    match level {
        "cscom" => "Data Collection",
        "district" => "District Validation",
        "region" => "Region Validation",
        "over" => "National Analysis",
        other => other,
    }
}
