use regex::{Captures, Regex};
use tracing::debug;

/// Turns a rule's captures into a field value; `None` rejects the match and
/// lets the next rule in the chain try.
pub type Transform = fn(&Captures<'_>) -> Option<String>;

pub struct FieldRule {
    pub name: &'static str,
    pattern: Regex,
    transform: Transform,
}

impl FieldRule {
    pub fn apply(&self, text: &str) -> Option<String> {
        let caps = self.pattern.captures(text)?;
        (self.transform)(&caps)
    }
}

/// Ordered rules for one field. The first rule that both matches and
/// transforms wins.
pub struct RuleChain {
    field: &'static str,
    rules: Vec<FieldRule>,
}

impl RuleChain {
    pub fn new(field: &'static str) -> Self {
        RuleChain {
            field,
            rules: Vec::new(),
        }
    }

    /// Append a rule. Patterns are compile-time constants.
    pub fn rule(mut self, name: &'static str, pattern: &str, transform: Transform) -> Self {
        self.rules.push(FieldRule {
            name,
            pattern: Regex::new(pattern).unwrap(),
            transform,
        });
        self
    }

    pub fn evaluate(&self, text: &str) -> Option<String> {
        for rule in &self.rules {
            if let Some(value) = rule.apply(text) {
                debug!(field = self.field, rule = rule.name, %value, "rule matched");
                return Some(value);
            }
        }
        debug!(field = self.field, "no rule matched");
        None
    }
}

#[cfg(test)]
impl RuleChain {
    pub fn get(&self, name: &str) -> &FieldRule {
        self.rules
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("no rule {} in {}", name, self.field))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name).collect()
    }
}

/// Count with thousands separators removed: `"1 234"` and `"1.234"` → `"1234"`.
/// Rejects anything that is not a plain digit string afterwards.
pub fn normalize_count(raw: &str) -> Option<String> {
    let digits: String = raw
        .trim_end_matches(|c: char| c == '.' || c == ',' || c.is_whitespace())
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(digits)
}

/// Compact "N тыс." value: decimal comma allowed, result scaled by 1000 and
/// rounded half up to an integer string. Exact for counts of any size.
pub fn scale_thousands(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let (int_part, frac_part) = match compact.split_once(|c: char| c == ',' || c == '.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (compact.as_str(), ""),
    };
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty() || !all_digits(int_part) || !all_digits(frac_part) {
        return None;
    }

    let mut digits: Vec<u8> = int_part.bytes().collect();
    digits.extend(frac_part.bytes().chain(std::iter::repeat(b'0')).take(3));
    if frac_part.as_bytes().get(3).is_some_and(|&d| d >= b'5') {
        increment(&mut digits);
    }

    let scaled = String::from_utf8(digits).ok()?;
    let trimmed = scaled.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() })
}

// Add one to a big-endian ASCII digit string.
fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == b'9' {
            *d = b'0';
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, b'1');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(caps: &Captures<'_>) -> Option<String> {
        normalize_count(caps.name("value")?.as_str())
    }

    fn reject(_: &Captures<'_>) -> Option<String> {
        None
    }

    #[test]
    fn first_matching_rule_wins() {
        let chain = RuleChain::new("f")
            .rule("a", r"a(?P<value>\d+)", value)
            .rule("b", r"b(?P<value>\d+)", value);
        assert_eq!(chain.evaluate("b2 a1").as_deref(), Some("1"));
        assert_eq!(chain.evaluate("b2").as_deref(), Some("2"));
        assert_eq!(chain.evaluate("c3"), None);
    }

    #[test]
    fn rejected_transform_falls_through() {
        let chain = RuleChain::new("f")
            .rule("a", r"a(?P<value>\d+)", reject)
            .rule("b", r"b(?P<value>\d+)", value);
        assert_eq!(chain.evaluate("a1 b2").as_deref(), Some("2"));
        assert_eq!(chain.names(), vec!["a", "b"]);
    }

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize_count("1 234").as_deref(), Some("1234"));
        assert_eq!(normalize_count("1.234.567").as_deref(), Some("1234567"));
        assert_eq!(normalize_count("12\u{a0}345").as_deref(), Some("12345"));
        assert_eq!(normalize_count(" 42, ").as_deref(), Some("42"));
    }

    #[test]
    fn normalize_rejects_non_counts() {
        assert_eq!(normalize_count(""), None);
        assert_eq!(normalize_count(" . "), None);
        assert_eq!(normalize_count("12,5"), None);
    }

    #[test]
    fn thousands_scaling() {
        assert_eq!(scale_thousands("5").as_deref(), Some("5000"));
        assert_eq!(scale_thousands("1,5").as_deref(), Some("1500"));
        assert_eq!(scale_thousands("12.25").as_deref(), Some("12250"));
        assert_eq!(scale_thousands("2,5").as_deref(), Some("2500"));
        assert_eq!(scale_thousands("x"), None);
        assert_eq!(scale_thousands(",5"), None);
        assert_eq!(scale_thousands("1,2,3"), None);
    }

    #[test]
    fn thousands_scaling_rounds_half_up() {
        assert_eq!(scale_thousands("1,2345").as_deref(), Some("1235"));
        assert_eq!(scale_thousands("1,2344").as_deref(), Some("1234"));
        assert_eq!(scale_thousands("9,9995").as_deref(), Some("10000"));
        assert_eq!(scale_thousands("0,0004").as_deref(), Some("0"));
    }

    #[test]
    fn thousands_scaling_is_exact_for_large_values() {
        assert_eq!(
            scale_thousands("9007199254740993").as_deref(),
            Some("9007199254740993000")
        );
        assert_eq!(
            scale_thousands("99999999999999999999").as_deref(),
            Some("99999999999999999999000")
        );
        assert_eq!(scale_thousands("1 500").as_deref(), Some("1500000"));
    }
}
