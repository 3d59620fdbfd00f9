use regex::Captures;
use std::sync::LazyLock;

use crate::parser::rules::{normalize_count, scale_thousands, RuleChain};

/// A count as printed on the page: digits, optionally grouped in threes by
/// spaces or dots ("1 234", "1.234.567").
macro_rules! count {
    () => {
        r"(?P<value>\d{1,3}(?:[\s.]\d{3})+|\d+)"
    };
}

pub static TESTED_CASES: LazyLock<RuleChain> = LazyLock::new(|| {
    RuleChain::new("testedCasesTotal")
        .rule(
            "conducted_in_labs",
            concat!(r"(?s)провед.*?", count!(), r"\s*(?P<unit>тыс)?.*?лаборатор"),
            count_without_unit,
        )
        .rule(
            "conducted_tests",
            concat!(r"провед\S*\s+", count!(), r"\s+(?:тест|исследован|анализ)"),
            plain_count,
        )
        .rule(
            "conducted_thousands",
            r"(?s)провед.*?(?P<value>\d{1,3}(?:\s\d{3})+(?:,\d+)?|\d+(?:[.,]\d+)?)\s*тыс",
            thousands,
        )
});

pub static INFECTED: LazyLock<RuleChain> = LazyLock::new(|| {
    RuleChain::new("infectedTotal")
        .rule("registered", concat!(r"(?s)регистрирова.*?", count!()), plain_count)
        .rule("confirmed", concat!(r"(?s)подтвержд.*?", count!()), plain_count)
});

pub static RECOVERED: LazyLock<RuleChain> = LazyLock::new(|| {
    RuleChain::new("recoveredTotal")
        .rule("recovery_then_count", concat!(r"(?s)выздоровле.*?", count!()), plain_count)
        .rule("count_then_recovered", concat!(count!(), r"\D*?выздоров"), plain_count)
});

pub static DEATHS: LazyLock<RuleChain> = LazyLock::new(|| {
    RuleChain::new("deathsTotal")
        .rule("count_then_died", concat!(count!(), r"\D*?умер"), plain_count)
        .rule("died_then_count", concat!(r"умер\w*\s+", count!()), plain_count)
});

fn plain_count(caps: &Captures<'_>) -> Option<String> {
    normalize_count(caps.name("value")?.as_str())
}

// "5 тыс." belongs to the compact rule.
fn count_without_unit(caps: &Captures<'_>) -> Option<String> {
    if caps.name("unit").is_some() {
        return None;
    }
    plain_count(caps)
}

fn thousands(caps: &Captures<'_>) -> Option<String> {
    scale_thousands(caps.name("value")?.as_str())
}
