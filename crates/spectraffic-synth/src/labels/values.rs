//! Value generators for the built-in labels

use chrono::{Datelike, Days, NaiveDate};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value, json};

use super::token::LabelKind;
use crate::datagen::random_letters;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas", "Sarah",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Wilson", "Anderson", "Taylor", "Moore", "Jackson",
];

const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview",
    "Salem", "Madison", "Georgetown", "Arlington", "Ashland", "Oxford", "Dayton",
];

const COUNTRIES: &[&str] = &[
    "United States", "Canada", "Mexico", "Brazil", "United Kingdom", "France", "Germany",
    "Spain", "Italy", "India", "Japan", "Australia", "Indonesia", "South Africa",
];

const STREETS: &[&str] = &[
    "Main", "Oak", "Pine", "Maple", "Cedar", "Elm", "Washington", "Lake", "Hill", "Park",
];

const STREET_SUFFIXES: &[&str] = &["St", "Ave", "Blvd", "Rd", "Ln", "Dr", "Ct"];

const WORDS: &[&str] = &[
    "alpha", "harbor", "summit", "vertex", "meadow", "quartz", "beacon", "ember", "nimbus",
    "orbit", "prairie", "willow",
];

const TLDS: &[&str] = &["com", "org", "net", "io"];

fn pick<R: Rng + ?Sized>(rng: &mut R, items: &[&'static str]) -> &'static str {
    items.choose(rng).copied().unwrap_or_default()
}

fn digits<R: Rng + ?Sized>(rng: &mut R, n: usize) -> Vec<u32> {
    (0..n).map(|_| rng.gen_range(0..10)).collect()
}

fn join_digits(d: &[u32]) -> String {
    d.iter().map(u32::to_string).collect()
}

/// Luhn check digit for `payload` (most significant digit first).
#[must_use]
pub fn luhn_check_digit(payload: &[u32]) -> u32 {
    let sum: u32 = payload
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    (10 - sum % 10) % 10
}

#[must_use]
pub fn luhn_valid(number: &str) -> bool {
    let Some(d) = number
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
    else {
        return false;
    };
    match d.split_last() {
        Some((&check, payload)) => luhn_check_digit(payload) == check,
        None => false,
    }
}

/// ABA check digit for the first eight routing-number digits.
#[must_use]
pub fn aba_check_digit(d: &[u32]) -> u32 {
    let weighted = 3 * (d[0] + d[3] + d[6]) + 7 * (d[1] + d[4] + d[7]) + (d[2] + d[5]);
    (10 - weighted % 10) % 10
}

#[must_use]
pub fn aba_valid(number: &str) -> bool {
    let Some(d) = number
        .chars()
        .map(|c| c.to_digit(10))
        .collect::<Option<Vec<_>>>()
    else {
        return false;
    };
    d.len() == 9 && aba_check_digit(&d[..8]) == d[8]
}

fn routing_payload<R: Rng + ?Sized>(rng: &mut R) -> Vec<u32> {
    // Federal Reserve prefixes 01..=12
    let prefix = rng.gen_range(1..=12u32);
    let mut d = vec![prefix / 10, prefix % 10];
    d.extend(digits(rng, 6));
    d
}

/// A routing number with a valid checksum.
pub fn routing_number<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut d = routing_payload(rng);
    d.push(aba_check_digit(&d));
    join_digits(&d)
}

/// Area, group and serial of a well-formed SSN.
pub fn ssn_parts<R: Rng + ?Sized>(rng: &mut R) -> (u32, u32, u32) {
    let mut area = rng.gen_range(1..=899u32);
    if area == 666 {
        area = 665;
    }
    (area, rng.gen_range(1..=99), rng.gen_range(1..=9999))
}

fn person<R: Rng + ?Sized>(rng: &mut R) -> (&'static str, &'static str) {
    (pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

fn uuid<R: Rng + ?Sized>(rng: &mut R) -> String {
    uuid::Builder::from_random_bytes(rng.r#gen())
        .into_uuid()
        .to_string()
}

/// A calendar date between 1950-01-01 and 2024-12-31.
fn date<R: Rng + ?Sized>(rng: &mut R) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or_default();
    let last = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or_default();
    let span = u64::try_from((last - first).num_days()).unwrap_or(0);
    first
        .checked_add_days(Days::new(rng.gen_range(0..=span)))
        .unwrap_or(first)
}

/// A realistic value for `kind`.
pub fn valid<R: Rng + ?Sized>(kind: LabelKind, rng: &mut R) -> Value {
    let s = match kind {
        LabelKind::FullName => {
            let (first, last) = person(rng);
            format!("{first} {last}")
        }
        LabelKind::FirstName => pick(rng, FIRST_NAMES).to_string(),
        LabelKind::LastName => pick(rng, LAST_NAMES).to_string(),
        LabelKind::Email => {
            let (first, last) = person(rng);
            format!(
                "{}.{}{}@example.{}",
                first.to_lowercase(),
                last.to_lowercase(),
                rng.gen_range(1..100),
                pick(rng, TLDS)
            )
        }
        LabelKind::Ssn => {
            let (area, group, serial) = ssn_parts(rng);
            format!("{area:03}-{group:02}-{serial:04}")
        }
        LabelKind::UsBankingInfo => routing_number(rng),
        LabelKind::CreditCard => {
            let mut d = vec![4];
            d.extend(digits(rng, 14));
            d.push(luhn_check_digit(&d));
            join_digits(&d)
        }
        LabelKind::PhoneNumber => format!(
            "+1-{}{:02}-{}{:02}-{:04}",
            rng.gen_range(2..10),
            rng.gen_range(0..100),
            rng.gen_range(2..10),
            rng.gen_range(0..100),
            rng.gen_range(0..10_000)
        ),
        LabelKind::IpAddress => format!(
            "{}.{}.{}.{}",
            rng.gen_range(1..=223),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(1..=254)
        ),
        LabelKind::ZipCode => format!("{:05}", rng.gen_range(501..=99_950)),
        LabelKind::Address => format!(
            "{} {} {}",
            rng.gen_range(1..10_000),
            pick(rng, STREETS),
            pick(rng, STREET_SUFFIXES)
        ),
        LabelKind::City => pick(rng, CITIES).to_string(),
        LabelKind::Country => pick(rng, COUNTRIES).to_string(),
        LabelKind::Date => date(rng).format("%Y-%m-%d").to_string(),
        LabelKind::Uuid => uuid(rng),
        LabelKind::Url => format!(
            "https://www.{}.{}/{}",
            pick(rng, WORDS),
            pick(rng, TLDS),
            pick(rng, WORDS)
        ),
        LabelKind::Username => {
            let (first, last) = person(rng);
            format!(
                "{}{}{}",
                first.to_lowercase(),
                last.chars().next().unwrap_or('x').to_ascii_lowercase(),
                rng.gen_range(10..100)
            )
        }
        LabelKind::Password => password(rng),
        LabelKind::String => random_letters(rng, 10),
        LabelKind::Integer => return json!(rng.gen_range(0..=9_999_999)),
        LabelKind::Number => return json!(rng.gen_range(0.0..=9_999_999.0)),
        LabelKind::Boolean => return Value::Bool(rng.gen_bool(0.5)),
        LabelKind::Array => return json!([random_letters(rng, 8)]),
        LabelKind::Object => {
            let mut obj = Map::new();
            obj.insert(pick(rng, WORDS).to_string(), Value::String(random_letters(rng, 8)));
            return Value::Object(obj);
        }
    };
    Value::String(s)
}

fn password<R: Rng + ?Sized>(rng: &mut R) -> String {
    const UPPER: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ";
    const LOWER: &[u8] = b"abcdefghijkmnopqrstuvwxyz";
    const DIGITS: &[u8] = b"23456789";
    const SYMBOLS: &[u8] = b"!@#$%^&*";

    let mut chars: Vec<u8> = [UPPER, LOWER, DIGITS, SYMBOLS]
        .iter()
        .flat_map(|set| (0..3).map(|_| set[rng.gen_range(0..set.len())]).collect::<Vec<_>>())
        .collect();
    chars.shuffle(rng);
    chars.into_iter().map(char::from).collect()
}

/// A value that is recognisably wrong for `kind`.
pub fn invalid<R: Rng + ?Sized>(kind: LabelKind, rng: &mut R) -> Value {
    let s = match kind {
        LabelKind::Email => {
            let (first, last) = person(rng);
            format!("{}.{}.example.com", first.to_lowercase(), last.to_lowercase())
        }
        LabelKind::Ssn => {
            let (_, group, serial) = ssn_parts(rng);
            let area = if rng.gen_bool(0.5) { 0 } else { 666 };
            format!("{area:03}-{group:02}-{serial:04}")
        }
        LabelKind::UsBankingInfo => {
            let mut d = routing_payload(rng);
            let check = aba_check_digit(&d);
            d.push((check + rng.gen_range(1..10)) % 10);
            join_digits(&d)
        }
        LabelKind::CreditCard => {
            let mut d = vec![4];
            d.extend(digits(rng, 14));
            let check = luhn_check_digit(&d);
            d.push((check + rng.gen_range(1..10)) % 10);
            join_digits(&d)
        }
        LabelKind::PhoneNumber => format!("{:04}", rng.gen_range(0..10_000)),
        LabelKind::IpAddress => format!(
            "{}.{}.{}.{}",
            rng.gen_range(256..1000),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255),
            rng.gen_range(0..=255)
        ),
        LabelKind::ZipCode => format!("{:03}", rng.gen_range(0..1000)),
        // month and day out of range for a real year
        LabelKind::Date => format!(
            "{}-{}-{}",
            date(rng).year(),
            rng.gen_range(13..=19),
            rng.gen_range(32..=39)
        ),
        LabelKind::Uuid => format!("{}-{}", random_letters(rng, 8), random_letters(rng, 4)),
        LabelKind::Url => format!("htp:/{}", pick(rng, WORDS)),
        LabelKind::Username => format!(" {}!! ", random_letters(rng, 2)),
        LabelKind::Password => random_letters(rng, 3).to_lowercase(),
        LabelKind::FullName
        | LabelKind::FirstName
        | LabelKind::LastName
        | LabelKind::Address
        | LabelKind::City
        | LabelKind::Country => format!("{}#{}$", rng.gen_range(100..1000), rng.gen_range(10..100)),
        LabelKind::String => return json!(rng.gen_range(0..=9_999_999)),
        LabelKind::Integer | LabelKind::Number => random_letters(rng, 6),
        LabelKind::Boolean => "notabool".to_string(),
        LabelKind::Array | LabelKind::Object => random_letters(rng, 8),
    };
    Value::String(s)
}

/// Replace `count` characters of `value` starting at `fraction` of its length.
///
/// The window is shifted left so it always fits; strings shorter than `count`
/// are replaced entirely.
pub fn mutate<R: Rng + ?Sized>(value: &str, fraction: f64, count: usize, rng: &mut R) -> String {
    const POOL: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    let mut chars: Vec<char> = value.chars().collect();
    let len = chars.len();
    let count = count.min(len);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let start = ((fraction * len as f64) as usize).min(len - count);

    for c in &mut chars[start..start + count] {
        let mut replacement = POOL[rng.gen_range(0..POOL.len())] as char;
        while replacement == *c {
            replacement = POOL[rng.gen_range(0..POOL.len())] as char;
        }
        *c = replacement;
    }
    chars.into_iter().collect()
}
