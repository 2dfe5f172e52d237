//! Synthetic data for `(( fake_<category> ))` expressions.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use uuid::Uuid;

/// Source of generated values, keyed by category name.
pub trait FakeData: Send + Sync {
    /// Generate a fresh value for `category`, or `None` if the category is
    /// not supported.
    fn generate(&self, category: &str) -> Option<Value>;
}

/// Default generator backed by small built-in word lists.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faker;

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "Robert", "Patricia", "John", "Jennifer", "Michael", "Linda", "David",
    "Elizabeth", "William", "Barbara", "Richard", "Susan", "Joseph", "Jessica", "Thomas",
    "Sarah", "Charles", "Karen", "Daniel", "Nancy", "Matthew", "Lisa", "Anthony", "Betty",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez",
    "Martinez", "Hernandez", "Lopez", "Gonzalez", "Wilson", "Anderson", "Thomas", "Taylor",
    "Moore", "Jackson", "Martin", "Lee", "Perez", "Thompson", "White", "Harris", "Clark",
];

const STREET_SUFFIXES: &[&str] = &["Street", "Avenue", "Road", "Lane", "Drive", "Court", "Way"];

const CITIES: &[&str] = &[
    "Springfield", "Riverside", "Franklin", "Greenville", "Bristol", "Clinton", "Fairview",
    "Salem", "Madison", "Georgetown", "Arlington", "Ashland", "Dover", "Milton",
];

const STATES: &[&str] = &[
    "AL", "AK", "AZ", "CA", "CO", "CT", "FL", "GA", "IL", "IN", "MA", "MI", "MN", "NC", "NJ",
    "NY", "OH", "OR", "PA", "TX", "VA", "WA", "WI",
];

const COUNTRIES: &[&str] = &[
    "United States", "Canada", "Mexico", "Brazil", "United Kingdom", "France", "Germany",
    "Spain", "Italy", "Japan", "Australia", "India", "Norway", "Kenya",
];

const COMPANY_SUFFIXES: &[&str] = &["Inc", "LLC", "Group", "and Sons", "Ltd", "PLC"];

const DOMAINS: &[&str] = &["example.com", "example.org", "example.net"];

const TLDS: &[&str] = &["com", "org", "net", "info", "biz"];

const WORDS: &[&str] = &[
    "alias", "consequatur", "aut", "perferendis", "sit", "voluptatem", "accusantium",
    "doloremque", "aperiam", "eaque", "ipsa", "quae", "ab", "illo", "inventore", "veritatis",
    "et", "quasi", "architecto", "beatae", "vitae", "dicta", "sunt", "explicabo", "nemo",
    "enim", "ipsam", "quia", "voluptas", "aspernatur", "odit", "fugit", "sed", "magni",
];

fn pick(list: &[&'static str]) -> &'static str {
    list.choose(&mut rand::thread_rng()).copied().unwrap_or_default()
}

fn digits(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

fn words(n: usize) -> Vec<&'static str> {
    (0..n).map(|_| pick(WORDS)).collect()
}

fn sentence() -> String {
    let n = rand::thread_rng().gen_range(4..10);
    let mut s = words(n).join(" ");
    if let Some(first) = s.get(0..1) {
        let upper = first.to_uppercase();
        s.replace_range(0..1, &upper);
    }
    s.push('.');
    s
}

fn paragraph() -> String {
    let n = rand::thread_rng().gen_range(3..6);
    (0..n).map(|_| sentence()).collect::<Vec<_>>().join(" ")
}

fn user_name() -> String {
    format!(
        "{}.{}{}",
        pick(FIRST_NAMES).to_lowercase(),
        pick(LAST_NAMES).to_lowercase(),
        rand::thread_rng().gen_range(1..100)
    )
}

/// Luhn-valid 16-digit number starting with 4.
fn credit_card_number() -> String {
    let mut body: Vec<u32> = std::iter::once(4)
        .chain((0..14).map(|_| rand::thread_rng().gen_range(0..10)))
        .collect();
    let sum: u32 = body
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 0 {
                let dd = d * 2;
                if dd > 9 {
                    dd - 9
                } else {
                    dd
                }
            } else {
                d
            }
        })
        .sum();
    body.push((10 - sum % 10) % 10);
    body.iter().map(|d| char::from(b'0' + *d as u8)).collect()
}

fn street_address() -> String {
    format!(
        "{} {} {}",
        rand::thread_rng().gen_range(1..9999),
        pick(LAST_NAMES),
        pick(STREET_SUFFIXES)
    )
}

impl FakeData for Faker {
    fn generate(&self, category: &str) -> Option<Value> {
        let mut rng = rand::thread_rng();
        let value = match category {
            "first_name" => Value::from(pick(FIRST_NAMES)),
            "last_name" => Value::from(pick(LAST_NAMES)),
            "name" => Value::from(format!("{} {}", pick(FIRST_NAMES), pick(LAST_NAMES))),
            "user_name" => Value::from(user_name()),
            "email" => Value::from(format!("{}@{}", user_name(), pick(DOMAINS))),
            "password" => {
                const CHARSET: &[u8] =
                    b"abcdefghijkmnopqrstuvwxyzABCDEFGHJKLMNPQRSTUVWXYZ23456789!@#$%";
                let pw: String = (0..12)
                    .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
                    .collect();
                Value::from(pw)
            }
            "phone_number" => Value::from(format!(
                "({}) {}-{}",
                rng.gen_range(200..999),
                digits(3),
                digits(4)
            )),
            "street_address" => Value::from(street_address()),
            "city" => Value::from(pick(CITIES)),
            "state" => Value::from(pick(STATES)),
            "zipcode" | "postcode" => Value::from(digits(5)),
            "address" => Value::from(format!(
                "{}\n{}, {} {}",
                street_address(),
                pick(CITIES),
                pick(STATES),
                digits(5)
            )),
            "country" => Value::from(pick(COUNTRIES)),
            "company" => Value::from(format!("{} {}", pick(LAST_NAMES), pick(COMPANY_SUFFIXES))),
            "word" => Value::from(pick(WORDS)),
            "sentence" => Value::from(sentence()),
            "paragraph" | "text" => Value::from(paragraph()),
            "url" => Value::from(format!(
                "https://www.{}.{}/",
                pick(LAST_NAMES).to_lowercase(),
                pick(TLDS)
            )),
            "date" => {
                let days = rng.gen_range(0..365 * 30);
                let date = chrono::Local::now().date_naive() - chrono::Duration::days(days);
                Value::from(date.format("%Y-%m-%d").to_string())
            }
            "credit_card_number" => Value::from(credit_card_number()),
            "ssn" => Value::from(format!("{}-{}-{}", digits(3), digits(2), digits(4))),
            "uuid4" => Value::from(Uuid::new_v4().to_string()),
            "pyint" => Value::from(rng.gen_range(0..=9999)),
            "boolean" => Value::from(rng.gen::<bool>()),
            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_categories() {
        let faker = Faker;
        for category in ["name", "email", "address", "phone_number", "company", "date"] {
            let v = faker.generate(category).unwrap();
            assert!(!v.as_str().unwrap().is_empty(), "{} was empty", category);
        }
        assert!(faker.generate("pyint").unwrap().is_i64());
        assert!(faker.generate("boolean").unwrap().is_boolean());
    }

    #[test]
    fn test_unknown_category() {
        assert!(Faker.generate("nonsense").is_none());
    }

    #[test]
    fn test_email_shape() {
        let email = Faker.generate("email").unwrap();
        let email = email.as_str().unwrap();
        let (user, domain) = email.split_once('@').unwrap();
        assert!(!user.is_empty());
        assert!(DOMAINS.contains(&domain));
    }

    #[test]
    fn test_credit_card_is_luhn_valid() {
        let number = credit_card_number();
        assert_eq!(number.len(), 16);
        let sum: u32 = number
            .chars()
            .rev()
            .enumerate()
            .map(|(i, c)| {
                let d = c.to_digit(10).unwrap();
                if i % 2 == 1 {
                    let dd = d * 2;
                    if dd > 9 {
                        dd - 9
                    } else {
                        dd
                    }
                } else {
                    d
                }
            })
            .sum();
        assert_eq!(sum % 10, 0);
    }

    #[test]
    fn test_uuid_shape() {
        let id = Faker.generate("uuid4").unwrap();
        let id = id.as_str().unwrap();
        assert_eq!(id.len(), 36);
        assert_eq!(&id[14..15], "4");
    }
}
