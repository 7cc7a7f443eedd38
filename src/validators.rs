//! Form-field validation rules.
//!
//! A [`Rule`] is a stateless predicate with a fixed error message. A
//! [`FieldValidator`] groups the rules attached to one input field; every rule
//! must pass, and the first failure's message is what the field shows.
//! Input is always trimmed before any rule sees it.

use crate::errors::Result;
use chrono::format::{Parsed, StrftimeItems};
use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static CVV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}$").expect("static regex"));
static EXPIRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/(\d{2})$").expect("static regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z ]{2,}$").expect("static regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ().-]{5,18}[0-9]$").expect("static regex"));
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?[a-zA-Z0-9-]+(\.[a-zA-Z0-9-]+)*\.[a-zA-Z]{2,}(:\d+)?(/\S*)?$")
        .expect("static regex")
});

#[derive(Debug, Clone)]
enum RuleKind {
    NotBlank,
    Pattern(Regex),
    ExactLength(usize),
    MinLength(usize),
    MaxLength(usize),
    LengthRange(usize, usize),
    CardNumber,
    Expiry,
    Cvv,
    Email,
    Name,
    DateFormat(String),
    Phone,
    Url,
}

/// A single validation rule and the message shown when it fails.
///
/// # Examples
///
/// ```
/// use inapppay_rs::validators::Rule;
///
/// let rule = Rule::card_number("Invalid card number");
/// assert!(rule.check("4111 1111 1111 1111".replace(' ', "").as_str()));
/// assert!(!rule.check("4111111111111112"));
/// ```
#[derive(Debug, Clone)]
pub struct Rule {
    message: String,
    kind: RuleKind,
}

impl Rule {
    fn new(message: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// Input must not be empty after trimming.
    pub fn not_blank(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::NotBlank)
    }

    /// Input must match `pattern` in full.
    pub fn pattern(message: impl Into<String>, pattern: &str) -> Result<Self> {
        let anchored = Regex::new(&format!("^(?:{})$", pattern))?;
        Ok(Self::new(message, RuleKind::Pattern(anchored)))
    }

    /// Exactly `length` characters.
    pub fn exact_length(message: impl Into<String>, length: usize) -> Self {
        Self::new(message, RuleKind::ExactLength(length))
    }

    /// At least `min` characters.
    pub fn min_length(message: impl Into<String>, min: usize) -> Self {
        Self::new(message, RuleKind::MinLength(min))
    }

    /// At most `max` characters.
    pub fn max_length(message: impl Into<String>, max: usize) -> Self {
        Self::new(message, RuleKind::MaxLength(max))
    }

    /// Length between `min` and `max`, both inclusive.
    pub fn length_range(message: impl Into<String>, min: usize, max: usize) -> Self {
        Self::new(message, RuleKind::LengthRange(min, max))
    }

    /// 12 to 19 digits with a valid Luhn checksum.
    pub fn card_number(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::CardNumber)
    }

    /// `MM/YY`, not earlier than the current month.
    pub fn expiry(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Expiry)
    }

    /// 3 or 4 digits.
    pub fn cvv(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Cvv)
    }

    /// `local@domain.tld` shape.
    pub fn email(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Email)
    }

    /// Letters and spaces, at least two characters.
    pub fn name(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Name)
    }

    /// Input must parse strictly with the given `chrono` strftime format.
    pub fn date_format(message: impl Into<String>, format: impl Into<String>) -> Self {
        Self::new(message, RuleKind::DateFormat(format.into()))
    }

    /// Digits with optional `+`, spaces, dots, dashes and parentheses.
    pub fn phone(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Phone)
    }

    /// Host name with optional scheme, port and path.
    pub fn url(message: impl Into<String>) -> Self {
        Self::new(message, RuleKind::Url)
    }

    /// Message reported when the rule fails.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Checks `input` against the rule using today's local date.
    pub fn check(&self, input: &str) -> bool {
        self.check_at(input, Local::now().date_naive())
    }

    /// Checks `input` against the rule as if the current date were `today`.
    pub fn check_at(&self, input: &str, today: NaiveDate) -> bool {
        let text = input.trim();
        let length = text.chars().count();

        match &self.kind {
            RuleKind::NotBlank => !text.is_empty(),
            RuleKind::Pattern(re) => re.is_match(text),
            RuleKind::ExactLength(n) => length == *n,
            RuleKind::MinLength(min) => length >= *min,
            RuleKind::MaxLength(max) => length <= *max,
            RuleKind::LengthRange(min, max) => length >= *min && length <= *max,
            RuleKind::CardNumber => (12..=19).contains(&length) && luhn_valid(text),
            RuleKind::Expiry => expiry_not_past(text, today),
            RuleKind::Cvv => CVV_RE.is_match(text),
            RuleKind::Email => EMAIL_RE.is_match(text),
            RuleKind::Name => NAME_RE.is_match(text),
            RuleKind::DateFormat(format) => {
                let mut parsed = Parsed::new();
                chrono::format::parse(&mut parsed, text, StrftimeItems::new(format)).is_ok()
            }
            RuleKind::Phone => PHONE_RE.is_match(text),
            RuleKind::Url => URL_RE.is_match(text),
        }
    }
}

/// Luhn checksum over an all-digit string.
///
/// Returns false for any non-digit character.
pub fn luhn_valid(number: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

fn expiry_not_past(text: &str, today: NaiveDate) -> bool {
    let Some(caps) = EXPIRY_RE.captures(text) else {
        return false;
    };
    let (Ok(month), Ok(year)) = (caps[1].parse::<u32>(), caps[2].parse::<i32>()) else {
        return false;
    };
    let year = 2000 + year;
    year > today.year() || (year == today.year() && month >= today.month())
}

/// The rules attached to one input field.
#[derive(Debug, Clone, Default)]
pub struct FieldValidator {
    rules: Vec<Rule>,
}

impl FieldValidator {
    /// Starts a validator builder.
    pub fn builder() -> FieldValidatorBuilder {
        FieldValidatorBuilder::default()
    }

    /// Validates against today's local date.
    ///
    /// Returns the first failing rule's message.
    pub fn validate(&self, input: &str) -> std::result::Result<(), &str> {
        self.validate_at(input, Local::now().date_naive())
    }

    /// Validates as if the current date were `today`.
    pub fn validate_at(&self, input: &str, today: NaiveDate) -> std::result::Result<(), &str> {
        match self.rules.iter().find(|rule| !rule.check_at(input, today)) {
            Some(rule) => Err(rule.message()),
            None => Ok(()),
        }
    }

    /// Whether every rule passes today.
    pub fn is_valid(&self, input: &str) -> bool {
        self.validate(input).is_ok()
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Card number field: required, Luhn-valid.
    pub fn card_number() -> Self {
        Self::builder()
            .rule(Rule::not_blank("Card number is required"))
            .rule(Rule::card_number("Invalid card number"))
            .build()
    }

    /// Expiry field: required, `MM/YY`, not expired.
    pub fn expiry() -> Self {
        Self::builder()
            .rule(Rule::not_blank("Expiry is required"))
            .rule(Rule::expiry("Use a valid MM/YY date"))
            .build()
    }

    /// CVV field: required, 3 or 4 digits.
    pub fn cvv() -> Self {
        Self::builder()
            .rule(Rule::not_blank("CVV is required"))
            .rule(Rule::cvv("Invalid CVV"))
            .build()
    }

    /// Cardholder name field.
    pub fn cardholder_name() -> Self {
        Self::builder()
            .rule(Rule::not_blank("Name is required"))
            .rule(Rule::name("Invalid name"))
            .build()
    }

    /// PayPal email field.
    pub fn email() -> Self {
        Self::builder()
            .rule(Rule::not_blank("Email is required"))
            .rule(Rule::email("Invalid email format"))
            .build()
    }
}

/// Builder for [`FieldValidator`].
#[derive(Debug, Default)]
pub struct FieldValidatorBuilder {
    rules: Vec<Rule>,
}

impl FieldValidatorBuilder {
    /// Appends a rule; rules run in insertion order.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Finishes the validator.
    pub fn build(self) -> FieldValidator {
        FieldValidator { rules: self.rules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_2025() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_card_number_rule() {
        let rule = Rule::card_number("bad card");
        assert!(rule.check("4111111111111111"));
        assert!(!rule.check("4111111111111112"));
        assert!(!rule.check("4111111111"));
        assert!(!rule.check("41111111111111a1"));
        assert!(rule.check("  4111111111111111  "));
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
        assert!(luhn_valid("5555555555554444"));
    }

    #[test]
    fn test_expiry_rule() {
        let rule = Rule::expiry("expired");
        assert!(!rule.check_at("05/25", june_2025()));
        assert!(rule.check_at("06/25", june_2025()));
        assert!(rule.check_at("01/30", june_2025()));
        assert!(!rule.check_at("13/30", june_2025()));
        assert!(!rule.check_at("6/25", june_2025()));
        assert!(!rule.check_at("12/24", june_2025()));
    }

    #[test]
    fn test_cvv_and_name_rules() {
        let cvv = Rule::cvv("bad cvv");
        assert!(cvv.check("123"));
        assert!(cvv.check("1234"));
        assert!(!cvv.check("12"));
        assert!(!cvv.check("12a"));

        let name = Rule::name("bad name");
        assert!(name.check("Jane Doe"));
        assert!(!name.check("J"));
        assert!(!name.check("Jane D0e"));
    }

    #[test]
    fn test_email_rule() {
        let email = Rule::email("bad email");
        assert!(email.check("payer@example.com"));
        assert!(!email.check("payer@example"));
        assert!(!email.check("not an email"));
    }

    #[test]
    fn test_length_rules_count_characters() {
        assert!(Rule::exact_length("len", 3).check(" abc "));
        assert!(Rule::min_length("len", 2).check("éé"));
        assert!(!Rule::max_length("len", 2).check("abc"));
        assert!(Rule::length_range("len", 2, 4).check("abcd"));
        assert!(!Rule::length_range("len", 2, 4).check("a"));
    }

    #[test]
    fn test_pattern_rule_is_full_match() {
        let rule = Rule::pattern("digits", r"\d{16}").unwrap();
        assert!(rule.check("4111111111111111"));
        assert!(!rule.check("4111111111111111x"));
        assert!(Rule::pattern("broken", "(").is_err());
    }

    #[test]
    fn test_date_format_rule() {
        let rule = Rule::date_format("Use MM/YY", "%m/%y");
        assert!(rule.check("12/30"));
        assert!(!rule.check("1230"));
    }

    #[test]
    fn test_phone_and_url_rules() {
        assert!(Rule::phone("phone").check("+1 (555) 123-4567"));
        assert!(!Rule::phone("phone").check("call me"));
        assert!(Rule::url("url").check("https://example.com/path"));
        assert!(!Rule::url("url").check("not a url"));
    }

    #[test]
    fn test_field_validator_reports_first_failure() {
        let validator = FieldValidator::card_number();
        assert_eq!(validator.validate("   "), Err("Card number is required"));
        assert_eq!(validator.validate("1234"), Err("Invalid card number"));
        assert_eq!(validator.validate("4111111111111111"), Ok(()));
    }

    #[test]
    fn test_empty_validator_accepts_anything() {
        let validator = FieldValidator::builder().build();
        assert!(validator.is_valid(""));
        assert!(validator.rules().is_empty());
    }
}
