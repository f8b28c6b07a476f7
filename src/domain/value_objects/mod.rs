//! Value Objects for the storefront

use regex::{Regex, RegexBuilder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

/// Currencies the payment provider charges in whole units.
const ZERO_DECIMAL_CURRENCIES: [&str; 8] = ["bif", "clp", "jpy", "krw", "pyg", "vnd", "xaf", "xof"];

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_lowercase() } }

    /// Integer amount in the currency's minor unit (cents for most).
    ///
    /// The scaled value is rounded half away from zero, so `19.995` becomes
    /// `2000` and `19.994` becomes `1999`. Zero-decimal currencies are
    /// rounded to whole units.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        if self.amount.is_sign_negative() { return Err(MoneyError::Negative); }
        let scale = if ZERO_DECIMAL_CURRENCIES.contains(&self.currency.as_str()) { Decimal::ONE } else { Decimal::ONE_HUNDRED };
        (self.amount * scale)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoneyError {
    #[error("amount must not be negative")]
    Negative,
    #[error("amount does not fit in minor units")]
    Overflow,
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn covers(&self, requested: u32) -> bool { requested <= self.0 }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Brand {
    Nike,
    Adidas,
    Puma,
    Levi,
    Zara,
    #[serde(rename = "h&m")]
    #[strum(serialize = "h&m")]
    HAndM,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Men,
    Women,
    Kids,
    Accessories,
    Footwear,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Star rating left with a review, 1 to 5 inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&value) { return Err(RatingError(value)); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Rating> for u8 { fn from(r: Rating) -> Self { r.0 } }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rating {0} is outside 1..=5")]
pub struct RatingError(pub u8);

/// Catalog ordering accepted by the listing endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString)]
pub enum SortOrder {
    #[default]
    #[strum(serialize = "price-lowtohigh")]
    #[serde(rename = "price-lowtohigh")]
    PriceAsc,
    #[strum(serialize = "price-hightolow")]
    #[serde(rename = "price-hightolow")]
    PriceDesc,
    #[strum(serialize = "title-atoz")]
    #[serde(rename = "title-atoz")]
    TitleAsc,
    #[strum(serialize = "title-ztoa")]
    #[serde(rename = "title-ztoa")]
    TitleDesc,
}

impl SortOrder {
    /// Unknown values fall back to price ascending.
    pub fn from_param(value: Option<&str>) -> Self {
        value.and_then(|v| v.trim().parse().ok()).unwrap_or_default()
    }
}

/// Case-insensitive substring search term with regex metacharacters escaped.
#[derive(Clone, Debug)]
pub struct SearchKeyword { raw: String, pattern: String, matcher: Regex }

impl SearchKeyword {
    pub const MIN_LEN: usize = 3;

    pub fn new(value: &str) -> Result<Self, KeywordError> {
        let raw = value.trim();
        if raw.chars().count() < Self::MIN_LEN { return Err(KeywordError::TooShort); }
        let pattern = regex::escape(raw);
        let matcher = RegexBuilder::new(&pattern).case_insensitive(true).build().map_err(|_| KeywordError::Invalid)?;
        Ok(Self { raw: raw.to_string(), pattern, matcher })
    }

    pub fn as_str(&self) -> &str { &self.raw }
    /// Escaped pattern, safe to hand to a regex engine.
    pub fn pattern(&self) -> &str { &self.pattern }
    pub fn matches(&self, haystack: &str) -> bool { self.matcher.is_match(haystack) }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeywordError {
    #[error("Search keyword must be a non-empty string with at least 3 characters")]
    TooShort,
    #[error("Search keyword is not searchable")]
    Invalid,
}

/// Parses a comma separated filter list, ignoring blanks.
pub fn parse_csv<T: std::str::FromStr>(value: Option<&str>) -> Result<Vec<T>, String> {
    let Some(value) = value else { return Ok(vec![]) };
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<T>().map_err(|_| s.to_string()))
        .collect()
}
