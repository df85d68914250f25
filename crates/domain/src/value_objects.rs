//! Value objects shared by the cart, catalog and order models.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        /// Older documents hold numeric ids.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                crate::lenient::string(deserializer).map(Self)
            }
        }

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }
    };
}

string_id!(
    /// Catalog product identifier.
    ProductId
);

string_id!(
    /// Identifier of a product variant (size/color combination).
    VariantId
);

/// An amount of money held as integer cents.
///
/// Arithmetic saturates at the `i64` bounds instead of overflowing.
///
/// Documents store amounts as JSON numbers in major units (`12.5`), and
/// historical documents also hold integers and numeric strings, so the
/// serde impls convert at the boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money {
    cents: i64,
}

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Converts an amount in major units, rounding to the nearest cent.
    /// Non-finite input yields zero.
    pub fn from_major(amount: f64) -> Self {
        if amount.is_finite() {
            Self::from_cents((amount * 100.0).round() as i64)
        } else {
            Self::zero()
        }
    }

    pub const fn zero() -> Self {
        Self::from_cents(0)
    }

    pub fn cents(&self) -> i64 {
        self.cents
    }

    pub fn as_major(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Price of `quantity` units.
    pub fn multiply(&self, quantity: u32) -> Money {
        Self::from_cents(self.cents.saturating_mul(i64::from(quantity)))
    }

    /// Applies a percentage discount, rounding to the nearest cent.
    pub fn percent_off(&self, percent: u8) -> Money {
        let keep = i128::from(100 - percent.min(100));
        let cents = (i128::from(self.cents) * keep + 50).div_euclid(100);
        Self::from_cents(i64::try_from(cents).unwrap_or(i64::MAX))
    }

    /// Two-decimal rendering without a currency sign, as used in exports.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        format!("{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let decimal = self.to_decimal_string();
        match decimal.strip_prefix('-') {
            Some(amount) => write!(f, "-${amount}"),
            None => write!(f, "${decimal}"),
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_cents(self.cents.saturating_add(rhs.cents))
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::from_cents(self.cents.saturating_sub(rhs.cents))
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.cents % 100 == 0 {
            serializer.serialize_i64(self.cents / 100)
        } else {
            serializer.serialize_f64(self.as_major())
        }
    }
}

struct MoneyVisitor;

impl<'de> Visitor<'de> for MoneyVisitor {
    type Value = Money;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a monetary amount as a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Money, E> {
        Ok(Money::from_cents(v.saturating_mul(100)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Money, E> {
        let v = i64::try_from(v).map_err(|_| E::custom("amount out of range"))?;
        self.visit_i64(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Money, E> {
        Ok(Money::from_major(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Money, E> {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            return Ok(Money::zero());
        }
        trimmed
            .parse::<f64>()
            .map(Money::from_major)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_none<E: de::Error>(self) -> Result<Money, E> {
        Ok(Money::zero())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Money, D::Error> {
        d.deserialize_any(MoneyVisitor)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoneyVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_transparent_strings() {
        let product: ProductId = "hoodie-01".into();
        assert_eq!(product.to_string(), "hoodie-01");
        assert_eq!(serde_json::to_string(&VariantId::new("v-m")).unwrap(), "\"v-m\"");
    }

    #[test]
    fn test_money_from_major_rounds_to_cents() {
        assert_eq!(Money::from_major(12.345).cents(), 1235);
        assert_eq!(Money::from_major(0.1 + 0.2).cents(), 30);
        assert_eq!(Money::from_major(f64::NAN), Money::zero());
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(4900).to_string(), "$49.00");
        assert_eq!(Money::from_cents(7).to_string(), "$0.07");
        assert_eq!(Money::from_cents(-1950).to_string(), "-$19.50");
    }

    #[test]
    fn test_money_decimal_string() {
        assert_eq!(Money::from_cents(1234).to_decimal_string(), "12.34");
        assert_eq!(Money::from_cents(700).to_decimal_string(), "7.00");
        assert_eq!(Money::from_cents(-5).to_decimal_string(), "-0.05");
    }

    #[test]
    fn test_line_arithmetic() {
        let shirt = Money::from_cents(2450);
        let shipping = Money::from_cents(500);

        let subtotal = shirt.multiply(2);
        assert_eq!(subtotal.cents(), 4900);
        assert_eq!((subtotal + shipping).cents(), 5400);
        assert_eq!((shipping - shirt).cents(), -1950);
        assert_eq!([shirt, shipping].into_iter().sum::<Money>().cents(), 2950);
    }

    #[test]
    fn test_arithmetic_saturates_instead_of_overflowing() {
        let huge = Money::from_major(1e17);
        assert_eq!(huge.cents(), i64::MAX);
        assert_eq!(huge.multiply(2).cents(), i64::MAX);
        assert_eq!((huge + Money::from_cents(1)).cents(), i64::MAX);
        assert_eq!([huge, huge].into_iter().sum::<Money>().cents(), i64::MAX);
        assert_eq!((Money::from_cents(i64::MIN) - huge).cents(), i64::MIN);
        assert_eq!(huge.percent_off(50).cents(), i64::MAX / 2 + 1);
    }

    #[test]
    fn test_percent_off() {
        assert_eq!(Money::from_cents(1000).percent_off(20).cents(), 800);
        assert_eq!(Money::from_cents(999).percent_off(15).cents(), 849);
        assert_eq!(Money::from_cents(1000).percent_off(150).cents(), 0);
    }

    #[test]
    fn test_money_serializes_in_major_units() {
        assert_eq!(serde_json::to_string(&Money::from_cents(1250)).unwrap(), "12.5");
        assert_eq!(serde_json::to_string(&Money::from_cents(1200)).unwrap(), "12");
    }

    #[test]
    fn test_money_reads_inconsistent_historical_values() {
        let from_int: Money = serde_json::from_str("25").unwrap();
        let from_float: Money = serde_json::from_str("19.99").unwrap();
        let from_str: Money = serde_json::from_str("\"7.5\"").unwrap();
        let from_null: Money = serde_json::from_str("null").unwrap();

        assert_eq!(from_int.cents(), 2500);
        assert_eq!(from_float.cents(), 1999);
        assert_eq!(from_str.cents(), 750);
        assert_eq!(from_null, Money::zero());
        assert!(serde_json::from_str::<Money>("\"abc\"").is_err());
    }
}
