use crate::foundation::util::amount::{btc_to_satoshi, parse_decimal_scaled, satoshi_to_btc_string};
use crate::foundation::AMOUNT_DECIMALS;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// BTC amount held in satoshis. Accepts `"0.2"` or `0.2` on the wire; serializes as a decimal string.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BtcAmount(u64);

impl BtcAmount {
    pub const fn from_satoshi(satoshi: u64) -> Self {
        Self(satoshi)
    }

    pub const fn satoshi(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BtcAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&satoshi_to_btc_string(self.0))
    }
}

impl Serialize for BtcAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BtcAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(DecimalTextVisitor)?;
        btc_to_satoshi("btc amount", &raw).map(BtcAmount).map_err(de::Error::custom)
    }
}

/// Decimal quantity (ticker prices) scaled by `10^AMOUNT_DECIMALS`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i128);

impl Decimal {
    pub fn parse(field: &str, raw: &str) -> crate::foundation::Result<Self> {
        parse_decimal_scaled(field, raw, AMOUNT_DECIMALS).map(Decimal)
    }

    pub const fn scaled(&self) -> i128 {
        self.0
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10i128.pow(AMOUNT_DECIMALS);
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:0width$}", sign, abs / scale, abs % scale, width = AMOUNT_DECIMALS as usize)
    }
}

impl Serialize for Decimal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_any(DecimalTextVisitor)?;
        Decimal::parse("decimal", &raw).map_err(de::Error::custom)
    }
}

struct DecimalTextVisitor;

impl<'de> Visitor<'de> for DecimalTextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal number or decimal string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        if !v.is_finite() {
            return Err(E::custom("non-finite decimal"));
        }
        Ok(v.to_string())
    }
}
