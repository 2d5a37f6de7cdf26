use std::{fmt::Display, str::FromStr};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z0-9]*)\s*(?:\(\s*([^)]*?)\s*\))?\s*$").expect("valid type pattern")
});

/// Declared length of a character column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharLength {
    Fixed(u32),
    Max,
}

impl Display for CharLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CharLength::Fixed(n) => write!(f, "{n}"),
            CharLength::Max => f.write_str("max"),
        }
    }
}

/// Declared column type as reported by the catalog.
///
/// Covers the SQL Server types a pivot source realistically carries. Parsing
/// is case-insensitive and `Display` renders the canonical lower-case form used
/// in generated DDL (`decimal(10,2)`, `nvarchar(max)`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SqlType {
    Bit,
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    Real,
    Float,
    Decimal { precision: u8, scale: u8 },
    Numeric { precision: u8, scale: u8 },
    Money,
    Char(CharLength),
    VarChar(CharLength),
    NChar(CharLength),
    NVarChar(CharLength),
    Text,
    Date,
    DateTime,
    DateTime2,
    Time,
}

impl SqlType {
    pub fn is_integral(&self) -> bool {
        matches!(self, SqlType::Bit | SqlType::TinyInt | SqlType::SmallInt | SqlType::Int | SqlType::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || matches!(self, SqlType::Real | SqlType::Float | SqlType::Decimal { .. } | SqlType::Numeric { .. } | SqlType::Money)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, SqlType::Char(_) | SqlType::VarChar(_) | SqlType::NChar(_) | SqlType::NVarChar(_) | SqlType::Text)
    }

    /// Fractional digits kept for exact numerics, `None` for everything else.
    pub fn scale(&self) -> Option<u8> {
        match self {
            SqlType::Decimal { scale, .. } | SqlType::Numeric { scale, .. } => Some(*scale),
            SqlType::Money => Some(4),
            _ => None,
        }
    }

    /// Infer a declared type from a JSON value found in seed data.
    ///
    /// Integers map to `bigint`, other numbers to `float`, booleans to `bit`
    /// and strings to `text_type`. Nulls, arrays and objects carry no type.
    pub fn of_value(v: &Value, text_type: SqlType) -> Option<SqlType> {
        match v {
            Value::Bool(_) => Some(SqlType::Bit),
            Value::Number(n) => {
                if n.is_i64() || n.is_u64() {
                    Some(SqlType::BigInt)
                } else {
                    Some(SqlType::Float)
                }
            }
            Value::String(_) => Some(text_type),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Promote two inferred types to a common one when merging seed rows.
    ///
    /// Integers widen to `float` when mixed with floats; otherwise the first
    /// seen type wins.
    pub fn promote(a: SqlType, b: SqlType) -> SqlType {
        if a == b {
            return a;
        }
        match (a, b) {
            (x, y) if x.is_integral() && matches!(y, SqlType::Float | SqlType::Real) => y,
            (x, _) => x,
        }
    }

    /// Convert a value into the representation stored in a column of this type.
    ///
    /// Exact numerics are rounded to their scale, integral types accept floats
    /// without a fractional part and `bit` accepts booleans. Returns `None`
    /// when the value cannot be stored.
    pub fn coerce(&self, v: &Value) -> Option<Value> {
        if v.is_null() {
            return Some(Value::Null);
        }
        if self.is_integral() {
            let i = match v {
                Value::Bool(b) if *self == SqlType::Bit => i64::from(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(i) => i,
                    None => {
                        let f = n.as_f64()?;
                        if f.fract() != 0.0 || f < i64::MIN as f64 || f > i64::MAX as f64 {
                            return None;
                        }
                        f as i64
                    }
                },
                _ => return None,
            };
            let fits = match self {
                SqlType::Bit => i == 0 || i == 1,
                SqlType::TinyInt => (0..=255).contains(&i),
                SqlType::SmallInt => i16::try_from(i).is_ok(),
                SqlType::Int => i32::try_from(i).is_ok(),
                _ => true,
            };
            return fits.then(|| Value::Number(Number::from(i)));
        }
        if self.is_numeric() {
            let f = v.as_f64()?;
            let f = match self.scale() {
                Some(scale) => Self::round_to(f, scale),
                None => f,
            };
            if let SqlType::Decimal { precision, scale } | SqlType::Numeric { precision, scale } = self {
                let integral_digits = f.abs().trunc().to_string().trim_start_matches('0').len();
                if integral_digits > (*precision as usize).saturating_sub(*scale as usize) {
                    return None;
                }
            }
            return Number::from_f64(f).map(Value::Number);
        }
        let s = v.as_str()?;
        if self.is_text() {
            let fits = match self {
                SqlType::Char(CharLength::Fixed(n))
                | SqlType::VarChar(CharLength::Fixed(n))
                | SqlType::NChar(CharLength::Fixed(n))
                | SqlType::NVarChar(CharLength::Fixed(n)) => s.chars().count() <= *n as usize,
                _ => true,
            };
            return fits.then(|| v.clone());
        }
        let parses = match self {
            SqlType::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
            SqlType::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f").is_ok(),
            _ => ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
                .iter()
                .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok()),
        };
        parses.then(|| v.clone())
    }

    fn round_to(f: f64, scale: u8) -> f64 {
        let factor = 10f64.powi(scale as i32);
        (f * factor).round() / factor
    }

    fn parse_length(name: &str, arg: Option<&str>) -> Result<CharLength, String> {
        match arg {
            None => Ok(CharLength::Fixed(1)),
            Some(a) if a.eq_ignore_ascii_case("max") => Ok(CharLength::Max),
            Some(a) => {
                let n = a.parse::<u32>().map_err(|_| format!("invalid length {a:?} for {name}"))?;
                if n == 0 || n > 8000 {
                    return Err(format!("length {n} out of range for {name}"));
                }
                Ok(CharLength::Fixed(n))
            }
        }
    }

    fn parse_precision(name: &str, arg: Option<&str>) -> Result<(u8, u8), String> {
        let Some(arg) = arg else {
            return Ok((18, 0));
        };
        let mut parts = arg.split(',').map(str::trim);
        let precision = parts.next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid precision in {name}({arg})"))?;
        let scale = match parts.next() {
            Some(s) => s.parse::<u8>().map_err(|_| format!("invalid scale in {name}({arg})"))?,
            None => 0,
        };
        if parts.next().is_some() || precision == 0 || precision > 38 || scale > precision {
            return Err(format!("invalid precision/scale in {name}({arg})"));
        }
        Ok((precision, scale))
    }
}

impl FromStr for SqlType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = TYPE_PATTERN.captures(s)
            .ok_or_else(|| format!("unrecognized type {s:?}"))?;
        let name = caps[1].to_ascii_lowercase();
        let arg = caps.get(2).map(|m| m.as_str());
        let no_args = |ty: SqlType| match arg {
            None => Ok(ty),
            Some(_) => Err(format!("type {name} takes no arguments")),
        };

        match name.as_str() {
            "bit" => no_args(SqlType::Bit),
            "tinyint" => no_args(SqlType::TinyInt),
            "smallint" => no_args(SqlType::SmallInt),
            "int" | "integer" => no_args(SqlType::Int),
            "bigint" => no_args(SqlType::BigInt),
            "real" => no_args(SqlType::Real),
            "float" => Ok(SqlType::Float),
            "money" => no_args(SqlType::Money),
            "text" | "ntext" => no_args(SqlType::Text),
            "date" => no_args(SqlType::Date),
            "datetime" => no_args(SqlType::DateTime),
            "datetime2" => Ok(SqlType::DateTime2),
            "time" => Ok(SqlType::Time),
            "decimal" | "dec" => {
                let (precision, scale) = Self::parse_precision(&name, arg)?;
                Ok(SqlType::Decimal { precision, scale })
            }
            "numeric" => {
                let (precision, scale) = Self::parse_precision(&name, arg)?;
                Ok(SqlType::Numeric { precision, scale })
            }
            "char" => Ok(SqlType::Char(Self::parse_length(&name, arg)?)),
            "varchar" => Ok(SqlType::VarChar(Self::parse_length(&name, arg)?)),
            "nchar" => Ok(SqlType::NChar(Self::parse_length(&name, arg)?)),
            "nvarchar" => Ok(SqlType::NVarChar(Self::parse_length(&name, arg)?)),
            other => Err(format!("unsupported type {other:?}")),
        }
    }
}

impl Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlType::Bit => f.write_str("bit"),
            SqlType::TinyInt => f.write_str("tinyint"),
            SqlType::SmallInt => f.write_str("smallint"),
            SqlType::Int => f.write_str("int"),
            SqlType::BigInt => f.write_str("bigint"),
            SqlType::Real => f.write_str("real"),
            SqlType::Float => f.write_str("float"),
            SqlType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            SqlType::Numeric { precision, scale } => write!(f, "numeric({precision},{scale})"),
            SqlType::Money => f.write_str("money"),
            SqlType::Char(len) => write!(f, "char({len})"),
            SqlType::VarChar(len) => write!(f, "varchar({len})"),
            SqlType::NChar(len) => write!(f, "nchar({len})"),
            SqlType::NVarChar(len) => write!(f, "nvarchar({len})"),
            SqlType::Text => f.write_str("text"),
            SqlType::Date => f.write_str("date"),
            SqlType::DateTime => f.write_str("datetime"),
            SqlType::DateTime2 => f.write_str("datetime2"),
            SqlType::Time => f.write_str("time"),
        }
    }
}
