use serde_json::{Number, Value};

use crate::{database::SqlType, error::{PivotError, Result}};

/// The per-cell state of an aggregate.
/// The evaluator will:
///   1) call `update` with the value of every row that lands in the cell
///   2) after all rows, call `finalize()`
pub trait Accumulator: Send {
    fn update(&mut self, value: &Value) -> Result<()>;

    fn finalize(&self) -> Value;
}

/// AVG with SQL Server result typing: integer inputs yield an integer
/// truncated toward zero, exact numerics keep at least six fractional digits.
pub struct AvgAcc {
    /// Exact running sum for integral inputs.
    int_sum: i128,
    sum: f64,
    cnt: i64,
    input: SqlType,
}

impl AvgAcc {
    pub fn new(input: SqlType) -> Self {
        Self { int_sum: 0, sum: 0.0, cnt: 0, input }
    }

    /// Declared type of the values `finalize` produces for a given input type.
    pub fn result_type(input: SqlType) -> SqlType {
        match input {
            SqlType::Bit | SqlType::TinyInt | SqlType::SmallInt => SqlType::Int,
            SqlType::Decimal { scale, .. } | SqlType::Numeric { scale, .. } => {
                SqlType::Decimal { precision: 38, scale: scale.max(6) }
            }
            SqlType::Real => SqlType::Float,
            other => other,
        }
    }
}

impl Accumulator for AvgAcc {
    fn update(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => {}
            Value::Number(n) if self.input.is_integral() => {
                let i = match (n.as_i64(), n.as_u64()) {
                    (Some(i), _) => i128::from(i),
                    (None, Some(u)) => i128::from(u),
                    _ => return Err(PivotError::rejected("AVG", format!("AVG got non integral value {n} for {}", self.input))),
                };
                self.int_sum += i;
                self.cnt += 1;
            }
            Value::Number(n) => {
                let Some(f) = n.as_f64() else {
                    return Err(PivotError::rejected("AVG", "AVG got non numeric number"));
                };
                self.sum += f;
                self.cnt += 1;
            }
            Value::Bool(b) if self.input == SqlType::Bit => { self.int_sum += i128::from(u8::from(*b)); self.cnt += 1; }
            other => return Err(PivotError::rejected("AVG", format!("AVG got non numeric value {other}"))),
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.cnt == 0 {
            return Value::Null;
        }
        if self.input.is_integral() {
            // i128 division truncates toward zero
            let avg = self.int_sum / i128::from(self.cnt);
            return i64::try_from(avg).map(|i| Value::Number(Number::from(i))).unwrap_or(Value::Null);
        }
        let avg = self.sum / (self.cnt as f64);
        let avg = match Self::result_type(self.input).scale() {
            Some(scale) => {
                let factor = 10f64.powi(scale as i32);
                (avg * factor).round() / factor
            }
            None => avg,
        };
        Number::from_f64(avg).map(Value::Number).unwrap_or(Value::Null)
    }
}
