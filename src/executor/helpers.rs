use serde_json::Value;

pub struct Helpers;

impl Helpers {
    /// Key used to group rows by a value. Numerically equal values (`1` and
    /// `1.0`) share a key.
    pub fn group_key(value: &Value) -> String {
        match value {
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => i.to_string(),
                (None, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
                _ => n.to_string(),
            },
            other => other.to_string(),
        }
    }

    /// Text a category value turns into when it names a pivot column.
    ///
    /// Strings are used as-is, numbers in their shortest form and bits as
    /// `1`/`0`. NULL cannot name a column.
    pub fn label_of(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(if *b { "1".to_string() } else { "0".to_string() }),
            Value::Number(_) => Some(Self::group_key(value)),
            other => Some(other.to_string()),
        }
    }

    // NULLS LAST comparator helper (ascending flag)
    pub fn cmp_json_for_sort(a: &Value, b: &Value, ascending: bool) -> std::cmp::Ordering {
        use std::cmp::Ordering::*;
        use serde_json::Value::*;
        let directed = |ord: std::cmp::Ordering| if ascending { ord } else { ord.reverse() };
        match (a, b) {
            (Null, Null) => Equal,
            (Null, _)    => Greater,
            (_, Null)    => Less,
            (Bool(x), Bool(y)) => directed(x.cmp(y)),
            (Number(x), Number(y)) => {
                let ord = match (x.as_f64(), y.as_f64()) {
                    (Some(ax), Some(by)) => ax.partial_cmp(&by).unwrap_or(Equal),
                    _ => x.to_string().cmp(&y.to_string()),
                };
                directed(ord)
            },
            (String(x), String(y)) => directed(x.cmp(y)),
            (Array(_), Array(_)) | (Object(_), Object(_)) => directed(a.to_string().cmp(&b.to_string())),
            (lhs, rhs) => directed(Self::type_rank(lhs).cmp(&Self::type_rank(rhs))),
        }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0, Value::Bool(_) => 1, Value::Number(_) => 2, Value::String(_) => 3,
            Value::Array(_) => 4, Value::Object(_) => 5
        }
    }
}
