use std::fmt;
use std::path::PathBuf;

/// Default coercion of the values gathered for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// The option never appeared (or no positional token was left).
    Absent,
    /// A flag was present but carries no values.
    Flag,
    Scalar(String),
    Sequence(Vec<String>),
}

impl RawValue {
    /// Collapse a gathered value list: `None` is absent, an empty list is a
    /// bare flag, one value is a scalar, more values are a sequence.
    pub fn from_values(values: Option<Vec<String>>) -> Self {
        match values {
            None => Self::Absent,
            Some(mut v) => match v.len() {
                0 => Self::Flag,
                1 => Self::Scalar(v.remove(0)),
                _ => Self::Sequence(v),
            },
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Every string carried, in order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Absent | Self::Flag => Vec::new(),
            Self::Scalar(s) => vec![s.as_str()],
            Self::Sequence(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("<absent>"),
            Self::Flag => f.write_str("<flag>"),
            Self::Scalar(s) => f.write_str(s),
            Self::Sequence(v) => f.write_str(&v.join(" ")),
        }
    }
}

/// Built-in conversion used when no converter is registered for a field type.
pub trait FromRaw: Sized {
    fn from_raw(raw: &RawValue) -> Result<Self, String>;
}

fn single(raw: &RawValue) -> Result<&str, String> {
    match raw {
        RawValue::Scalar(s) => Ok(s.as_str()),
        RawValue::Absent => Err("no value".to_string()),
        RawValue::Flag => Err("expected a value".to_string()),
        RawValue::Sequence(v) => Err(format!("expected a single value, got {}", v.len())),
    }
}

macro_rules! from_raw_via_from_str {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FromRaw for $ty {
                fn from_raw(raw: &RawValue) -> Result<Self, String> {
                    single(raw)?.parse::<$ty>().map_err(|e| e.to_string())
                }
            }
        )*
    };
}

from_raw_via_from_str!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char,
);

impl FromRaw for String {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        single(raw).map(str::to_string)
    }
}

impl FromRaw for PathBuf {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        single(raw).map(PathBuf::from)
    }
}

impl FromRaw for bool {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        match raw {
            RawValue::Flag => Ok(true),
            _ => single(raw)?.parse::<bool>().map_err(|e| e.to_string()),
        }
    }
}

impl FromRaw for RawValue {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        Ok(raw.clone())
    }
}

impl<T: FromRaw> FromRaw for Option<T> {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        match raw {
            RawValue::Absent => Ok(None),
            _ => T::from_raw(raw).map(Some),
        }
    }
}

impl<T: FromRaw> FromRaw for Vec<T> {
    fn from_raw(raw: &RawValue) -> Result<Self, String> {
        match raw {
            RawValue::Absent | RawValue::Flag => Ok(Vec::new()),
            RawValue::Scalar(_) => Ok(vec![T::from_raw(raw)?]),
            RawValue::Sequence(values) => values
                .iter()
                .map(|v| T::from_raw(&RawValue::Scalar(v.clone())))
                .collect(),
        }
    }
}
