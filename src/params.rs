//! Bound parameter values and their text representations
//!
//! The extended protocol here always binds parameters in text format:
//! strings go verbatim, scalars in canonical decimal/ISO-8601 form, and
//! `None` becomes the wire's `-1` null length. Arrays are rendered as
//! Postgres array literals.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");

/// One bound parameter: its text representation, or SQL null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param(Option<String>);

impl Param {
    /// SQL null (sent as length -1, no body)
    pub fn null() -> Self {
        Param(None)
    }

    /// A parameter from raw text
    pub fn text(text: impl Into<String>) -> Self {
        Param(Some(text.into()))
    }

    /// True when this parameter is SQL null
    pub fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The text representation, if not null
    pub fn as_text(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub(crate) fn clone_text(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Conversion of native values into bound parameters.
///
/// `to_array_elem` renders the value as one element of an array literal;
/// the default quotes the text form, which is safe for every type. Types
/// whose text can never contain `{ } , " \` or whitespace override it to
/// stay unquoted.
pub trait ToParam {
    /// The parameter text (or null) for this value
    fn to_param(&self) -> Param;

    /// This value as an array-literal element; `None` renders as `NULL`
    fn to_array_elem(&self) -> Option<String> {
        self.to_param().0.map(|text| quote_array_elem(&text))
    }
}

/// Double-quote an array element, escaping `"` and `\` with a backslash.
fn quote_array_elem(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

impl ToParam for Param {
    fn to_param(&self) -> Param {
        self.clone()
    }
}

impl ToParam for &str {
    fn to_param(&self) -> Param {
        Param(Some((*self).to_string()))
    }
}

impl ToParam for String {
    fn to_param(&self) -> Param {
        Param(Some(self.clone()))
    }
}

impl ToParam for bool {
    fn to_param(&self) -> Param {
        Param(Some(if *self { "true" } else { "false" }.to_string()))
    }

    fn to_array_elem(&self) -> Option<String> {
        Some(if *self { "true" } else { "false" }.to_string())
    }
}

macro_rules! numeric_to_param {
    ($($ty:ty),+) => {
        $(
            impl ToParam for $ty {
                fn to_param(&self) -> Param {
                    Param(Some(self.to_string()))
                }

                fn to_array_elem(&self) -> Option<String> {
                    Some(self.to_string())
                }
            }
        )+
    };
}

numeric_to_param!(i16, i32, i64, u32, f32, f64);

impl ToParam for uuid::Uuid {
    fn to_param(&self) -> Param {
        Param(Some(self.hyphenated().to_string()))
    }

    fn to_array_elem(&self) -> Option<String> {
        Some(self.hyphenated().to_string())
    }
}

impl ToParam for time::Date {
    fn to_param(&self) -> Param {
        Param(Some(
            self.format(DATE_FORMAT).expect("format is statically known"),
        ))
    }

    fn to_array_elem(&self) -> Option<String> {
        self.to_param().0
    }
}

impl ToParam for time::Time {
    fn to_param(&self) -> Param {
        Param(Some(
            self.format(TIME_FORMAT).expect("format is statically known"),
        ))
    }
}

impl ToParam for time::PrimitiveDateTime {
    fn to_param(&self) -> Param {
        Param(Some(
            self.format(TIMESTAMP_FORMAT)
                .expect("format is statically known"),
        ))
    }
}

impl ToParam for serde_json::Value {
    fn to_param(&self) -> Param {
        Param(Some(self.to_string()))
    }
}

impl ToParam for crate::types::Json {
    fn to_param(&self) -> Param {
        Param(Some(self.as_str().to_string()))
    }
}

impl<T: ToParam> ToParam for Option<T> {
    fn to_param(&self) -> Param {
        match self {
            Some(value) => value.to_param(),
            None => Param(None),
        }
    }

    fn to_array_elem(&self) -> Option<String> {
        match self {
            Some(value) => value.to_array_elem(),
            None => None,
        }
    }
}

impl<T: ToParam> ToParam for Vec<T> {
    fn to_param(&self) -> Param {
        self.as_slice().to_param()
    }
}

impl<T: ToParam> ToParam for &[T] {
    fn to_param(&self) -> Param {
        let mut literal = String::from("{");
        for (i, elem) in self.iter().enumerate() {
            if i > 0 {
                literal.push(',');
            }
            match elem.to_array_elem() {
                Some(text) => literal.push_str(&text),
                None => literal.push_str("NULL"),
            }
        }
        literal.push('}');
        Param(Some(literal))
    }
}

/// Build a `Vec<Param>` from heterogeneous values implementing [`ToParam`].
///
/// ```
/// use cassis_wire::params;
/// use cassis_wire::params::Param;
///
/// let p = params![1i32, "alpha", Option::<i32>::None, Param::null()];
/// assert_eq!(p.len(), 4);
/// assert!(p[2].is_null());
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::params::Param>::new()
    };
    ($($value:expr),+ $(,)?) => {
        ::std::vec![$($crate::params::ToParam::to_param(&$value)),+]
    };
}
