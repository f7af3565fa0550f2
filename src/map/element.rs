// ============================================================================
// shared-map - Elements
// Record identifiers and the trait that extracts them
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

// =============================================================================
// ID
// =============================================================================

/// The value of a record's key field.
///
/// Ids compare the way object keys do: a string holding the canonical
/// decimal form of an integer is the same key as that integer, so
/// `Id::Num(1) == Id::Str("1".into())`. `"01"`, `"+1"` and `"-0"` are not
/// canonical and stay plain strings. Conversions from strings produce
/// `Num` whenever the two would be equal anyway.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(untagged))]
pub enum Id {
    Num(i64),
    Str(String),
}

/// Borrowed comparison form of an [`Id`].
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdKey<'a> {
    Num(i64),
    Str(&'a str),
}

/// `Some(n)` only if `s` is exactly how `n` prints.
fn canonical_int(s: &str) -> Option<i64> {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let leading_zero = digits.len() > 1 && digits.starts_with('0');
    let all_digits = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
    if !all_digits || leading_zero || s == "-0" {
        return None;
    }
    s.parse().ok()
}

impl Id {
    fn key(&self) -> IdKey<'_> {
        match self {
            Id::Num(n) => IdKey::Num(*n),
            Id::Str(s) => canonical_int(s).map_or(IdKey::Str(s), IdKey::Num),
        }
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for Id {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Id {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Num(n) => write!(f, "{n}"),
            Id::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        canonical_int(value).map_or_else(|| Id::Str(value.to_string()), Id::Num)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        match canonical_int(&value) {
            Some(n) => Id::Num(n),
            None => Id::Str(value),
        }
    }
}

impl From<&String> for Id {
    fn from(value: &String) -> Self {
        Id::from(value.as_str())
    }
}

impl From<&Id> for Id {
    fn from(value: &Id) -> Self {
        value.clone()
    }
}

macro_rules! id_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Id {
                fn from(value: $t) -> Self {
                    Id::Num(i64::from(value))
                }
            }
        )*
    };
}

id_from_int!(i8, i16, i32, i64, u8, u16, u32);

// Integers past i64 keep their decimal form, which is still a unique key
macro_rules! id_from_wide_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Id {
                fn from(value: $t) -> Self {
                    i64::try_from(value).map_or_else(|_| Id::Str(value.to_string()), Id::Num)
                }
            }
        )*
    };
}

id_from_wide_int!(u64, usize, isize);

// =============================================================================
// ELEMENT
// =============================================================================

/// A record that can live in a [`SharedMap`](crate::SharedMap).
///
/// `key_field` is the name the map was created with. Structs with a fixed id
/// field may ignore it; dynamic records look the field up by name.
///
/// # Example
///
/// ```
/// use shared_map::{Element, Id};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct User {
///     id: u32,
///     name: String,
/// }
///
/// impl Element for User {
///     fn id(&self, _key_field: &str) -> Option<Id> {
///         Some(self.id.into())
///     }
/// }
///
/// let ada = User { id: 7, name: "Ada".into() };
/// assert_eq!(ada.id("id"), Some(Id::Num(7)));
/// ```
pub trait Element: Clone + PartialEq + 'static {
    /// Extract the identifier stored in `key_field`, if there is a usable one.
    fn id(&self, key_field: &str) -> Option<Id>;
}

#[cfg(feature = "json")]
impl Element for serde_json::Value {
    /// Objects only; the field must hold a string or an integer. Integral
    /// floats such as `1.0` count as integers.
    fn id(&self, key_field: &str) -> Option<Id> {
        match self.get(key_field)? {
            serde_json::Value::String(s) => Some(Id::from(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Id::Num(i))
                } else if let Some(u) = n.as_u64() {
                    Some(Id::from(u))
                } else {
                    n.as_f64().and_then(float_id)
                }
            }
            _ => None,
        }
    }
}

#[cfg(feature = "json")]
fn float_id(f: f64) -> Option<Id> {
    // 2^63 is exactly representable; anything at or beyond it does not fit
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    if (-LIMIT..LIMIT).contains(&f) {
        Some(Id::Num(f as i64))
    } else {
        Some(Id::Str(format!("{f:.0}")))
    }
}

// =============================================================================
// TESTS
// =============================================================================
