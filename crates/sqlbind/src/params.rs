//! Parameter normalization
//!
//! Callers hand parameters over in several shapes: nothing at all, one bare
//! scalar, one positional list, one name-to-value map, or several scalars in
//! a row. [`normalize`] folds every shape into a [`BindParams`], which is
//! either positional or named. Statements branch on that tag to pick the
//! matching native call.

use std::collections::{BTreeMap, HashMap};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::BindValue;

/// A single caller-supplied argument
#[derive(Debug, Clone, PartialEq)]
pub enum BindArg {
    /// One bare scalar
    Value(BindValue),
    /// An ordered list of values
    Positional(Vec<BindValue>),
    /// Values keyed by parameter name, prefix included (`$id`, `:id`, `@id`)
    Named(IndexMap<String, BindValue>),
}

/// Everything a caller passed to one statement call
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BindArgs {
    /// No argument
    #[default]
    None,
    /// Exactly one argument
    One(BindArg),
    /// Several scalar arguments (variadic form)
    Many(Vec<BindValue>),
}

/// Canonical parameters handed to the native statement
#[derive(Debug, Clone, PartialEq)]
pub enum BindParams {
    Positional(Vec<BindValue>),
    Named(IndexMap<String, BindValue>),
}

impl Default for BindParams {
    fn default() -> Self {
        BindParams::Positional(Vec::new())
    }
}

impl BindParams {
    /// True iff the parameters bind by name
    pub fn is_named(&self) -> bool {
        matches!(self, BindParams::Named(_))
    }

    pub fn len(&self) -> usize {
        match self {
            BindParams::Positional(values) => values.len(),
            BindParams::Named(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fold caller arguments into canonical parameters.
///
/// Several arguments become a positional list, no argument becomes an empty
/// list, a bare scalar becomes a one-element list, and a list or map passes
/// through untouched.
pub fn normalize(args: BindArgs) -> BindParams {
    match args {
        BindArgs::Many(values) => BindParams::Positional(values),
        BindArgs::None => BindParams::Positional(Vec::new()),
        BindArgs::One(BindArg::Value(value)) => BindParams::Positional(vec![value]),
        BindArgs::One(BindArg::Positional(values)) => BindParams::Positional(values),
        BindArgs::One(BindArg::Named(values)) => BindParams::Named(values),
    }
}

impl BindArgs {
    /// One positional list argument
    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<BindValue>,
    {
        BindArgs::One(BindArg::Positional(
            values.into_iter().map(Into::into).collect(),
        ))
    }

    /// One named-map argument
    pub fn named<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<BindValue>,
    {
        BindArgs::One(BindArg::Named(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }
}

impl From<BindArg> for BindArgs {
    fn from(arg: BindArg) -> Self {
        BindArgs::One(arg)
    }
}

impl From<BindParams> for BindArgs {
    fn from(params: BindParams) -> Self {
        match params {
            BindParams::Positional(values) => BindArgs::One(BindArg::Positional(values)),
            BindParams::Named(values) => BindArgs::One(BindArg::Named(values)),
        }
    }
}

impl From<()> for BindArgs {
    fn from(_: ()) -> Self {
        BindArgs::None
    }
}

impl From<BindValue> for BindArgs {
    fn from(value: BindValue) -> Self {
        BindArgs::One(BindArg::Value(value))
    }
}

macro_rules! impl_scalar_arg {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BindArgs {
                fn from(value: $ty) -> Self {
                    BindArgs::One(BindArg::Value(value.into()))
                }
            }
        )*
    };
}

impl_scalar_arg!(i8, i16, i32, i64, u8, u16, u32, f32, f64, bool, &str, String);

impl<T: Into<BindValue>> From<Option<T>> for BindArgs {
    fn from(value: Option<T>) -> Self {
        BindArgs::One(BindArg::Value(value.into()))
    }
}

impl<T: Into<BindValue>> From<Vec<T>> for BindArgs {
    fn from(values: Vec<T>) -> Self {
        BindArgs::positional(values)
    }
}

impl<T: Into<BindValue>, const N: usize> From<[T; N]> for BindArgs {
    fn from(values: [T; N]) -> Self {
        BindArgs::positional(values)
    }
}

impl<T: Into<BindValue> + Clone> From<&[T]> for BindArgs {
    fn from(values: &[T]) -> Self {
        BindArgs::positional(values.iter().cloned())
    }
}

impl<K: Into<String>, V: Into<BindValue>> From<IndexMap<K, V>> for BindArgs {
    fn from(values: IndexMap<K, V>) -> Self {
        BindArgs::named(values)
    }
}

impl<K: Into<String>, V: Into<BindValue>> From<HashMap<K, V>> for BindArgs {
    fn from(values: HashMap<K, V>) -> Self {
        BindArgs::named(values)
    }
}

impl<K: Into<String>, V: Into<BindValue>> From<BTreeMap<K, V>> for BindArgs {
    fn from(values: BTreeMap<K, V>) -> Self {
        BindArgs::named(values)
    }
}

macro_rules! impl_variadic_args {
    ($($name:ident),+) => {
        impl<$($name: Into<BindValue>),+> From<($($name,)+)> for BindArgs {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                BindArgs::Many(vec![$($name.into()),+])
            }
        }
    };
}

impl_variadic_args!(A, B);
impl_variadic_args!(A, B, C);
impl_variadic_args!(A, B, C, D);
impl_variadic_args!(A, B, C, D, E);
impl_variadic_args!(A, B, C, D, E, F);
impl_variadic_args!(A, B, C, D, E, F, G);
impl_variadic_args!(A, B, C, D, E, F, G, H);

/// JSON arguments as a host runtime sends them: an array binds positionally,
/// an object binds by name, null means no argument, any other scalar is a
/// single positional value. Composite elements are rejected.
impl TryFrom<serde_json::Value> for BindArgs {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Null => Ok(BindArgs::None),
            serde_json::Value::Array(items) => {
                let values = items
                    .into_iter()
                    .map(BindValue::try_from)
                    .collect::<Result<Vec<_>>>()?;
                Ok(BindArgs::One(BindArg::Positional(values)))
            }
            serde_json::Value::Object(entries) => {
                let values = entries
                    .into_iter()
                    .map(|(name, v)| Ok::<_, Error>((name, BindValue::try_from(v)?)))
                    .collect::<Result<IndexMap<_, _>>>()?;
                Ok(BindArgs::One(BindArg::Named(values)))
            }
            scalar => Ok(BindArgs::One(BindArg::Value(BindValue::try_from(scalar)?))),
        }
    }
}

/// Variadic positional arguments.
///
/// ```
/// use sqlbind::{bind, normalize, BindParams, BindValue};
///
/// let params = normalize(bind![1, "two", 3.0]);
/// assert_eq!(
///     params,
///     BindParams::Positional(vec![
///         BindValue::Integer(1),
///         BindValue::Text("two".into()),
///         BindValue::Real(3.0),
///     ])
/// );
/// ```
#[macro_export]
macro_rules! bind {
    () => {
        $crate::BindArgs::None
    };
    ($($value:expr),+ $(,)?) => {
        $crate::BindArgs::Many(vec![$($crate::BindValue::from($value)),+])
    };
}

/// Named arguments, keys spelled with their prefix.
///
/// ```
/// use sqlbind::{named, normalize};
///
/// let params = normalize(named! { "$id" => 7, "$name" => "ada" });
/// assert!(params.is_named());
/// ```
#[macro_export]
macro_rules! named {
    () => {
        $crate::BindArgs::named(::std::iter::empty::<(String, $crate::BindValue)>())
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        $crate::BindArgs::named([$(($name, $crate::BindValue::from($value))),*])
    };
}
