//! Typed argument values and the coercions that produce them.
//!
//! Every token consumed by the parser is turned into a [`Value`] by the
//! [`ValueType`] declared on its argument. Application types read bound
//! values back through [`FromValue`].
//!
//! # Examples
//!
//! ```
//! use argcommand_core::{Value, ValueType};
//!
//! assert_eq!(ValueType::Int.coerce("3"), Ok(Value::Int(3)));
//! assert!(ValueType::Int.coerce("three").is_err());
//!
//! let format = ValueType::Choice(vec!["json".into(), "yaml".into()]);
//! assert_eq!(format.coerce("yaml"), Ok(Value::Str("yaml".into())));
//! assert!(format.coerce("toml").is_err());
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Serialize, Serializer};

/// A file opened for reading by [`ValueType::InputFile`].
///
/// Clones share one buffered handle, and therefore one read cursor. Two
/// handles compare equal when they were opened from the same path.
#[derive(Clone)]
pub struct InputFile {
    path: PathBuf,
    reader: Arc<Mutex<BufReader<File>>>,
}

impl InputFile {
    /// Opens `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            reader: Arc::new(Mutex::new(BufReader::new(file))),
        })
    }

    /// Path the handle was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, BufReader<File>>> {
        self.reader.lock().map_err(|_| {
            io::Error::other(format!("handle for '{}' is poisoned", self.path.display()))
        })
    }

    /// Reads the line at the cursor, without its line terminator.
    ///
    /// Successive calls return successive lines; `None` at end of file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, including invalid UTF-8.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut reader = self.lock()?;
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(Some(line))
    }

    /// Rewinds to the start of the file and reads its first line.
    ///
    /// Returns an empty string for an empty file. The cursor is left after
    /// the first line.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error, including invalid UTF-8.
    pub fn read_first_line(&self) -> io::Result<String> {
        self.lock()?.seek(SeekFrom::Start(0))?;
        Ok(self.read_line()?.unwrap_or_default())
    }
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl PartialEq for InputFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.path.to_string_lossy())
    }
}

/// A coerced argument value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Plain text.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Boolean (also produced by switches).
    Bool(bool),
    /// Filesystem path, not checked for existence.
    Path(PathBuf),
    /// Open, readable file.
    File(InputFile),
    /// Values collected by a multi-token argument.
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Path(_) => "path",
            Value::File(_) => "file",
            Value::List(_) => "list",
        }
    }

    /// Returns the string slice for [`Value::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer for [`Value::Int`].
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the elements of [`Value::List`].
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::File(file) => write!(f, "{}", file.path().display()),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl From<InputFile> for Value {
    fn from(file: InputFile) -> Self {
        Value::File(file)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// A named, user-supplied coercion for [`ValueType::Custom`].
///
/// Two custom types are considered equal when their names match.
#[derive(Clone, Copy)]
pub struct CustomType {
    name: &'static str,
    coerce: fn(&str) -> Result<Value, String>,
}

impl CustomType {
    /// Name shown in diagnostics and serialized grammars.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Debug for CustomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomType").field(&self.name).finish()
    }
}

impl PartialEq for CustomType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Serialize for CustomType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

/// Coercion applied to the raw tokens of an argument.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ValueType {
    /// Keep the token as text (the default).
    #[default]
    String,
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// `true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`, case-insensitive.
    Bool,
    /// Filesystem path, not checked for existence.
    Path,
    /// Path that is opened for reading while parsing.
    InputFile,
    /// Text restricted to one of the listed choices.
    Choice(Vec<String>),
    /// Application-provided coercion.
    Custom(CustomType),
}

impl ValueType {
    /// Creates a [`ValueType::Custom`] from a plain function.
    ///
    /// # Examples
    ///
    /// ```
    /// use argcommand_core::{Value, ValueType};
    ///
    /// fn even(raw: &str) -> Result<Value, String> {
    ///     match raw.parse::<i64>() {
    ///         Ok(n) if n % 2 == 0 => Ok(Value::Int(n)),
    ///         _ => Err(format!("'{raw}' is not an even number")),
    ///     }
    /// }
    ///
    /// let ty = ValueType::custom("even", even);
    /// assert_eq!(ty.coerce("4"), Ok(Value::Int(4)));
    /// assert!(ty.coerce("5").is_err());
    /// ```
    pub fn custom(name: &'static str, coerce: fn(&str) -> Result<Value, String>) -> Self {
        ValueType::Custom(CustomType { name, coerce })
    }

    /// Name of the type as used in diagnostics.
    pub fn name(&self) -> &str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Path => "path",
            ValueType::InputFile => "file",
            ValueType::Choice(_) => "choice",
            ValueType::Custom(custom) => custom.name,
        }
    }

    /// Converts one raw token, returning a human-readable reason on failure.
    ///
    /// # Errors
    ///
    /// Returns the reason the token was rejected, phrased for the user.
    pub fn coerce(&self, raw: &str) -> Result<Value, String> {
        match self {
            ValueType::String => Ok(Value::Str(raw.to_string())),
            ValueType::Int => raw
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| format!("invalid int value: '{raw}'")),
            ValueType::Float => raw
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("invalid float value: '{raw}'")),
            ValueType::Bool => parse_bool(raw)
                .map(Value::Bool)
                .ok_or_else(|| format!("invalid bool value: '{raw}'")),
            ValueType::Path => {
                if raw.is_empty() {
                    Err("path cannot be empty".to_string())
                } else {
                    Ok(Value::Path(PathBuf::from(raw)))
                }
            }
            ValueType::InputFile => InputFile::open(raw)
                .map(Value::File)
                .map_err(|err| format!("can't open '{raw}': {err}")),
            ValueType::Choice(choices) => {
                if choices.iter().any(|c| c == raw) {
                    Ok(Value::Str(raw.to_string()))
                } else {
                    let quoted: Vec<String> = choices.iter().map(|c| format!("'{c}'")).collect();
                    Err(format!(
                        "invalid choice: '{raw}' (choose from {})",
                        quoted.join(", ")
                    ))
                }
            }
            ValueType::Custom(custom) => (custom.coerce)(raw),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Conversion from a bound [`Value`] into an application field type.
///
/// On a type mismatch the original value is handed back so the caller can
/// describe what was found.
pub trait FromValue: Sized {
    /// Type description used in binding diagnostics.
    const EXPECTED: &'static str;

    /// Converts a bound value.
    ///
    /// # Errors
    ///
    /// Returns the value unchanged when it has the wrong shape.
    fn from_value(value: Value) -> Result<Self, Value>;

    /// Value to use when the attribute was never bound, if any.
    fn from_missing() -> Option<Self> {
        None
    }
}

impl FromValue for Value {
    const EXPECTED: &'static str = "value";

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for String {
    const EXPECTED: &'static str = "string";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl FromValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(n) => Ok(n),
            other => Err(other),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {
        $(
            impl FromValue for $ty {
                const EXPECTED: &'static str = stringify!($ty);

                fn from_value(value: Value) -> Result<Self, Value> {
                    match value {
                        Value::Int(n) => <$ty>::try_from(n).map_err(|_| Value::Int(n)),
                        other => Err(other),
                    }
                }
            }
        )*
    };
}

narrow_int!(i32, u32, u64, usize);

impl FromValue for f64 {
    const EXPECTED: &'static str = "float";

    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(n) => Ok(n as f64),
            other => Err(other),
        }
    }
}

impl FromValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for PathBuf {
    const EXPECTED: &'static str = "path";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Path(p) => Ok(p),
            Value::File(file) => Ok(file.path().to_path_buf()),
            Value::Str(s) => Ok(PathBuf::from(s)),
            other => Err(other),
        }
    }
}

impl FromValue for InputFile {
    const EXPECTED: &'static str = "file";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::File(file) => Ok(file),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    const EXPECTED: &'static str = "list";

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            single => T::from_value(single).map(|item| vec![item]),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const EXPECTED: &'static str = T::EXPECTED;

    fn from_value(value: Value) -> Result<Self, Value> {
        T::from_value(value).map(Some)
    }

    fn from_missing() -> Option<Self> {
        Some(None)
    }
}
