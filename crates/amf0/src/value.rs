//! AMF0 value types.

/// An ordered AMF0 object: key/value pairs in encoding order.
///
/// AMF0 objects preserve insertion order on the wire, so this is a vec of
/// pairs rather than a map.
pub type Amf0Object = Vec<(String, Amf0Value)>;

/// Represents any AMF0 value.
#[derive(Debug, PartialEq, Clone)]
pub enum Amf0Value {
    /// AMF0 Number.
    Number(f64),
    /// AMF0 Boolean.
    Boolean(bool),
    /// AMF0 String (normal or long).
    String(String),
    /// AMF0 Object (anonymous or typed, or an ECMA array read back).
    Object(Amf0Object),
    /// AMF0 Null (or Undefined read back).
    Null,
    /// AMF0 StrictArray.
    Array(Vec<Amf0Value>),
    /// AMF0 EcmaArray: an associative array with a length hint.
    EcmaArray(Amf0Object),
}

impl Amf0Value {
    /// Returns the number value, if this is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Amf0Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Amf0Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the object pairs for objects and ECMA arrays.
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(object) | Amf0Value::EcmaArray(object) => Some(object),
            _ => None,
        }
    }

    /// Looks up a field by key in an object or ECMA array.
    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Amf0Value::Number(value)
    }
}

impl From<bool> for Amf0Value {
    fn from(value: bool) -> Self {
        Amf0Value::Boolean(value)
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Amf0Value::String(value.to_owned())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Amf0Value::String(value)
    }
}

impl From<Amf0Object> for Amf0Value {
    fn from(value: Amf0Object) -> Self {
        Amf0Value::Object(value)
    }
}

impl From<Vec<Amf0Value>> for Amf0Value {
    fn from(value: Vec<Amf0Value>) -> Self {
        Amf0Value::Array(value)
    }
}

impl FromIterator<(String, Amf0Value)> for Amf0Value {
    fn from_iter<T: IntoIterator<Item = (String, Amf0Value)>>(iter: T) -> Self {
        Amf0Value::Object(iter.into_iter().collect())
    }
}
