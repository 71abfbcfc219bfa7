//! Method-name grammar: `name` | `service "_" name`.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid method format: `{0}` contains more than one `_`")]
pub struct MethodFormatError(pub String);

/// A method name resolved into the registry coordinates of a procedure.
///
/// `procedure` is already PascalCased; it may be empty (`"service_"`), which is
/// syntactically valid but never resolves to a registered procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodPath {
    pub service: String,
    pub procedure: String,
}

impl fmt::Display for MethodPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.service.is_empty() {
            write!(f, "{}", self.procedure)
        } else {
            write!(f, "{}_{}", self.service, self.procedure)
        }
    }
}

/// Splits a method string into service and procedure.
///
/// No `_` yields the empty service, exactly one `_` splits around it, more than
/// one is rejected.
pub fn parse_method(method: &str) -> Result<MethodPath, MethodFormatError> {
    let mut parts = method.split('_');
    let (service, procedure) = match (parts.next(), parts.next(), parts.next()) {
        (Some(procedure), None, _) => ("", procedure),
        (Some(service), Some(procedure), None) => (service, procedure),
        _ => return Err(MethodFormatError(method.to_string())),
    };

    Ok(MethodPath {
        service: service.to_string(),
        procedure: to_pascal_case(procedure),
    })
}

/// Upper-cases the first character and keeps the rest untouched.
///
/// A first character whose upper case spans several characters (`ß`) is kept as is.
pub fn to_pascal_case(name: &str) -> String {
    map_first(name, char::to_uppercase)
}

/// Inverse of [`to_pascal_case`] for wire method names.
pub(crate) fn to_camel_case(name: &str) -> String {
    map_first(name, char::to_lowercase)
}

fn map_first<I>(name: &str, convert: impl Fn(char) -> I) -> String
where
    I: Iterator<Item = char>,
{
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let mut mapped = convert(first);
    let head = match (mapped.next(), mapped.next()) {
        (Some(single), None) => single,
        _ => first,
    };
    std::iter::once(head).chain(chars).collect()
}
