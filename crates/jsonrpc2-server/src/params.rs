//! Argument coercion: binding a dynamic `params` value to typed formals.
//!
//! Each formal parameter is described by a [`ParamType`], which carries the
//! JSON Schema of the Rust type (via `schemars`) and a decoder producing a
//! type-erased [`Argument`]. The schema decides the parameter shape and provides
//! zero values for record fields the caller left out.

use std::any::{Any, TypeId};

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

/// A coerced argument, downcast back to its formal type at invocation.
pub type Argument = Box<dyn Any + Send>;

type Decoder = fn(Value) -> serde_json::Result<Argument>;

const MAX_SCHEMA_DEPTH: usize = 16;

/// Coarse JSON shape of a formal parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// Decodes from a JSON object (structs, maps).
    Record,
    /// Decodes from a JSON array (vectors, tuples, slices).
    Sequence,
    /// Anything else.
    Scalar,
    /// No type constraint (`serde_json::Value`); accepts any JSON value.
    Dynamic,
}

/// Runtime handle for one formal parameter type.
#[derive(Clone)]
pub struct ParamType {
    type_name: &'static str,
    type_id: TypeId,
    shape: ParamShape,
    nullable: bool,
    schema: Value,
    decode: Decoder,
}

impl std::fmt::Debug for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamType")
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .finish()
    }
}

impl ParamType {
    pub fn of<T>() -> Self
    where
        T: DeserializeOwned + JsonSchema + Send + 'static,
    {
        let schema = schemars::schema_for!(T).to_value();
        let defs = definitions(&schema);
        let shape = shape_of(&schema, defs);
        let nullable = shape == ParamShape::Dynamic || is_nullable(resolve(&schema, defs));

        Self {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
            shape,
            nullable,
            schema,
            decode: |value| serde_json::from_value::<T>(value).map(|v| Box::new(v) as Argument),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn shape(&self) -> ParamShape {
        self.shape
    }

    /// Whether the type decodes from `null` (`Option<T>`, `Value`).
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// JSON Schema of the formal type, as produced by `schemars`.
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Decodes one value into the formal type.
    ///
    /// A failed direct decode is retried once after narrowing integral floats
    /// and filling missing record fields with their zero values.
    pub fn coerce(&self, value: Value) -> serde_json::Result<Argument> {
        let first_error = match (self.decode)(value.clone()) {
            Ok(argument) => return Ok(argument),
            Err(error) => error,
        };

        let mut adjusted = value;
        narrow_floats(&mut adjusted);
        fill_missing_fields(&mut adjusted, &self.schema, definitions(&self.schema), 0);

        (self.decode)(adjusted).map_err(|_| first_error)
    }
}

#[derive(Debug, Error)]
pub enum CoercionError {
    #[error("invalid argument, expected array of {expected} params")]
    InvalidArgExpectedSlice { expected: usize },

    #[error("invalid arg type at position {position}: expected {type_name}: {source}")]
    InvalidArgType {
        position: usize,
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid number of params: expected {expected}, found {found}")]
    InvalidArgsNumber { expected: usize, found: usize },
}

/// Produces one argument per formal from the request `params`.
///
/// - no formals: `params` is ignored
/// - one formal: an object, or any array when the formal is a sequence or
///   dynamic type, is coerced whole; other arrays are treated positionally;
///   absent `params` binds `null` to a nullable formal; anything else is an
///   [`CoercionError::InvalidArgType`]
/// - several formals: `params` must be an array of exactly that length
pub fn coerce_arguments(
    formals: &[ParamType],
    params: Option<Value>,
) -> Result<Vec<Argument>, CoercionError> {
    match (formals, params) {
        ([], _) => Ok(Vec::new()),
        ([formal], params) => coerce_single(formal, params),
        (_, Some(Value::Array(values))) => coerce_positional(formals, values),
        _ => Err(CoercionError::InvalidArgExpectedSlice {
            expected: formals.len(),
        }),
    }
}

fn coerce_single(
    formal: &ParamType,
    params: Option<Value>,
) -> Result<Vec<Argument>, CoercionError> {
    let whole = match params {
        Some(value @ Value::Object(_)) => value,
        Some(Value::Array(values))
            if !matches!(formal.shape, ParamShape::Sequence | ParamShape::Dynamic) =>
        {
            return coerce_positional(std::slice::from_ref(formal), values);
        }
        Some(value @ Value::Array(_)) => value,
        None | Some(Value::Null) if formal.nullable => Value::Null,
        None | Some(Value::Null) => return Err(unstructured(formal, "params are required")),
        Some(_) => return Err(unstructured(formal, "params must be an array or an object")),
    };
    Ok(vec![coerce_at(formal, 0, whole)?])
}

fn unstructured(formal: &ParamType, reason: &str) -> CoercionError {
    CoercionError::InvalidArgType {
        position: 0,
        type_name: formal.type_name,
        source: serde::de::Error::custom(reason),
    }
}

fn coerce_positional(
    formals: &[ParamType],
    values: Vec<Value>,
) -> Result<Vec<Argument>, CoercionError> {
    if values.len() != formals.len() {
        return Err(CoercionError::InvalidArgsNumber {
            expected: formals.len(),
            found: values.len(),
        });
    }

    formals
        .iter()
        .zip(values)
        .enumerate()
        .map(|(position, (formal, value))| coerce_at(formal, position, value))
        .collect()
}

fn coerce_at(formal: &ParamType, position: usize, value: Value) -> Result<Argument, CoercionError> {
    formal
        .coerce(value)
        .map_err(|source| CoercionError::InvalidArgType {
            position,
            type_name: formal.type_name,
            source,
        })
}

fn definitions(root: &Value) -> Option<&Map<String, Value>> {
    root.get("$defs")
        .or_else(|| root.get("definitions"))
        .and_then(Value::as_object)
}

/// Follows a local `$ref` into the root definitions.
fn resolve<'a>(schema: &'a Value, defs: Option<&'a Map<String, Value>>) -> &'a Value {
    let target = schema
        .get("$ref")
        .and_then(Value::as_str)
        .and_then(|path| {
            path.strip_prefix("#/$defs/")
                .or_else(|| path.strip_prefix("#/definitions/"))
        })
        .and_then(|name| defs?.get(name));

    target.unwrap_or(schema)
}

fn type_names(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(name)) => vec![name.as_str()],
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// The non-null branch of an `anyOf`/`oneOf`, as generated for `Option<T>`.
fn non_null_branch(schema: &Value) -> Option<&Value> {
    schema
        .get("anyOf")
        .or_else(|| schema.get("oneOf"))
        .and_then(Value::as_array)?
        .iter()
        .find(|branch| type_names(branch) != ["null"])
}

fn is_nullable(schema: &Value) -> bool {
    if type_names(schema).contains(&"null") {
        return true;
    }
    schema
        .get("anyOf")
        .or_else(|| schema.get("oneOf"))
        .and_then(Value::as_array)
        .is_some_and(|branches| branches.iter().any(|b| type_names(b) == ["null"]))
}

fn shape_of(schema: &Value, defs: Option<&Map<String, Value>>) -> ParamShape {
    let schema = resolve(schema, defs);
    if is_unconstrained(schema) {
        return ParamShape::Dynamic;
    }
    let types = type_names(schema);

    if types.contains(&"array") {
        ParamShape::Sequence
    } else if types.contains(&"object") {
        ParamShape::Record
    } else if let Some(branch) = non_null_branch(schema) {
        shape_of(branch, defs)
    } else {
        ParamShape::Scalar
    }
}

/// `true`, or an object schema with no keyword restricting the value.
fn is_unconstrained(schema: &Value) -> bool {
    const CONSTRAINTS: [&str; 10] = [
        "type", "$ref", "anyOf", "oneOf", "allOf", "enum", "const", "properties", "items", "not",
    ];
    match schema {
        Value::Bool(accepts) => *accepts,
        Value::Object(object) => !CONSTRAINTS.iter().any(|key| object.contains_key(*key)),
        _ => false,
    }
}

/// Zero value of a schema, or `None` when it has no obvious one.
fn zero_value(schema: &Value, defs: Option<&Map<String, Value>>, depth: usize) -> Option<Value> {
    if depth > MAX_SCHEMA_DEPTH {
        return None;
    }
    let schema = resolve(schema, defs);
    if is_nullable(schema) {
        return Some(Value::Null);
    }

    let types = type_names(schema);
    let zero = match types.first().copied() {
        Some("integer") => Value::from(0),
        Some("number") => Value::from(0.0),
        Some("string") => Value::String(String::new()),
        Some("boolean") => Value::Bool(false),
        Some("array") => Value::Array(Vec::new()),
        Some("object") => {
            let mut object = Value::Object(Map::new());
            fill_missing_fields(&mut object, schema, defs, depth + 1);
            object
        }
        _ => return None,
    };
    Some(zero)
}

fn fill_missing_fields(
    value: &mut Value,
    schema: &Value,
    defs: Option<&Map<String, Value>>,
    depth: usize,
) {
    if depth > MAX_SCHEMA_DEPTH {
        return;
    }
    let mut schema = resolve(schema, defs);
    if let Some(branch) = non_null_branch(schema) {
        schema = resolve(branch, defs);
    }

    match value {
        Value::Object(object) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return;
            };
            for (name, field_schema) in properties {
                match object.get_mut(name) {
                    Some(field) => fill_missing_fields(field, field_schema, defs, depth + 1),
                    None => {
                        if let Some(zero) = zero_value(field_schema, defs, depth + 1) {
                            object.insert(name.clone(), zero);
                        }
                    }
                }
            }
        }
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items").filter(|s| s.is_object()) {
                for item in items {
                    fill_missing_fields(item, item_schema, defs, depth + 1);
                }
            }
        }
        _ => {}
    }
}

/// Rewrites every float with an integral value as an integer.
fn narrow_floats(value: &mut Value) {
    match value {
        Value::Number(number) if !number.is_i64() && !number.is_u64() => {
            let Some(float) = number.as_f64() else {
                return;
            };
            if float.fract() != 0.0 {
                return;
            }
            if float >= i64::MIN as f64 && float < i64::MAX as f64 {
                *value = Value::from(float as i64);
            } else if float >= 0.0 && float < u64::MAX as f64 {
                *value = Value::from(float as u64);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(narrow_floats),
        Value::Object(object) => object.values_mut().for_each(narrow_floats),
        _ => {}
    }
}
