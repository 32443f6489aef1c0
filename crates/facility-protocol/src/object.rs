//! Object graph model.
//!
//! Objects live in an [`ObjectGraph`] arena and refer to each other through
//! dense [`ObjectId`] handles. Identity is handle equality, so shared and
//! cyclic structure is expressed without pointers.

use std::fmt;
use std::sync::Arc;

use crate::error::{WireError, WireResult};

/// Wire type name of 32-bit integer fields.
pub const INT_TYPE: &str = "int";
/// Wire type name of 64-bit integer fields.
pub const LONG_TYPE: &str = "long";
/// Wire type name of double fields.
pub const DOUBLE_TYPE: &str = "double";
/// Wire type name of nullable string fields.
pub const STRING_TYPE: &str = "java.lang.String";

/// How a field's value is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    Long,
    Double,
    Str,
    Object,
}

impl FieldKind {
    /// Maps a declared field type name to its layout. Any name that is not a
    /// primitive or string is a nested object type.
    pub fn from_type_name(type_name: &str) -> Self {
        match type_name {
            INT_TYPE => Self::Int,
            LONG_TYPE => Self::Long,
            DOUBLE_TYPE => Self::Double,
            STRING_TYPE => Self::Str,
            _ => Self::Object,
        }
    }

    /// Value a freshly created instance holds for this kind.
    pub fn default_value(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Long => Value::Long(0),
            Self::Double => Value::Double(0.0),
            Self::Str => Value::Str(None),
            Self::Object => Value::Object(None),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::Long => "long",
            Self::Double => "double",
            Self::Str => "string",
            Self::Object => "object",
        };
        f.write_str(name)
    }
}

/// One `(name, type name)` entry of a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub type_name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    /// Creates a field whose layout is derived from `type_name`.
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self {
            name: name.into(),
            kind: FieldKind::from_type_name(&type_name),
            type_name,
        }
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, INT_TYPE)
    }

    pub fn long(name: impl Into<String>) -> Self {
        Self::new(name, LONG_TYPE)
    }

    pub fn double(name: impl Into<String>) -> Self {
        Self::new(name, DOUBLE_TYPE)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, STRING_TYPE)
    }

    /// Creates a nested-object field holding instances of `type_name`.
    pub fn object(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            kind: FieldKind::Object,
        }
    }
}

/// Ordered field list declared by a concrete type.
///
/// Both ends must agree on the type name and on every `(name, type name)`
/// pair in order; the codec transmits and checks it on every message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub type_name: String,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Position of the field called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Handle of an object inside an [`ObjectGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Option<String>),
    Object(Option<ObjectId>),
}

impl Value {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Int(_) => FieldKind::Int,
            Self::Long(_) => FieldKind::Long,
            Self::Double(_) => FieldKind::Double,
            Self::Str(_) => FieldKind::Str,
            Self::Object(_) => FieldKind::Object,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(Some(v.to_owned()))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(Some(v))
    }
}

impl From<Option<String>> for Value {
    fn from(v: Option<String>) -> Self {
        Self::Str(v)
    }
}

impl From<ObjectId> for Value {
    fn from(v: ObjectId) -> Self {
        Self::Object(Some(v))
    }
}

/// An instance of a schema-described type.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Object {
    /// Creates an instance with every field at its default.
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = schema.fields.iter().map(|f| f.kind.default_value()).collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.position(name).map(|i| &self.values[i])
    }

    /// Sets the field called `name`, rejecting values of the wrong kind.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> WireResult<()> {
        let index = self.schema.position(name).ok_or_else(|| {
            WireError::schema_mismatch(&self.schema.type_name, format!("no field named {name}"))
        })?;
        self.set_at(index, value.into())
    }

    /// Sets the field at `index` in schema order.
    pub fn set_at(&mut self, index: usize, value: Value) -> WireResult<()> {
        let spec = self.schema.fields.get(index).ok_or_else(|| {
            WireError::schema_mismatch(
                &self.schema.type_name,
                format!("field index {index} out of range"),
            )
        })?;
        if spec.kind != value.kind() {
            return Err(WireError::schema_mismatch(
                &self.schema.type_name,
                format!(
                    "field {} holds {}, got {}",
                    spec.name,
                    spec.kind,
                    value.kind()
                ),
            ));
        }
        self.values[index] = value;
        Ok(())
    }

    fn typed<'a, T>(
        &'a self,
        name: &str,
        kind: FieldKind,
        pick: impl FnOnce(&'a Value) -> Option<T>,
    ) -> WireResult<T> {
        self.get(name).and_then(pick).ok_or_else(|| {
            WireError::schema_mismatch(
                &self.schema.type_name,
                format!("no {kind} field named {name}"),
            )
        })
    }

    pub fn int(&self, name: &str) -> WireResult<i32> {
        self.typed(name, FieldKind::Int, |v| match v {
            Value::Int(i) => Some(*i),
            _ => None,
        })
    }

    pub fn long(&self, name: &str) -> WireResult<i64> {
        self.typed(name, FieldKind::Long, |v| match v {
            Value::Long(i) => Some(*i),
            _ => None,
        })
    }

    pub fn double(&self, name: &str) -> WireResult<f64> {
        self.typed(name, FieldKind::Double, |v| match v {
            Value::Double(d) => Some(*d),
            _ => None,
        })
    }

    pub fn string(&self, name: &str) -> WireResult<Option<&str>> {
        self.typed(name, FieldKind::Str, |v| match v {
            Value::Str(s) => Some(s.as_deref()),
            _ => None,
        })
    }

    pub fn object(&self, name: &str) -> WireResult<Option<ObjectId>> {
        self.typed(name, FieldKind::Object, |v| match v {
            Value::Object(id) => Some(*id),
            _ => None,
        })
    }
}

/// Arena owning every object of one graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectGraph {
    objects: Vec<Object>,
}

impl ObjectGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object and returns its handle.
    pub fn insert(&mut self, object: Object) -> ObjectId {
        self.objects.push(object);
        ObjectId(self.objects.len() - 1)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(id.0)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id.0)
    }

    /// Like [`get`](Self::get), failing with `UnknownHandle`.
    pub fn resolve(&self, id: ObjectId) -> WireResult<&Object> {
        self.get(id).ok_or(WireError::UnknownHandle(id.0))
    }

    pub fn resolve_mut(&mut self, id: ObjectId) -> WireResult<&mut Object> {
        self.objects
            .get_mut(id.0)
            .ok_or(WireError::UnknownHandle(id.0))
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("geo.Point")
                .field(FieldSpec::int("x"))
                .field(FieldSpec::double("y"))
                .field(FieldSpec::string("label"))
                .field(FieldSpec::object("next", "geo.Point")),
        )
    }

    #[test]
    fn type_names_map_to_kinds() {
        assert_eq!(FieldKind::from_type_name("int"), FieldKind::Int);
        assert_eq!(FieldKind::from_type_name("long"), FieldKind::Long);
        assert_eq!(FieldKind::from_type_name("double"), FieldKind::Double);
        assert_eq!(
            FieldKind::from_type_name("java.lang.String"),
            FieldKind::Str
        );
        assert_eq!(FieldKind::from_type_name("geo.Point"), FieldKind::Object);
    }

    #[test]
    fn new_object_holds_defaults() {
        let obj = Object::new(point_schema());
        assert_eq!(obj.int("x").unwrap(), 0);
        assert_eq!(obj.double("y").unwrap(), 0.0);
        assert_eq!(obj.string("label").unwrap(), None);
        assert_eq!(obj.object("next").unwrap(), None);
    }

    #[test]
    fn set_rejects_wrong_kind() {
        let mut obj = Object::new(point_schema());
        obj.set("x", 4i32).unwrap();
        assert_eq!(obj.int("x").unwrap(), 4);

        let err = obj.set("x", "four").unwrap_err();
        assert!(matches!(err, WireError::SchemaMismatch { .. }));
        assert!(obj.set("z", 1i32).is_err());
    }

    #[test]
    fn typed_getter_checks_kind() {
        let obj = Object::new(point_schema());
        assert!(obj.int("label").is_err());
        assert!(obj.string("missing").is_err());
    }

    #[test]
    fn graph_handles_are_dense() {
        let mut graph = ObjectGraph::new();
        let a = graph.insert(Object::new(point_schema()));
        let b = graph.insert(Object::new(point_schema()));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(graph.len(), 2);

        graph.resolve_mut(a).unwrap().set("next", b).unwrap();
        assert_eq!(graph.resolve(a).unwrap().object("next").unwrap(), Some(b));
        assert_eq!(
            graph.resolve(ObjectId(9)).unwrap_err(),
            WireError::UnknownHandle(9)
        );
    }
}
