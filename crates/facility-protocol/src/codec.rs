//! Object graph serialization.
//!
//! Every node is written as:
//!
//! ```text
//! null flag       1 byte, 0 = null, 1 = present
//! reference flag  1 byte, 1 = back-reference, 0 = new object
//!   back-reference: int32 ordinal, nothing else
//!   new object:     type name, int32 field count,
//!                   (field name, field type name) per field,
//!                   field values in schema order
//! ```
//!
//! Ints, longs and doubles are written raw, strings as a presence byte plus a
//! length-prefixed string, nested objects recursively with the same node
//! grammar. One parity byte over the whole body ends the frame.
//!
//! ## Invariants
//! - Each object is written once per frame; later encounters of the same
//!   handle become back-references to its ordinal.
//! - A decoded object receives its ordinal before its fields are read, so a
//!   field may refer back to the object that contains it.
//! - Nesting of new objects is bounded by [`MAX_DEPTH`].

use std::sync::Arc;

use crate::cursor::{ByteReader, ByteWriter};
use crate::error::{WireError, WireResult};
use crate::object::{FieldKind, FieldSpec, Object, ObjectGraph, ObjectId, Schema, Value};
use crate::parity;
use crate::registry::TypeRegistry;

/// The maximum nesting depth of new objects before a frame is rejected.
pub const MAX_DEPTH: usize = 64;

const NULL: u8 = 0;
const PRESENT: u8 = 1;
const NEW_OBJECT: u8 = 0;
const BACK_REFERENCE: u8 = 1;

/// A Rust type with a fixed wire schema.
///
/// Implementors move their data in and out of an [`ObjectGraph`]; the codec
/// handles everything on the wire.
pub trait WireType: Sized {
    /// Schema shared by every instance of the type.
    fn schema() -> Arc<Schema>;

    /// Inserts `self` (and anything it refers to) into `graph`.
    fn to_graph(&self, graph: &mut ObjectGraph) -> WireResult<ObjectId>;

    /// Rebuilds a value from the object at `id`.
    fn from_graph(graph: &ObjectGraph, id: ObjectId) -> WireResult<Self>;
}

/// Result of decoding a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub graph: ObjectGraph,
    /// `None` when the frame carried a null root.
    pub root: Option<ObjectId>,
}

/// Serializes and deserializes object graphs against a type registry.
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<TypeRegistry>,
}

impl Codec {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Writes the graph reachable from `root` and appends the parity tag.
    ///
    /// # Errors
    /// `UnknownType` for an object whose type is not registered, since the
    /// peer could not decode it either; `UnknownHandle` for a dangling
    /// handle; `DepthLimitExceeded` for over-deep nesting.
    pub fn serialize(&self, graph: &ObjectGraph, root: Option<ObjectId>) -> WireResult<Vec<u8>> {
        let mut encoder = Encoder {
            registry: &self.registry,
            graph,
            ordinals: vec![None; graph.len()],
            next_ordinal: 0,
            out: ByteWriter::with_capacity(256),
        };
        encoder.write_node(root, 0)?;
        Ok(parity::seal(encoder.out.into_bytes()))
    }

    /// Verifies the parity tag and rebuilds the object graph.
    ///
    /// Bytes left over after the root node are ignored.
    pub fn deserialize(&self, frame: &[u8]) -> WireResult<Decoded> {
        let body = parity::open(frame)?;
        let mut decoder = Decoder {
            registry: &self.registry,
            reader: ByteReader::new(body),
            graph: ObjectGraph::new(),
            seen: Vec::new(),
        };
        let root = decoder.read_node(0)?;
        Ok(Decoded {
            graph: decoder.graph,
            root,
        })
    }

    /// Serializes a typed value.
    pub fn encode<T: WireType>(&self, value: &T) -> WireResult<Vec<u8>> {
        let mut graph = ObjectGraph::new();
        let root = value.to_graph(&mut graph)?;
        self.serialize(&graph, Some(root))
    }

    /// Deserializes a frame whose root must be a non-null `T`.
    pub fn decode<T: WireType>(&self, frame: &[u8]) -> WireResult<T> {
        let Decoded { graph, root } = self.deserialize(frame)?;
        let root = root.ok_or(WireError::NullRoot)?;
        let expected = T::schema();
        let found = graph.resolve(root)?.type_name();
        if found != expected.type_name {
            return Err(WireError::UnexpectedType {
                expected: expected.type_name.clone(),
                found: found.to_owned(),
            });
        }
        T::from_graph(&graph, root)
    }
}

struct Encoder<'a> {
    registry: &'a TypeRegistry,
    graph: &'a ObjectGraph,
    /// Ordinal assigned to each handle, indexed by handle.
    ordinals: Vec<Option<i32>>,
    next_ordinal: i32,
    out: ByteWriter,
}

impl Encoder<'_> {
    fn write_node(&mut self, node: Option<ObjectId>, depth: usize) -> WireResult<()> {
        let Some(id) = node else {
            self.out.write_byte(NULL);
            return Ok(());
        };
        let object = self.graph.resolve(id)?;
        self.out.write_byte(PRESENT);

        if let Some(ordinal) = self.ordinals[id.index()] {
            self.out.write_byte(BACK_REFERENCE);
            self.out.write_i32(ordinal);
            return Ok(());
        }

        if depth > MAX_DEPTH {
            return Err(WireError::DepthLimitExceeded(MAX_DEPTH));
        }
        let schema = object.schema();
        if !self.registry.contains(&schema.type_name) {
            return Err(WireError::UnknownType(schema.type_name.clone()));
        }

        self.ordinals[id.index()] = Some(self.next_ordinal);
        self.next_ordinal += 1;

        self.out.write_byte(NEW_OBJECT);
        self.out.write_str(&schema.type_name)?;
        self.out.write_i32(field_count(schema)?);
        for field in &schema.fields {
            self.out.write_str(&field.name)?;
            self.out.write_str(&field.type_name)?;
        }
        self.write_values(object, depth)
    }

    fn write_values(&mut self, object: &Object, depth: usize) -> WireResult<()> {
        let schema = object.schema();
        for (field, value) in schema.fields.iter().zip(object.values()) {
            match value {
                Value::Int(v) => self.out.write_i32(*v),
                Value::Long(v) => self.out.write_i64(*v),
                Value::Double(v) => self.out.write_f64(*v),
                Value::Str(None) => self.out.write_byte(NULL),
                Value::Str(Some(s)) => {
                    self.out.write_byte(PRESENT);
                    self.out.write_str(s)?;
                }
                Value::Object(child) => {
                    check_child(self.graph, &schema.type_name, field, *child)?;
                    self.write_node(*child, depth + 1)?;
                }
            }
        }
        Ok(())
    }
}

/// Rejects a nested object whose type differs from the one its field declares.
fn check_child(
    graph: &ObjectGraph,
    owner: &str,
    field: &FieldSpec,
    child: Option<ObjectId>,
) -> WireResult<()> {
    let Some(child) = child else {
        return Ok(());
    };
    let found = graph.resolve(child)?.type_name();
    if found != field.type_name {
        return Err(WireError::schema_mismatch(
            owner,
            format!(
                "field {} declares {}, holds {found}",
                field.name, field.type_name
            ),
        ));
    }
    Ok(())
}

fn field_count(schema: &Schema) -> WireResult<i32> {
    i32::try_from(schema.len())
        .map_err(|_| WireError::schema_mismatch(&schema.type_name, "too many fields"))
}

struct Decoder<'a> {
    registry: &'a TypeRegistry,
    reader: ByteReader<'a>,
    graph: ObjectGraph,
    /// Handle of each object in the order its ordinal was assigned.
    seen: Vec<ObjectId>,
}

impl Decoder<'_> {
    fn read_node(&mut self, depth: usize) -> WireResult<Option<ObjectId>> {
        if self.reader.read_byte()? == NULL {
            return Ok(None);
        }
        if self.reader.read_byte()? == BACK_REFERENCE {
            let ordinal = self.reader.read_i32()?;
            let id = usize::try_from(ordinal)
                .ok()
                .and_then(|i| self.seen.get(i).copied())
                .ok_or(WireError::InvalidReference(ordinal))?;
            return Ok(Some(id));
        }

        if depth > MAX_DEPTH {
            return Err(WireError::DepthLimitExceeded(MAX_DEPTH));
        }
        let type_name = self.reader.read_string()?;
        let object = self.registry.create(&type_name)?;
        let schema = Arc::clone(object.schema());
        let id = self.graph.insert(object);
        self.seen.push(id);

        self.check_schema(&schema)?;
        for (index, field) in schema.fields.iter().enumerate() {
            let value = self.read_value(field.kind, depth)?;
            if let Value::Object(child) = value {
                check_child(&self.graph, &schema.type_name, field, child)?;
            }
            self.graph.resolve_mut(id)?.set_at(index, value)?;
        }
        Ok(Some(id))
    }

    fn check_schema(&mut self, schema: &Schema) -> WireResult<()> {
        let count = self.reader.read_i32()?;
        if usize::try_from(count).ok() != Some(schema.len()) {
            return Err(WireError::schema_mismatch(
                &schema.type_name,
                format!("expected {} fields, frame declares {count}", schema.len()),
            ));
        }
        for (position, expected) in schema.fields.iter().enumerate() {
            let name = self.reader.read_string()?;
            let type_name = self.reader.read_string()?;
            if name != expected.name || type_name != expected.type_name {
                return Err(WireError::schema_mismatch(
                    &schema.type_name,
                    format!(
                        "field {position} is {name}: {type_name}, expected {}: {}",
                        expected.name, expected.type_name
                    ),
                ));
            }
        }
        Ok(())
    }

    fn read_value(&mut self, kind: FieldKind, depth: usize) -> WireResult<Value> {
        let value = match kind {
            FieldKind::Int => Value::Int(self.reader.read_i32()?),
            FieldKind::Long => Value::Long(self.reader.read_i64()?),
            FieldKind::Double => Value::Double(self.reader.read_f64()?),
            FieldKind::Str => match self.reader.read_byte()? {
                NULL => Value::Str(None),
                _ => Value::Str(Some(self.reader.read_string()?)),
            },
            FieldKind::Object => Value::Object(self.read_node(depth + 1)?),
        };
        Ok(value)
    }
}
