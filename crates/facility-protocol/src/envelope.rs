//! The RPC envelope carried in every request and reply.

use std::fmt;
use std::sync::{Arc, LazyLock};

use crate::codec::WireType;
use crate::error::WireResult;
use crate::object::{FieldSpec, Object, ObjectGraph, ObjectId, Schema};

/// Wire type name the facility server registers the envelope under.
pub const ENVELOPE_TYPE: &str = "Server.RequestMessage";

/// Prefix of a reply payload reporting success.
pub const STATUS_SUCCESS: &str = "status:SUCCESS";
/// Prefix of a reply payload reporting failure.
pub const STATUS_ERROR: &str = "status:ERROR";

const OP_FIELD: &str = "requestType";
const ID_FIELD: &str = "requestID";
const PAYLOAD_FIELD: &str = "data";

static SCHEMA: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    Arc::new(
        Schema::new(ENVELOPE_TYPE)
            .field(FieldSpec::int(OP_FIELD))
            .field(FieldSpec::int(ID_FIELD))
            .field(FieldSpec::string(PAYLOAD_FIELD)),
    )
});

/// Operation requested from the facility server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Read,
    Write,
    Update,
    Delete,
    Monitor,
    Echo,
}

impl Operation {
    /// Wire code of the operation.
    pub fn code(self) -> i32 {
        match self {
            Self::Read => 0,
            Self::Write => 1,
            Self::Update => 2,
            Self::Delete => 3,
            Self::Monitor => 4,
            Self::Echo => 5,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Read),
            1 => Some(Self::Write),
            2 => Some(Self::Update),
            3 => Some(Self::Delete),
            4 => Some(Self::Monitor),
            5 => Some(Self::Echo),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Read => "READ",
            Self::Write => "WRITE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Monitor => "MONITOR",
            Self::Echo => "ECHO",
        };
        f.write_str(name)
    }
}

/// Operation code, correlation id and string payload of one message.
///
/// The operation is kept as its raw code so replies carrying codes this
/// client does not know still decode. An empty payload is stored as `None`;
/// both encode as an absent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub op_code: i32,
    pub correlation_id: i32,
    pub payload: Option<String>,
}

impl Envelope {
    pub fn new(op: Operation, correlation_id: i32, payload: impl Into<String>) -> Self {
        Self::from_parts(op.code(), correlation_id, Some(payload.into()))
    }

    pub fn from_parts(op_code: i32, correlation_id: i32, payload: Option<String>) -> Self {
        Self {
            op_code,
            correlation_id,
            payload: payload.filter(|p| !p.is_empty()),
        }
    }

    /// The operation, if the code is a known one.
    pub fn operation(&self) -> Option<Operation> {
        Operation::from_code(self.op_code)
    }

    /// Payload text, empty when absent.
    pub fn payload(&self) -> &str {
        self.payload.as_deref().unwrap_or_default()
    }

    pub fn into_payload(self) -> String {
        self.payload.unwrap_or_default()
    }

    /// Whether the payload reports success.
    pub fn is_success(&self) -> bool {
        self.payload().starts_with(STATUS_SUCCESS)
    }
}

impl WireType for Envelope {
    fn schema() -> Arc<Schema> {
        Arc::clone(&SCHEMA)
    }

    fn to_graph(&self, graph: &mut ObjectGraph) -> WireResult<ObjectId> {
        let mut object = Object::new(Self::schema());
        object.set(OP_FIELD, self.op_code)?;
        object.set(ID_FIELD, self.correlation_id)?;
        object.set(PAYLOAD_FIELD, self.payload.clone())?;
        Ok(graph.insert(object))
    }

    fn from_graph(graph: &ObjectGraph, id: ObjectId) -> WireResult<Self> {
        let object = graph.resolve(id)?;
        Ok(Self::from_parts(
            object.int(OP_FIELD)?,
            object.int(ID_FIELD)?,
            object.string(PAYLOAD_FIELD)?.map(str::to_owned),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Codec;
    use crate::cursor::ByteWriter;
    use crate::error::WireError;
    use crate::parity;
    use crate::registry::TypeRegistry;

    fn codec() -> Codec {
        Codec::new(Arc::new(TypeRegistry::with_builtin()))
    }

    fn hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn read_facility_names_frame_layout() {
        let envelope = Envelope::new(Operation::Read, 7, "facility,ALL");
        let frame = codec().encode(&envelope).unwrap();

        let mut expected = ByteWriter::new();
        expected.write_byte(1);
        expected.write_byte(0);
        expected.write_str(ENVELOPE_TYPE).unwrap();
        expected.write_i32(3);
        for (name, ty) in [
            ("requestType", "int"),
            ("requestID", "int"),
            ("data", "java.lang.String"),
        ] {
            expected.write_str(name).unwrap();
            expected.write_str(ty).unwrap();
        }
        let header_len = expected.len();
        expected.write_i32(0);
        expected.write_i32(7);
        expected.write_byte(1);
        expected.write_str("facility,ALL").unwrap();
        assert_eq!(frame, parity::seal(expected.into_bytes()));

        let values = &frame[header_len..];
        insta::assert_snapshot!(hex(values), @"00 00 00 00 00 00 00 07 01 00 00 00 0c 66 61 63 69 6c 69 74 79 2c 41 4c 4c 01");
    }

    #[test]
    fn empty_and_missing_payload_encode_identically() {
        let codec = codec();
        let empty = codec.encode(&Envelope::new(Operation::Echo, 1, "")).unwrap();
        let missing = codec
            .encode(&Envelope::from_parts(Operation::Echo.code(), 1, None))
            .unwrap();
        assert_eq!(empty, missing);
        // Absent payload: one zero byte, then the tag.
        assert_eq!(empty[empty.len() - 2], 0);

        let decoded: Envelope = codec.decode(&empty).unwrap();
        assert_eq!(decoded.payload, None);
        assert_eq!(decoded.payload(), "");
    }

    #[test]
    fn envelope_round_trips() {
        let codec = codec();
        let envelope = Envelope::new(Operation::Monitor, -3, "register,LT1,60");
        let decoded: Envelope = codec.decode(&codec.encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.operation(), Some(Operation::Monitor));
    }

    #[test]
    fn unknown_operation_code_is_preserved() {
        let codec = codec();
        let envelope = Envelope::from_parts(6, 2, Some("rating,LT1".into()));
        let decoded: Envelope = codec.decode(&codec.encode(&envelope).unwrap()).unwrap();
        assert_eq!(decoded.op_code, 6);
        assert_eq!(decoded.operation(), None);
    }

    #[test]
    fn typed_decode_rejects_other_root_types() {
        let mut registry = TypeRegistry::with_builtin();
        let other = Arc::new(Schema::new("Server.Other").field(FieldSpec::int("x")));
        registry.register_schema(Arc::clone(&other));
        let codec = Codec::new(Arc::new(registry));

        let mut graph = ObjectGraph::new();
        let root = graph.insert(Object::new(other));
        let frame = codec.serialize(&graph, Some(root)).unwrap();
        assert_eq!(
            codec.decode::<Envelope>(&frame).unwrap_err(),
            WireError::UnexpectedType {
                expected: ENVELOPE_TYPE.into(),
                found: "Server.Other".into(),
            }
        );

        let null = codec.serialize(&ObjectGraph::new(), None).unwrap();
        assert_eq!(codec.decode::<Envelope>(&null).unwrap_err(), WireError::NullRoot);
    }

    #[test]
    fn status_prefix() {
        assert!(Envelope::new(Operation::Monitor, 1, "status:SUCCESS,registered").is_success());
        assert!(!Envelope::new(Operation::Monitor, 1, "status:ERROR,no such facility").is_success());
        assert!(!Envelope::from_parts(4, 1, None).is_success());
    }

    #[test]
    fn operation_codes() {
        for code in 0..6 {
            assert_eq!(Operation::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Operation::from_code(-1), None);
        assert_eq!(Operation::Delete.to_string(), "DELETE");
    }
}
