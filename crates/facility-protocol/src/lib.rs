//! Wire format for the facility-booking RPC protocol.
//!
//! # Frame Overview
//!
//! Every UDP datagram carries one serialized object graph followed by a
//! single even-parity byte:
//! - big-endian primitives and length-prefixed UTF-8 strings ([`cursor`])
//! - a self-describing object graph with back-references ([`codec`])
//! - one trailing parity tag ([`parity`])
//!
//! The root object of every request and reply is an [`Envelope`]: operation
//! code, correlation id and a comma-separated text payload.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use facility_protocol::{Codec, Envelope, Operation, TypeRegistry};
//!
//! let codec = Codec::new(Arc::new(TypeRegistry::with_builtin()));
//! let request = Envelope::new(Operation::Read, 7, "facility,ALL");
//! let bytes = codec.encode(&request).unwrap();
//! let decoded: Envelope = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded, request);
//! ```

pub mod codec;
pub mod cursor;
mod envelope;
mod error;
pub mod object;
pub mod parity;
mod registry;
mod request;

pub use codec::{Codec, Decoded, MAX_DEPTH, WireType};
pub use envelope::{ENVELOPE_TYPE, Envelope, Operation, STATUS_ERROR, STATUS_SUCCESS};
pub use error::{WireError, WireResult};
pub use object::{FieldKind, FieldSpec, Object, ObjectGraph, ObjectId, Schema, Value};
pub use registry::TypeRegistry;
pub use request::{FacilityRequest, TimeSlot, day_name};

/// Default UDP port of the facility server.
pub const DEFAULT_SERVER_PORT: u16 = 6789;
