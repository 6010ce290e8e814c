//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Framed Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │  Op (1)  │ Len (4)  │   Body (bincode RequestBody)│
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Operations
//! - 0x01: LIST_TABLES   0x02: RESET_ALL
//! - 0x03: GET           0x04: SET           0x05: DELETE
//! - 0x06: QUERY         0x07: GET_BATCH     0x08: SET_BATCH
//! - 0x09: DELETE_BATCH  0x0A: DELETE_ALL    0x0B: RESET_TABLE
//! - 0x0C: TABLE_SIZE
//!
//! The op byte travels raw so that codes this server does not know still
//! decode and get answered with an error reply.
//!
//! ### Reply Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Body                │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: PAYLOAD  - bincode `Option<Value>`
//! - 0x01: BATCH    - bincode `BTreeMap<Key, Option<Value>>`
//! - 0x02: SUCCESS  - bincode `u64`
//! - 0x03: ERROR    - UTF-8 message
//! - 0x04: TABLES   - bincode `BTreeSet<String>`

mod request;
mod reply;
mod codec;

pub use request::{Operation, Request, RequestBody};
pub use reply::{Reply, Status};
pub use codec::{
    encode_request, decode_request, encode_reply, decode_reply, encode_error,
    read_frame, write_frame, read_request, write_request, read_reply, write_reply,
    HEADER_SIZE, MAX_FRAME_SIZE,
};
