//! Wire-facing types: the typed RPC surface and its binary encoding.

pub mod rpc;
pub mod wire;

pub use rpc::{Broadcast, Command, GetUpdateKind, PlayerUpdate, RpcReply};
pub use wire::{decode, decode_frame, decode_payload, encode, WireError, PROTOCOL_VERSION};
