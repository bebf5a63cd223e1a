//! Binary encoding keyed by `(name, version)`. A receiver
//! rejects frames whose name or version doesn't match what it expects —
//! the engine's contract with a client is never silently reinterpreted.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Every RPC and the update stream currently speak this version. A future
/// breaking wire change bumps this and rejects old clients outright,
/// rather than attempting compatibility.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub name: String,
    pub version: u32,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum WireError {
    #[error("bincode encode/decode failure: {0}")]
    Codec(#[from] bincode::Error),
    #[error("frame name mismatch: expected `{expected}`, got `{actual}`")]
    NameMismatch { expected: String, actual: String },
    #[error("frame version mismatch: expected v{expected}, got v{actual}")]
    VersionMismatch { expected: u32, actual: u32 },
}

/// Wraps `value` in a named, versioned frame and serializes it.
pub fn encode<T: Serialize>(name: &str, value: &T) -> Result<Vec<u8>, WireError> {
    let payload = bincode::serialize(value)?;
    let frame = Frame {
        name: name.to_string(),
        version: PROTOCOL_VERSION,
        payload,
    };
    Ok(bincode::serialize(&frame)?)
}

/// Decodes a frame and checks its `(name, version)` before decoding the
/// payload. `bytes` is the raw frame, not the inner payload. Use this when
/// the reader already knows which RPC it's expecting next (e.g. a server
/// reading inbound `command` frames, which are the only kind it ever
/// receives).
pub fn decode<T: DeserializeOwned>(name: &str, bytes: &[u8]) -> Result<T, WireError> {
    let (frame_name, payload) = decode_frame(bytes)?;
    if frame_name != name {
        return Err(WireError::NameMismatch {
            expected: name.to_string(),
            actual: frame_name,
        });
    }
    decode_payload(&payload)
}

/// Decodes just the frame envelope — its name and payload — checking only
/// the version. Use this when a single connection multiplexes more than
/// one frame name onto the same stream (e.g. `reply` and `update` frames
/// interleaved on a client's read side): the reader must dispatch on
/// `frame_name` to know which type to decode the payload as, rather than
/// assuming a fixed frame arrives at a fixed position.
pub fn decode_frame(bytes: &[u8]) -> Result<(String, Vec<u8>), WireError> {
    let frame: Frame = bincode::deserialize(bytes)?;
    if frame.version != PROTOCOL_VERSION {
        return Err(WireError::VersionMismatch {
            expected: PROTOCOL_VERSION,
            actual: frame.version,
        });
    }
    Ok((frame.name, frame.payload))
}

/// Decodes a payload already demultiplexed by `decode_frame`.
pub fn decode_payload<T: DeserializeOwned>(payload: &[u8]) -> Result<T, WireError> {
    Ok(bincode::deserialize(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let bytes = encode("chat", &"hello".to_string()).unwrap();
        let decoded: String = decode("chat", &bytes).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn rejects_name_mismatch() {
        let bytes = encode("chat", &"hello".to_string()).unwrap();
        let err = decode::<String>("ready", &bytes).unwrap_err();
        assert!(matches!(err, WireError::NameMismatch { .. }));
    }

    #[test]
    fn rejects_version_mismatch() {
        let payload = bincode::serialize(&"hello".to_string()).unwrap();
        let frame = Frame {
            name: "chat".to_string(),
            version: PROTOCOL_VERSION + 1,
            payload,
        };
        let bytes = bincode::serialize(&frame).unwrap();
        let err = decode::<String>("chat", &bytes).unwrap_err();
        assert!(matches!(err, WireError::VersionMismatch { .. }));
    }

    #[test]
    fn decode_frame_exposes_name_for_dispatch_before_decoding_payload() {
        let reply_bytes = encode("reply", &"ack".to_string()).unwrap();
        let update_bytes = encode("update", &"new-round".to_string()).unwrap();

        let (name, payload) = decode_frame(&reply_bytes).unwrap();
        assert_eq!(name, "reply");
        let reply: String = decode_payload(&payload).unwrap();
        assert_eq!(reply, "ack");

        let (name, payload) = decode_frame(&update_bytes).unwrap();
        assert_eq!(name, "update");
        let update: String = decode_payload(&payload).unwrap();
        assert_eq!(update, "new-round");
    }
}
