use crate::error::SerializeError;
use crate::memory::Memory;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

pub fn encode_to_string<T>(data: &T) -> Result<String, SerializeError>
where
    T: Serialize,
{
    let serialized_data = serde_json::to_vec(data)?;

    encode_buffer_to_string(&serialized_data)
}

pub fn encode_buffer_to_string(data: &[u8]) -> Result<String, SerializeError> {
    use flate2::write::*;
    use flate2::*;
    use std::io::prelude::*;

    let mut compressor = GzEncoder::new(Vec::with_capacity(1024 * 20), Compression::default());

    compressor.write_all(data)?;

    let compressed_data = compressor.finish()?;

    Ok(STANDARD.encode(compressed_data))
}

pub fn decode_from_string<T>(data: &str) -> Result<T, SerializeError>
where
    for<'de> T: Deserialize<'de>,
{
    let decoded_data = decode_buffer_from_string(data)?;

    Ok(serde_json::from_slice(&decoded_data)?)
}

pub fn decode_buffer_from_string(data: &str) -> Result<Vec<u8>, SerializeError> {
    use flate2::read::*;
    use std::io::prelude::*;

    let decoded_data = STANDARD.decode(data)?;

    let mut decompressor = GzDecoder::new(decoded_data.as_slice());

    let mut decompressed_data = Vec::with_capacity(1024 * 20);

    decompressor.read_to_end(&mut decompressed_data)?;

    Ok(decompressed_data)
}

pub fn encode_memory(memory: &Memory) -> Result<String, SerializeError> {
    encode_to_string(memory)
}

/// Decodes persisted memory. An empty store yields fresh memory.
pub fn decode_memory(data: &str) -> Result<Memory, SerializeError> {
    if data.is_empty() {
        return Ok(Memory::new());
    }

    let mut memory: Memory = decode_from_string(data)?;

    memory.migrate();

    Ok(memory)
}

/// Splits encoded data into segment sized chunks.
//
// NOTE: This relies on not using multi-byte characters for encoding. (This is valid from base64 encoding.)
//
pub fn split_segments(data: &str, segment_size: usize) -> Vec<&str> {
    if data.is_empty() {
        return Vec::new();
    }

    data.as_bytes()
        .chunks(segment_size)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .collect()
}
