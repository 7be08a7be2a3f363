//! Structured binary I/O for model artifacts.
//!
//! [`StructWriter`] encodes little-endian primitives, varint length
//! prefixes and strings while accumulating a CRC32 over every byte it
//! writes. [`StructWriter::finish`] appends that checksum as a trailing
//! `u32`. [`StructReader`] mirrors the encoding, refuses to read past the
//! checksum trailer, and [`StructReader::verify_checksum`] checks both the
//! trailer and that no unread payload bytes remain.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher;

use crate::error::{Result, VietcatError};
use crate::storage::{StorageInput, StorageOutput};
use crate::util::varint::{MAX_VARINT_LEN, decode_u64, encode_u64};

const CHECKSUM_LEN: u64 = 4;

/// A checksumming writer for binary data.
pub struct StructWriter<W: StorageOutput> {
    writer: W,
    hasher: Hasher,
    position: u64,
}

impl<W: StorageOutput> StructWriter<W> {
    /// Create a new structured writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            hasher: Hasher::new(),
            position: 0,
        }
    }

    /// Write a u8 value.
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_u8(value)?;
        self.update(&[value]);
        Ok(())
    }

    /// Write a u16 value (little-endian).
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_u16::<LittleEndian>(value)?;
        self.update(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.update(&value.to_le_bytes());
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.update(&value.to_le_bytes());
        Ok(())
    }

    /// Write an i64 value (little-endian, two's complement).
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.writer.write_i64::<LittleEndian>(value)?;
        self.update(&value.to_le_bytes());
        Ok(())
    }

    /// Write a f64 value as its little-endian IEEE-754 bit pattern.
    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.writer.write_f64::<LittleEndian>(value)?;
        self.update(&value.to_le_bytes());
        Ok(())
    }

    /// Write a variable-length integer.
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let encoded = encode_u64(value);
        self.write_raw(&encoded)
    }

    /// Write a UTF-8 string with a varint length prefix.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = value.as_bytes();
        self.write_varint(bytes.len() as u64)?;
        self.write_raw(bytes)
    }

    /// Write raw bytes without a length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.update(value);
        Ok(())
    }

    /// Number of payload bytes written so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// CRC32 of the payload written so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.position += data.len() as u64;
    }

    /// Append the checksum trailer, sync and close the output.
    ///
    /// Returns the payload checksum.
    pub fn finish(mut self) -> Result<u32> {
        let checksum = self.checksum();
        self.writer.write_u32::<LittleEndian>(checksum)?;
        self.writer.flush_and_sync()?;
        self.writer.close()?;
        Ok(checksum)
    }
}

/// A checksumming reader for data produced by [`StructWriter`].
///
/// Every failure caused by the bytes themselves (truncation, bad UTF-8,
/// checksum mismatch, trailing data) is reported as a model error.
pub struct StructReader<R: StorageInput> {
    reader: R,
    hasher: Hasher,
    position: u64,
    payload_size: u64,
}

impl<R: StorageInput> StructReader<R> {
    /// Create a new structured reader.
    pub fn new(reader: R) -> Result<Self> {
        let file_size = reader.size()?;
        if file_size < CHECKSUM_LEN {
            return Err(VietcatError::model(format!(
                "Data too short for checksum: {file_size} bytes"
            )));
        }

        Ok(StructReader {
            reader,
            hasher: Hasher::new(),
            position: 0,
            payload_size: file_size - CHECKSUM_LEN,
        })
    }

    /// Payload bytes not yet consumed.
    pub fn remaining(&self) -> u64 {
        self.payload_size.saturating_sub(self.position)
    }

    /// Number of payload bytes read so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// CRC32 of the payload read so far.
    pub fn checksum(&self) -> u32 {
        self.hasher.clone().finalize()
    }

    /// Read exactly `length` raw payload bytes.
    pub fn read_raw(&mut self, length: usize) -> Result<Vec<u8>> {
        self.ensure_available(length as u64)?;

        let mut buffer = vec![0u8; length];
        self.reader.read_exact(&mut buffer)?;
        self.hasher.update(&buffer);
        self.position += length as u64;
        Ok(buffer)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_available(N as u64)?;

        let mut buffer = [0u8; N];
        self.reader.read_exact(&mut buffer)?;
        self.hasher.update(&buffer);
        self.position += N as u64;
        Ok(buffer)
    }

    fn ensure_available(&self, length: u64) -> Result<()> {
        if length > self.remaining() {
            return Err(VietcatError::model(format!(
                "Unexpected end of data at offset {}: need {length} bytes, {} left",
                self.position,
                self.remaining()
            )));
        }
        Ok(())
    }

    /// Read a u8 value.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a u16 value (little-endian).
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(&self.read_array::<2>()?))
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(&self.read_array::<4>()?))
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(&self.read_array::<8>()?))
    }

    /// Read an i64 value (little-endian).
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(&self.read_array::<8>()?))
    }

    /// Read a f64 value (little-endian).
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(&self.read_array::<8>()?))
    }

    /// Read a variable-length integer.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut bytes = Vec::with_capacity(MAX_VARINT_LEN);
        loop {
            let byte = self.read_u8()?;
            bytes.push(byte);
            if byte & 0x80 == 0 || bytes.len() == MAX_VARINT_LEN {
                break;
            }
        }

        let (value, _) = decode_u64(&bytes)?;
        Ok(value)
    }

    /// Read a varint length prefix and check it against the bytes left.
    pub fn read_length(&mut self, element_size: u64) -> Result<usize> {
        let length = self.read_varint()?;
        let needed = length
            .checked_mul(element_size)
            .ok_or_else(|| VietcatError::model(format!("Length prefix overflows: {length}")))?;
        self.ensure_available(needed)?;

        usize::try_from(length)
            .map_err(|_| VietcatError::model(format!("Length prefix too large: {length}")))
    }

    /// Read a UTF-8 string with a varint length prefix.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_length(1)?;
        let bytes = self.read_raw(length)?;
        String::from_utf8(bytes)
            .map_err(|e| VietcatError::model(format!("Invalid UTF-8 in string: {e}")))
    }

    /// Check that the whole payload was consumed and that the trailing
    /// checksum matches it. Returns the checksum.
    pub fn verify_checksum(&mut self) -> Result<u32> {
        if self.remaining() > 0 {
            return Err(VietcatError::model(format!(
                "{} unexpected trailing bytes before checksum",
                self.remaining()
            )));
        }

        let stored = self.reader.read_u32::<LittleEndian>()?;
        let computed = self.checksum();
        if stored != computed {
            return Err(VietcatError::model(format!(
                "Checksum mismatch: stored {stored:08x}, computed {computed:08x}"
            )));
        }

        Ok(computed)
    }

    /// Close the reader.
    pub fn close(mut self) -> Result<()> {
        self.reader.close()
    }
}
