//! Binary log file format written by `Exporter` templates that persist raw
//! events to disk: a fixed, versioned header followed by one
//! `(metadata, data)` record per event, replacing a language-native pickle
//! header with something any reader can parse without running Python.

use std::io::{self, Read, Write};

const MAGIC: [u8; 4] = *b"MIM0";
const CURRENT_VERSION: u16 = 1;

/// Fixed-size header written once at the start of a binary log file.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinLogHeader {
    pub magic: [u8; 4],
    pub version: u16,
    pub data_length: u32,
    pub data_element_size: u32,
    pub metadata_size: u32,
}

impl BinLogHeader {
    #[must_use]
    pub fn new(data_length: u32, data_element_size: u32, metadata_size: u32) -> Self {
        Self {
            magic: MAGIC,
            version: CURRENT_VERSION,
            data_length,
            data_element_size,
            metadata_size,
        }
    }

    const WIRE_SIZE: usize = 4 + 2 + 4 + 4 + 4;

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.data_length.to_le_bytes())?;
        writer.write_all(&self.data_element_size.to_le_bytes())?;
        writer.write_all(&self.metadata_size.to_le_bytes())?;
        Ok(())
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut buf = [0u8; Self::WIRE_SIZE];
        reader.read_exact(&mut buf)?;

        let magic = [buf[0], buf[1], buf[2], buf[3]];
        if magic != MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad binlog magic"));
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != CURRENT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported binlog version {version}"),
            ));
        }
        let data_length = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
        let data_element_size = u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]);
        let metadata_size = u32::from_le_bytes([buf[14], buf[15], buf[16], buf[17]]);

        Ok(Self {
            magic,
            version,
            data_length,
            data_element_size,
            metadata_size,
        })
    }

    #[must_use]
    pub fn record_size(&self) -> usize {
        self.metadata_size as usize + (self.data_length * self.data_element_size) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let header = BinLogHeader::new(64, 8, 24);
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        let parsed = BinLogHeader::read_from(&buf[..]).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn rejects_bad_magic() {
        let buf = [0u8; BinLogHeader::WIRE_SIZE];
        assert!(BinLogHeader::read_from(&buf[..]).is_err());
    }
}
