//! Output encoding: Unicode scalars to bytes on the sink.

use std::io::Write;

use crate::error::{Error, Result};
use crate::reader::Encoding;

pub(crate) struct Writer<W> {
    sink: W,
    encoding: Encoding,
    bom_written: bool,
}

impl<W: Write> Writer<W> {
    pub fn new(sink: W, encoding: Encoding) -> Writer<W> {
        Writer {
            sink,
            encoding,
            bom_written: false,
        }
    }

    /// Encode and push one string. UTF-16 output leads with a BOM.
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        match self.encoding {
            Encoding::Utf8 => {
                self.sink.write_all(text.as_bytes())?;
            }
            Encoding::Utf16Le => {
                self.write_bom([0xFF, 0xFE])?;
                for unit in text.encode_utf16() {
                    self.sink.write_all(&unit.to_le_bytes())?;
                }
            }
            Encoding::Utf16Be => {
                self.write_bom([0xFE, 0xFF])?;
                for unit in text.encode_utf16() {
                    self.sink.write_all(&unit.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }

    fn write_bom(&mut self, bom: [u8; 2]) -> Result<()> {
        if !self.bom_written {
            self.bom_written = true;
            self.sink.write_all(&bom)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink
            .flush()
            .map_err(|err| Error::emitter(format!("write failure: {}", err)))
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_output() {
        let mut writer = Writer::new(Vec::new(), Encoding::Utf8);
        writer.write_str("a: b\n").unwrap();
        assert_eq!(writer.into_inner(), b"a: b\n");
    }

    #[test]
    fn test_utf16le_output_has_bom() {
        let mut writer = Writer::new(Vec::new(), Encoding::Utf16Le);
        writer.write_str("a").unwrap();
        assert_eq!(writer.into_inner(), vec![0xFF, 0xFE, 0x61, 0x00]);
    }

    #[test]
    fn test_utf16be_surrogate_pair() {
        let mut writer = Writer::new(Vec::new(), Encoding::Utf16Be);
        writer.write_str("\u{1F7D4}").unwrap();
        assert_eq!(writer.into_inner(), vec![0xFE, 0xFF, 0xD8, 0x3D, 0xDF, 0xD4]);
    }
}
