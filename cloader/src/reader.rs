use std::io::Cursor;

use byteorder::{ReadBytesExt, BE};

use crate::errors::class_loading::{LoadingCause, LoadingError};

/// Position-advancing big-endian reads over a borrowed byte region.
///
/// Every read checks the remaining length first; running off the end of the
/// region is a [`LoadingError`], never an out-of-bounds access.
pub struct ClassReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> ClassReader<'a> {
        ClassReader {
            cursor: Cursor::new(data),
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    fn check(&self, wanted: usize) -> Result<(), LoadingError> {
        if self.remaining() < wanted {
            return Err(LoadingError::new(
                LoadingCause::UnexpectedEof(self.position()),
                &format!("wanted {wanted} more bytes, {} left", self.remaining()),
            ));
        }
        Ok(())
    }

    pub fn read_u1(&mut self) -> Result<u8, LoadingError> {
        self.check(1)?;
        Ok(self.cursor.read_u8().expect("length checked"))
    }

    pub fn read_u2(&mut self) -> Result<u16, LoadingError> {
        self.check(2)?;
        Ok(self.cursor.read_u16::<BE>().expect("length checked"))
    }

    pub fn read_u4(&mut self) -> Result<u32, LoadingError> {
        self.check(4)?;
        Ok(self.cursor.read_u32::<BE>().expect("length checked"))
    }

    /// Sign-extended 16-bit read, used for branch offsets.
    pub fn read_i2(&mut self) -> Result<i16, LoadingError> {
        Ok(self.read_u2()? as i16)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, LoadingError> {
        self.check(count)?;
        let start = self.cursor.position() as usize;
        let bytes = self.cursor.get_ref()[start..start + count].to_vec();
        self.cursor.set_position((start + count) as u64);
        Ok(bytes)
    }
}
