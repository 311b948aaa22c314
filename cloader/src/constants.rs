use std::str::from_utf8;

use crate::errors::class_loading::{LoadingCause, LoadingError};
use crate::reader::ClassReader;

/// [The Constant Pool](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4)
///
/// The pool is indexed from 1; index 0 and the slot following a `Long` or
/// `Double` entry hold [`ConstantPool::Reserved`] so that every index in
/// `0..constant_pool_count` is materialized.
#[derive(Clone, Debug)]
pub enum ConstantPool {
    Utf8(Utf8),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(Class),
    String(StringInfo),
    Fieldref(Fieldref),
    Methodref(Methodref),
    NameAndType(NameAndType),
    Reserved,
}

impl ConstantPool {
    /// The tag name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConstantPool::Utf8(_) => "Utf8",
            ConstantPool::Integer(_) => "Integer",
            ConstantPool::Float(_) => "Float",
            ConstantPool::Long(_) => "Long",
            ConstantPool::Double(_) => "Double",
            ConstantPool::Class(_) => "Class",
            ConstantPool::String(_) => "String",
            ConstantPool::Fieldref(_) => "Fieldref",
            ConstantPool::Methodref(_) => "Methodref",
            ConstantPool::NameAndType(_) => "NameAndType",
            ConstantPool::Reserved => "Reserved",
        }
    }
}

#[repr(u8)]
pub enum Tags {
    Utf8 = 1,
    Integer = 3,
    Float = 4,
    Long = 5,
    Double = 6,
    Class = 7,
    String = 8,
    Fieldref = 9,
    Methodref = 10,
    NameAndType = 12,
    Unknown = 0,
}

impl From<u8> for Tags {
    fn from(value: u8) -> Self {
        match value {
            1 => Tags::Utf8,
            3 => Tags::Integer,
            4 => Tags::Float,
            5 => Tags::Long,
            6 => Tags::Double,
            7 => Tags::Class,
            8 => Tags::String,
            9 => Tags::Fieldref,
            10 => Tags::Methodref,
            12 => Tags::NameAndType,
            _ => Tags::Unknown,
        }
    }
}

/// Raw modified-UTF8 payload of a `CONSTANT_Utf8_info` entry.
#[derive(Clone)]
pub struct Utf8 {
    pub bytes: Vec<u8>,
}

impl Utf8 {
    fn read(reader: &mut ClassReader) -> Result<Utf8, LoadingError> {
        let length = reader.read_u2()?;
        Ok(Utf8 {
            bytes: reader.read_bytes(length as usize)?,
        })
    }
}

impl From<&str> for Utf8 {
    fn from(input: &str) -> Self {
        Utf8 {
            bytes: input.as_bytes().to_vec(),
        }
    }
}

impl From<&Utf8> for std::string::String {
    fn from(value: &Utf8) -> Self {
        // Modified UTF-8 oddities (embedded NULs, surrogate pairs) are not
        // produced by the inputs this machine runs; fall back lossily.
        match from_utf8(&value.bytes) {
            Ok(s) => s.to_string(),
            Err(_) => std::string::String::from_utf8_lossy(&value.bytes).into_owned(),
        }
    }
}

impl PartialEq<&str> for Utf8 {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl std::fmt::Debug for Utf8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"", std::string::String::from(self))
    }
}

/// `CONSTANT_Class_info`; `name_index` must resolve to a `Utf8` entry.
#[derive(Clone, Debug)]
pub struct Class {
    pub name_index: u16,
}

impl Class {
    pub fn new(name_index: u16) -> Class {
        Class { name_index }
    }
}

/// `CONSTANT_String_info`; `string_index` must resolve to a `Utf8` entry.
#[derive(Clone, Debug)]
pub struct StringInfo {
    pub string_index: u16,
}

impl StringInfo {
    pub fn new(string_index: u16) -> StringInfo {
        StringInfo { string_index }
    }
}

/// `CONSTANT_Fieldref_info`; class + name-and-type cross-references.
#[derive(Clone, Debug)]
pub struct Fieldref {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

impl Fieldref {
    pub fn new(class_index: u16, name_and_type_index: u16) -> Fieldref {
        Fieldref {
            class_index,
            name_and_type_index,
        }
    }
}

/// `CONSTANT_Methodref_info`; class + name-and-type cross-references.
#[derive(Clone, Debug)]
pub struct Methodref {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

impl Methodref {
    pub fn new(class_index: u16, name_and_type_index: u16) -> Methodref {
        Methodref {
            class_index,
            name_and_type_index,
        }
    }
}

/// `CONSTANT_NameAndType_info`; both indices must resolve to `Utf8` entries.
#[derive(Clone, Debug)]
pub struct NameAndType {
    pub name_index: u16,
    pub descriptor_index: u16,
}

impl NameAndType {
    pub fn new(name_index: u16, descriptor_index: u16) -> NameAndType {
        NameAndType {
            name_index,
            descriptor_index,
        }
    }
}

/// Read `count - 1` constant-pool entries (the table is 1-indexed).
///
/// `Long` and `Double` consume two index slots; the trailing slot is pushed
/// as [`ConstantPool::Reserved`]. An unrecognized tag fails the parse.
pub fn read_constant_pool(
    pool: &mut Vec<ConstantPool>,
    count: u16,
    reader: &mut ClassReader,
) -> Result<(), LoadingError> {
    pool.push(ConstantPool::Reserved);
    while pool.len() < count as usize {
        let tag = reader.read_u1()?;
        let entry = match Tags::from(tag) {
            Tags::Utf8 => ConstantPool::Utf8(Utf8::read(reader)?),
            Tags::Integer => ConstantPool::Integer(reader.read_u4()? as i32),
            Tags::Float => ConstantPool::Float(f32::from_bits(reader.read_u4()?)),
            Tags::Long => {
                let high = reader.read_u4()? as u64;
                let low = reader.read_u4()? as u64;
                ConstantPool::Long(((high << 32) | low) as i64)
            }
            Tags::Double => {
                let high = reader.read_u4()? as u64;
                let low = reader.read_u4()? as u64;
                ConstantPool::Double(f64::from_bits((high << 32) | low))
            }
            Tags::Class => ConstantPool::Class(Class::new(reader.read_u2()?)),
            Tags::String => ConstantPool::String(StringInfo::new(reader.read_u2()?)),
            Tags::Fieldref => {
                ConstantPool::Fieldref(Fieldref::new(reader.read_u2()?, reader.read_u2()?))
            }
            Tags::Methodref => {
                ConstantPool::Methodref(Methodref::new(reader.read_u2()?, reader.read_u2()?))
            }
            Tags::NameAndType => {
                ConstantPool::NameAndType(NameAndType::new(reader.read_u2()?, reader.read_u2()?))
            }
            Tags::Unknown => {
                return Err(LoadingError::new(
                    LoadingCause::InvalidConstantTag(tag),
                    &format!("at position {:#06X}", reader.position() - 1),
                ));
            }
        };
        let wide = matches!(entry, ConstantPool::Long(_) | ConstantPool::Double(_));
        pool.push(entry);
        if wide {
            pool.push(ConstantPool::Reserved);
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn read_pool(count: u16, bytes: &[u8]) -> Result<Vec<ConstantPool>, LoadingError> {
        let mut pool = Vec::with_capacity(count as usize);
        let mut reader = ClassReader::new(bytes);
        read_constant_pool(&mut pool, count, &mut reader)?;
        Ok(pool)
    }

    #[test]
    fn utf8_and_integer_entries() {
        let bytes = [
            1, 0, 2, b'h', b'i', // Utf8 "hi"
            3, 0xFF, 0xFF, 0xFF, 0xFE, // Integer -2
        ];
        let pool = read_pool(3, &bytes).unwrap();
        assert!(matches!(pool[0], ConstantPool::Reserved));
        let ConstantPool::Utf8(ref utf8) = pool[1] else {
            panic!("entry 1 was not Utf8");
        };
        assert_eq!(String::from(utf8), "hi");
        assert!(matches!(pool[2], ConstantPool::Integer(-2)));
    }

    #[test]
    fn long_takes_two_slots() {
        let bytes = [
            5, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, // Long 1 << 32
            3, 0x00, 0x00, 0x00, 0x07, // Integer 7
        ];
        let pool = read_pool(4, &bytes).unwrap();
        assert!(matches!(pool[1], ConstantPool::Long(0x1_0000_0000)));
        assert!(matches!(pool[2], ConstantPool::Reserved));
        assert!(matches!(pool[3], ConstantPool::Integer(7)));
    }

    #[test]
    fn double_decodes_ieee754() {
        let bits = 2.5f64.to_bits();
        let mut bytes = vec![6];
        bytes.extend_from_slice(&bits.to_be_bytes());
        let pool = read_pool(3, &bytes).unwrap();
        let ConstantPool::Double(d) = pool[1] else {
            panic!("entry 1 was not Double");
        };
        assert_eq!(d, 2.5);
    }

    #[test]
    fn unknown_tag_fails_the_parse() {
        // Tag 13 is unassigned; the loader must not skip over it.
        let bytes = [13, 0, 0];
        let err = read_pool(2, &bytes).unwrap_err();
        assert!(matches!(err.cause(), LoadingCause::InvalidConstantTag(13)));
    }

    #[test]
    fn truncated_entry_fails_the_parse() {
        let bytes = [1, 0, 5, b'a']; // Utf8 claims 5 bytes, only 1 present
        assert!(read_pool(2, &bytes).is_err());
    }
}
