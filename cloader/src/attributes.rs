use crate::constants::ConstantPool;
use crate::errors::class_loading::{LoadingCause, LoadingError};
use crate::reader::ClassReader;

/// [Attributes](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7)
///
/// Only the attributes the machine consumes are decoded; everything else is
/// kept as an opaque payload under its name index.
#[derive(Clone, Debug)]
pub enum AttributeInfo {
    Code(CodeAttribute),
    SourceFile(SourceFile),
    Other { name_index: u16, info: Vec<u8> },
}

/// The decoded body of a `Code` attribute.
///
/// The exception table and nested attributes at the tail of the payload are
/// not decoded; this machine has no use for either.
#[derive(Clone, Debug, Default)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
}

impl CodeAttribute {
    fn from_payload(payload: &[u8]) -> Result<CodeAttribute, LoadingError> {
        let mut reader = ClassReader::new(payload);
        let max_stack = reader.read_u2()?;
        let max_locals = reader.read_u2()?;
        let code_length = reader.read_u4()?;
        if code_length as usize > reader.remaining() {
            return Err(LoadingError::new(
                LoadingCause::AttributeOverrun(code_length),
                "Code attribute body is shorter than its code_length",
            ));
        }
        let code = reader.read_bytes(code_length as usize)?;
        Ok(CodeAttribute {
            max_stack,
            max_locals,
            code,
        })
    }
}

#[derive(Clone, Debug)]
pub struct SourceFile {
    pub sourcefile_index: u16,
}

/// Read one attributes block: `count: u2`, then `count` records of
/// `name_index: u2`, `length: u4`, `length` payload bytes.
pub fn read_attributes(
    constant_pool: &[ConstantPool],
    attributes: &mut Vec<AttributeInfo>,
    reader: &mut ClassReader,
) -> Result<(), LoadingError> {
    let count = reader.read_u2()?;
    for _ in 0..count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()?;
        let Some(ConstantPool::Utf8(name)) = constant_pool.get(name_index as usize) else {
            return Err(LoadingError::new(
                LoadingCause::InvalidAttributeNameIndex(name_index),
                "attribute name_index was not a Utf8 constant",
            ));
        };
        let payload = reader.read_bytes(length as usize)?;
        attributes.push(if *name == "Code" {
            AttributeInfo::Code(CodeAttribute::from_payload(&payload)?)
        } else if *name == "SourceFile" {
            let mut payload_reader = ClassReader::new(&payload);
            AttributeInfo::SourceFile(SourceFile {
                sourcefile_index: payload_reader.read_u2()?,
            })
        } else {
            AttributeInfo::Other {
                name_index,
                info: payload,
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::constants::Utf8;

    fn pool_with(names: &[&str]) -> Vec<ConstantPool> {
        let mut pool = vec![ConstantPool::Reserved];
        for name in names {
            pool.push(ConstantPool::Utf8(Utf8::from(*name)));
        }
        pool
    }

    #[test]
    fn decodes_code_attribute_eagerly() {
        let pool = pool_with(&["Code"]);
        // max_stack=2, max_locals=1, code=[iconst_0, return], empty
        // exception table and nested attribute list.
        let payload = [0, 2, 0, 1, 0, 0, 0, 2, 0x03, 0xb1, 0, 0, 0, 0];
        let mut bytes = vec![0, 1, 0, 1, 0, 0, 0, payload.len() as u8];
        bytes.extend_from_slice(&payload);

        let mut attributes = vec![];
        let mut reader = ClassReader::new(&bytes);
        read_attributes(&pool, &mut attributes, &mut reader).unwrap();

        let AttributeInfo::Code(ref code) = attributes[0] else {
            panic!("expected a Code attribute");
        };
        assert_eq!(code.max_stack, 2);
        assert_eq!(code.max_locals, 1);
        assert_eq!(code.code, vec![0x03, 0xb1]);
    }

    #[test]
    fn unknown_attributes_keep_their_payload() {
        let pool = pool_with(&["Deprecated"]);
        let bytes = [0, 1, 0, 1, 0, 0, 0, 0];
        let mut attributes = vec![];
        let mut reader = ClassReader::new(&bytes);
        read_attributes(&pool, &mut attributes, &mut reader).unwrap();
        assert!(matches!(
            attributes[0],
            AttributeInfo::Other { name_index: 1, .. }
        ));
    }

    #[test]
    fn code_length_overrun_is_an_error() {
        let pool = pool_with(&["Code"]);
        // code_length claims 100 bytes but the payload ends immediately.
        let payload = [0, 1, 0, 1, 0, 0, 0, 100];
        let mut bytes = vec![0, 1, 0, 1, 0, 0, 0, payload.len() as u8];
        bytes.extend_from_slice(&payload);
        let mut attributes = vec![];
        let mut reader = ClassReader::new(&bytes);
        assert!(read_attributes(&pool, &mut attributes, &mut reader).is_err());
    }

    #[test]
    fn bad_name_index_is_an_error() {
        let pool = pool_with(&[]);
        let bytes = [0, 1, 0, 9, 0, 0, 0, 0];
        let mut attributes = vec![];
        let mut reader = ClassReader::new(&bytes);
        let err = read_attributes(&pool, &mut attributes, &mut reader).unwrap_err();
        assert!(matches!(
            err.cause(),
            LoadingCause::InvalidAttributeNameIndex(9)
        ));
    }
}
