use std::error::Error;

use crate::access_flags::{ClassAccessFlags, FieldAccessFlags, MethodAccessFlags};
use crate::attributes::{self, AttributeInfo, CodeAttribute};
use crate::constants::{self, ConstantPool, Utf8};
use crate::descriptors::MethodDescriptor;
use crate::errors::class_format_check::{FormatCause, FormatError};
use crate::reader::ClassReader;

/// [Fields](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.5)
#[derive(Clone, Debug, Default)]
pub struct FieldInfo {
    pub access_flags: Vec<FieldAccessFlags>,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl FieldInfo {
    fn read(
        reader: &mut ClassReader,
        constant_pool: &[ConstantPool],
    ) -> Result<FieldInfo, Box<dyn Error>> {
        let flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let mut attributes = vec![];
        attributes::read_attributes(constant_pool, &mut attributes, reader)?;
        Ok(FieldInfo {
            access_flags: FieldAccessFlags::from_u16(flags),
            name_index,
            descriptor_index,
            attributes,
        })
    }

    pub fn pretty_fmt(&self, constant_pool: &[ConstantPool]) -> String {
        let mut output = String::new();
        output.push_str("FieldInfo {\n");
        output.push_str(&format!("\tFlags: {:?}\n", self.access_flags));
        output.push_str(&format!(
            "\tName: {:?}\n",
            constant_pool[self.name_index as usize]
        ));
        output.push_str(&format!(
            "\tDescriptor: {:?}\n",
            constant_pool[self.descriptor_index as usize]
        ));
        output.push_str("}\n");
        output
    }
}

/// [Methods](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.6)
#[derive(Clone, Debug, Default)]
pub struct MethodInfo {
    pub access_flags: Vec<MethodAccessFlags>,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    fn read(
        reader: &mut ClassReader,
        constant_pool: &[ConstantPool],
    ) -> Result<MethodInfo, Box<dyn Error>> {
        let flags = reader.read_u2()?;
        let name_index = reader.read_u2()?;
        let descriptor_index = reader.read_u2()?;
        let mut attributes = vec![];
        attributes::read_attributes(constant_pool, &mut attributes, reader)?;
        Ok(MethodInfo {
            access_flags: MethodAccessFlags::from_u16(flags),
            name_index,
            descriptor_index,
            attributes,
        })
    }

    /// The eagerly decoded `Code` attribute, if the method has a body.
    pub fn code(&self) -> Option<&CodeAttribute> {
        self.attributes.iter().find_map(|attr| match attr {
            AttributeInfo::Code(code) => Some(code),
            _ => None,
        })
    }

    pub fn pretty_fmt(&self, constant_pool: &[ConstantPool]) -> String {
        let mut output = String::new();
        output.push_str("MethodInfo {\n");
        output.push_str(&format!("\tFlags: {:?}\n", self.access_flags));
        output.push_str(&format!(
            "\tName: {:?}\n",
            constant_pool[self.name_index as usize]
        ));
        output.push_str(&format!(
            "\tDescriptor: {:?}\n",
            constant_pool[self.descriptor_index as usize]
        ));
        if let Some(code) = self.code() {
            output.push_str(&format!("\tMax Stack: {}\n", code.max_stack));
            output.push_str(&format!("\tMax Locals: {}\n", code.max_locals));
            output.push_str(&format!("\tCode Length: {}\n", code.code.len()));
            let preview: Vec<String> = code
                .code
                .iter()
                .take(20)
                .map(|byte| format!("{byte:02X}"))
                .collect();
            let ellipsis = if code.code.len() > 20 { " ..." } else { "" };
            output.push_str(&format!("\tBytecode: {}{}\n", preview.join(" "), ellipsis));
        }
        output.push_str("}\n");
        output
    }
}

/// An in-memory `.class` file.
///
/// The `constant_pool` is materialized for every index in
/// `0..constant_pool_count`; `name` is resolved from `this_class` at load
/// time.
#[derive(Clone, Debug)]
pub struct ClassFile {
    /// Must be `0xCAFEBABE`.
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    /// Number of pool slots plus one; see [`crate::constants::read_constant_pool`].
    pub constant_pool_count: u16,
    pub constant_pool: Vec<ConstantPool>,
    pub access_flags: Vec<ClassAccessFlags>,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<AttributeInfo>,
    /// The internal name of this class, resolved eagerly from `this_class`.
    pub name: String,
}

impl ClassFile {
    pub fn from_bytes(bytes: &[u8]) -> Result<ClassFile, Box<dyn Error>> {
        let mut reader = ClassReader::new(bytes);
        let magic = reader.read_u4()?;
        if magic != 0xCAFE_BABE {
            return Err(Box::new(FormatError::new(
                FormatCause::IncorrectMagic(magic),
                "not a class file",
            )));
        }
        let minor_version = reader.read_u2()?;
        let major_version = reader.read_u2()?;
        let constant_pool_count = reader.read_u2()?;
        let constant_pool = {
            let mut pool = Vec::with_capacity(constant_pool_count as usize);
            constants::read_constant_pool(&mut pool, constant_pool_count, &mut reader)?;
            pool
        };
        let access_flags = ClassAccessFlags::from_u16(reader.read_u2()?);
        let this_class = reader.read_u2()?;
        let super_class = reader.read_u2()?;
        let interfaces_count = reader.read_u2()?;
        let interfaces = {
            let mut interfaces = Vec::with_capacity(interfaces_count as usize);
            for _ in 0..interfaces_count {
                interfaces.push(reader.read_u2()?);
            }
            interfaces
        };
        let field_count = reader.read_u2()?;
        let fields = {
            let mut fields = Vec::with_capacity(field_count as usize);
            for _ in 0..field_count {
                fields.push(FieldInfo::read(&mut reader, &constant_pool)?);
            }
            fields
        };
        let methods_count = reader.read_u2()?;
        let methods = {
            let mut methods = Vec::with_capacity(methods_count as usize);
            for _ in 0..methods_count {
                methods.push(MethodInfo::read(&mut reader, &constant_pool)?);
            }
            methods
        };
        let attributes = {
            let mut attributes = vec![];
            attributes::read_attributes(&constant_pool, &mut attributes, &mut reader)?;
            attributes
        };
        // The class file must not be truncated or have extra bytes at the end.
        if reader.remaining() != 0 {
            return Err(Box::new(FormatError::new(
                FormatCause::ExtraBytes,
                "class file has leftover bytes",
            )));
        }
        let mut class = ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool_count,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
            name: String::new(),
        };
        check_format(&class)?;
        class.name = class.class_name_at(class.this_class)?;
        Ok(class)
    }

    pub fn get_from_constant_pool(&self, index: u16) -> Result<&ConstantPool, FormatError> {
        self.constant_pool
            .get(index as usize)
            .ok_or_else(|| FormatError::new(FormatCause::InvalidIndex(index), "no such pool slot"))
    }

    /// Resolve `index` to a `Utf8` entry.
    pub fn utf8(&self, index: u16) -> Result<&Utf8, FormatError> {
        match self.get_from_constant_pool(index)? {
            ConstantPool::Utf8(utf8) => Ok(utf8),
            other => Err(FormatError::new(
                FormatCause::InvalidIndex(index),
                &format!("expected a Utf8 constant, found {}", other.kind()),
            )),
        }
    }

    /// Resolve `index` through a `Class` entry to the class name.
    pub fn class_name_at(&self, index: u16) -> Result<String, FormatError> {
        match self.get_from_constant_pool(index)? {
            ConstantPool::Class(class) => Ok(String::from(self.utf8(class.name_index)?)),
            other => Err(FormatError::new(
                FormatCause::InvalidIndex(index),
                &format!("expected a Class constant, found {}", other.kind()),
            )),
        }
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<String, FormatError> {
        Ok(String::from(self.utf8(method.name_index)?))
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<String, FormatError> {
        Ok(String::from(self.utf8(method.descriptor_index)?))
    }

    /// First method with the given name, in declaration order.
    pub fn find_method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| match self.utf8(method.name_index) {
                Ok(utf8) => *utf8 == name,
                Err(_) => false,
            })
    }

    /// Method with the given name and descriptor.
    pub fn find_method_exact(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods.iter().find(|method| {
            matches!(self.utf8(method.name_index), Ok(utf8) if *utf8 == name)
                && matches!(self.utf8(method.descriptor_index), Ok(utf8) if *utf8 == descriptor)
        })
    }

    pub fn to_pretty_fmt(&self) -> String {
        let mut output = String::new();
        for attribute in &self.attributes {
            if let AttributeInfo::SourceFile(sf) = attribute {
                if let Ok(title) = self.utf8(sf.sourcefile_index) {
                    output.push_str(&format!("Compiled from {:?}\n", title));
                }
            }
        }
        output.push_str(&format!("Magic: {:#010X}\n", self.magic));
        output.push_str(&format!("Class Name: {}\n", self.name));
        output.push_str(&format!(
            "Java Version: {}.{}\n",
            self.major_version, self.minor_version
        ));
        output.push_str(&format!("Access Flags: {:?}\n", self.access_flags));
        output.push_str(&format!(
            "Constant Pool: Size {}\n[\n",
            self.constant_pool_count
        ));
        for (i, entry) in self.constant_pool.iter().enumerate() {
            if i != 0 {
                output.push_str(&format!("{i}: {entry:?}\n"));
            }
        }
        output.push_str("]\n");
        output.push_str(&format!("Fields: Count {}\n", self.fields.len()));
        for field in &self.fields {
            output.push_str(&field.pretty_fmt(&self.constant_pool));
        }
        output.push_str(&format!("Methods: Count {}\n", self.methods.len()));
        for method in &self.methods {
            output.push_str(&method.pretty_fmt(&self.constant_pool));
        }
        output
    }
}

/// [Format Checking](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.8)
///
/// Validates that every cross-index stored in the pool points at an entry of
/// the expected kind, so the runtime can resolve without re-checking.
fn check_format(class: &ClassFile) -> Result<(), FormatError> {
    for constant in &class.constant_pool {
        match constant {
            ConstantPool::Class(c) => {
                class.utf8(c.name_index)?;
            }
            ConstantPool::String(s) => {
                class.utf8(s.string_index)?;
            }
            ConstantPool::Fieldref(f) => {
                class.class_name_at(f.class_index)?;
                let ConstantPool::NameAndType(_) =
                    class.get_from_constant_pool(f.name_and_type_index)?
                else {
                    return Err(FormatError::new(
                        FormatCause::InvalidIndex(f.name_and_type_index),
                        "Fieldref name_and_type_index was not a NameAndType constant",
                    ));
                };
            }
            ConstantPool::Methodref(m) => {
                class.class_name_at(m.class_index)?;
                let ConstantPool::NameAndType(nat) =
                    class.get_from_constant_pool(m.name_and_type_index)?
                else {
                    return Err(FormatError::new(
                        FormatCause::InvalidIndex(m.name_and_type_index),
                        "Methodref name_and_type_index was not a NameAndType constant",
                    ));
                };
                class.utf8(nat.name_index)?;
                let descriptor = String::from(class.utf8(nat.descriptor_index)?);
                MethodDescriptor::parse(&descriptor)?;
            }
            ConstantPool::NameAndType(nat) => {
                class.utf8(nat.name_index)?;
                class.utf8(nat.descriptor_index)?;
            }
            _ => {}
        }
    }
    // this_class must name this class.
    class.class_name_at(class.this_class)?;
    for method in &class.methods {
        class.utf8(method.name_index)?;
        let descriptor = String::from(class.utf8(method.descriptor_index)?);
        MethodDescriptor::parse(&descriptor)?;
    }
    for field in &class.fields {
        class.utf8(field.name_index)?;
        class.utf8(field.descriptor_index)?;
    }
    Ok(())
}
