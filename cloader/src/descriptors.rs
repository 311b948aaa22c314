use std::iter::Peekable;
use std::str::Chars;

use crate::errors::class_format_check::{FormatCause, FormatError};

/// [Field Descriptors](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.3.2)
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDescriptor {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<FieldDescriptor>),
}

impl FieldDescriptor {
    /// Whether a value of this type occupies two local-variable slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, FieldDescriptor::Long | FieldDescriptor::Double)
    }

    /// Source-style rendering, used by the class pretty printer.
    pub fn type_name(&self) -> String {
        match self {
            FieldDescriptor::Byte => "byte".into(),
            FieldDescriptor::Char => "char".into(),
            FieldDescriptor::Double => "double".into(),
            FieldDescriptor::Float => "float".into(),
            FieldDescriptor::Int => "int".into(),
            FieldDescriptor::Long => "long".into(),
            FieldDescriptor::Short => "short".into(),
            FieldDescriptor::Boolean => "boolean".into(),
            FieldDescriptor::Object(name) => name.replace('/', "."),
            FieldDescriptor::Array(component) => format!("{}[]", component.type_name()),
        }
    }

    fn parse_one(chars: &mut Peekable<Chars>) -> Option<FieldDescriptor> {
        match chars.next()? {
            'B' => Some(FieldDescriptor::Byte),
            'C' => Some(FieldDescriptor::Char),
            'D' => Some(FieldDescriptor::Double),
            'F' => Some(FieldDescriptor::Float),
            'I' => Some(FieldDescriptor::Int),
            'J' => Some(FieldDescriptor::Long),
            'S' => Some(FieldDescriptor::Short),
            'Z' => Some(FieldDescriptor::Boolean),
            'L' => {
                let mut name = String::new();
                loop {
                    match chars.next()? {
                        ';' => break,
                        c => name.push(c),
                    }
                }
                Some(FieldDescriptor::Object(name))
            }
            '[' => Some(FieldDescriptor::Array(Box::new(Self::parse_one(chars)?))),
            _ => None,
        }
    }
}

/// [Method Descriptors](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.3.3)
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnDescriptor {
    Void,
    Field(FieldDescriptor),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDescriptor {
    pub params: Vec<FieldDescriptor>,
    pub ret: ReturnDescriptor,
}

impl MethodDescriptor {
    /// Parse `(ParamDescriptors)ReturnDescriptor`.
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor, FormatError> {
        let invalid = || {
            FormatError::new(
                FormatCause::InvalidDescriptor(descriptor.to_string()),
                "not a method descriptor",
            )
        };
        let mut chars = descriptor.chars().peekable();
        if chars.next() != Some('(') {
            return Err(invalid());
        }
        let mut params = vec![];
        loop {
            if chars.peek() == Some(&')') {
                chars.next();
                break;
            }
            params.push(FieldDescriptor::parse_one(&mut chars).ok_or_else(invalid)?);
        }
        let ret = match chars.peek() {
            Some('V') => {
                chars.next();
                ReturnDescriptor::Void
            }
            Some(_) => ReturnDescriptor::Field(
                FieldDescriptor::parse_one(&mut chars).ok_or_else(invalid)?,
            ),
            None => return Err(invalid()),
        };
        if chars.next().is_some() {
            return Err(invalid());
        }
        Ok(MethodDescriptor { params, ret })
    }
}
