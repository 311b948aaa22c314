use crate::errors::execution::{ExecCause, ExecError};

/// Upper bound on live pool entries.
pub const MAX_STRING_POOL: usize = 256;
/// Upper bound on the byte length of a single entry.
pub const MAX_STRING_LENGTH: usize = 1024;

/// VM-wide table of heap strings produced by `ldc` and the host shims.
///
/// Entries are addressed by index and mutable in place, which is how
/// `StringBuilder.append` works: the receiver reference stays stable while
/// the buffer behind it grows.
#[derive(Default)]
pub struct StringPool {
    strings: Vec<String>,
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool { strings: vec![] }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Add a string to the pool and return its index.
    pub fn intern(&mut self, text: &str) -> Result<usize, ExecError> {
        if self.strings.len() >= MAX_STRING_POOL {
            return Err(ExecError::new(
                ExecCause::StringPoolExhausted,
                &format!("pool holds {MAX_STRING_POOL} strings"),
            ));
        }
        if text.len() > MAX_STRING_LENGTH {
            return Err(ExecError::new(
                ExecCause::StringTooLong,
                &format!("{} bytes exceeds the {MAX_STRING_LENGTH} byte cap", text.len()),
            ));
        }
        self.strings.push(text.to_string());
        Ok(self.strings.len() - 1)
    }

    pub fn get(&self, id: usize) -> Result<&str, ExecError> {
        self.strings
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| ExecError::new(ExecCause::InvalidStringRef(id), "no such pool entry"))
    }

    /// Grow an entry in place.
    pub fn append(&mut self, id: usize, text: &str) -> Result<(), ExecError> {
        let entry = self
            .strings
            .get_mut(id)
            .ok_or_else(|| ExecError::new(ExecCause::InvalidStringRef(id), "no such pool entry"))?;
        if entry.len() + text.len() > MAX_STRING_LENGTH {
            return Err(ExecError::new(
                ExecCause::StringTooLong,
                &format!("append would exceed the {MAX_STRING_LENGTH} byte cap"),
            ));
        }
        entry.push_str(text);
        Ok(())
    }
}
