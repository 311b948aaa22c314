#![allow(dead_code)]

use std::collections::HashMap;

/// Builds class-file bytes in memory so execution tests run the whole
/// pipeline (parse, load, interpret) without binary fixtures.
pub struct ClassBuilder {
    entries: Vec<Vec<u8>>,
    next_index: u16,
    utf8_cache: HashMap<String, u16>,
    class_cache: HashMap<String, u16>,
    methods: Vec<Vec<u8>>,
    this_class: u16,
}

fn u2(value: u16) -> [u8; 2] {
    value.to_be_bytes()
}

fn u4(value: u32) -> [u8; 4] {
    value.to_be_bytes()
}

impl ClassBuilder {
    pub fn new(class_name: &str) -> ClassBuilder {
        let mut builder = ClassBuilder {
            entries: vec![],
            next_index: 1,
            utf8_cache: HashMap::new(),
            class_cache: HashMap::new(),
            methods: vec![],
            this_class: 0,
        };
        builder.this_class = builder.class(class_name);
        builder
    }

    fn push_entry(&mut self, bytes: Vec<u8>, wide: bool) -> u16 {
        let index = self.next_index;
        self.next_index += if wide { 2 } else { 1 };
        self.entries.push(bytes);
        index
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        if let Some(&index) = self.utf8_cache.get(text) {
            return index;
        }
        let mut bytes = vec![1];
        bytes.extend_from_slice(&u2(text.len() as u16));
        bytes.extend_from_slice(text.as_bytes());
        let index = self.push_entry(bytes, false);
        self.utf8_cache.insert(text.to_string(), index);
        index
    }

    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&u4(value as u32));
        self.push_entry(bytes, false)
    }

    pub fn float(&mut self, value: f32) -> u16 {
        let mut bytes = vec![4];
        bytes.extend_from_slice(&u4(value.to_bits()));
        self.push_entry(bytes, false)
    }

    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&(value as u64).to_be_bytes());
        self.push_entry(bytes, true)
    }

    pub fn double(&mut self, value: f64) -> u16 {
        let mut bytes = vec![6];
        bytes.extend_from_slice(&value.to_bits().to_be_bytes());
        self.push_entry(bytes, true)
    }

    pub fn class(&mut self, name: &str) -> u16 {
        if let Some(&index) = self.class_cache.get(name) {
            return index;
        }
        let name_index = self.utf8(name);
        let mut bytes = vec![7];
        bytes.extend_from_slice(&u2(name_index));
        let index = self.push_entry(bytes, false);
        self.class_cache.insert(name.to_string(), index);
        index
    }

    pub fn string(&mut self, text: &str) -> u16 {
        let text_index = self.utf8(text);
        let mut bytes = vec![8];
        bytes.extend_from_slice(&u2(text_index));
        self.push_entry(bytes, false)
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let mut bytes = vec![12];
        bytes.extend_from_slice(&u2(name_index));
        bytes.extend_from_slice(&u2(descriptor_index));
        self.push_entry(bytes, false)
    }

    pub fn field_ref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class_name);
        let nat_index = self.name_and_type(name, descriptor);
        let mut bytes = vec![9];
        bytes.extend_from_slice(&u2(class_index));
        bytes.extend_from_slice(&u2(nat_index));
        self.push_entry(bytes, false)
    }

    pub fn method_ref(&mut self, class_name: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class_name);
        let nat_index = self.name_and_type(name, descriptor);
        let mut bytes = vec![10];
        bytes.extend_from_slice(&u2(class_index));
        bytes.extend_from_slice(&u2(nat_index));
        self.push_entry(bytes, false)
    }

    pub fn add_method(
        &mut self,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: &[u8],
    ) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let code_name_index = self.utf8("Code");

        let mut record = vec![];
        record.extend_from_slice(&u2(0x0009)); // public static
        record.extend_from_slice(&u2(name_index));
        record.extend_from_slice(&u2(descriptor_index));
        record.extend_from_slice(&u2(1)); // one attribute: Code
        record.extend_from_slice(&u2(code_name_index));
        // max_stack + max_locals + code_length + code + empty exception
        // table + empty nested attribute list.
        record.extend_from_slice(&u4(2 + 2 + 4 + code.len() as u32 + 2 + 2));
        record.extend_from_slice(&u2(max_stack));
        record.extend_from_slice(&u2(max_locals));
        record.extend_from_slice(&u4(code.len() as u32));
        record.extend_from_slice(code);
        record.extend_from_slice(&u2(0));
        record.extend_from_slice(&u2(0));
        self.methods.push(record);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = vec![];
        bytes.extend_from_slice(&u4(0xCAFE_BABE));
        bytes.extend_from_slice(&u2(0)); // minor_version
        bytes.extend_from_slice(&u2(52)); // major_version (Java 8)
        bytes.extend_from_slice(&u2(self.next_index));
        for entry in &self.entries {
            bytes.extend_from_slice(entry);
        }
        bytes.extend_from_slice(&u2(0x0021)); // public super
        bytes.extend_from_slice(&u2(self.this_class));
        bytes.extend_from_slice(&u2(0)); // super_class
        bytes.extend_from_slice(&u2(0)); // interfaces_count
        bytes.extend_from_slice(&u2(0)); // fields_count
        bytes.extend_from_slice(&u2(self.methods.len() as u16));
        for method in &self.methods {
            bytes.extend_from_slice(method);
        }
        bytes.extend_from_slice(&u2(0)); // class attributes_count
        bytes
    }
}
