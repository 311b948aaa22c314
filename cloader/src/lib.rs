pub mod access_flags;
/// [Attributes](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.7)
pub mod attributes;
/// [Class File Format](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.1)
pub mod class_file;
/// [Constants](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.4)
pub mod constants;
/// [Descriptors](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.3)
pub mod descriptors;
pub mod errors;
pub mod reader;
