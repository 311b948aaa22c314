pub mod errors;
/// Per-invocation activation records.
pub mod frame;
/// Console and string host shims.
pub mod natives;
/// [Instruction Set](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-6.html)
pub mod ops;
pub mod string_pool;
/// Operand-stack slot values.
pub mod value;
/// The machine itself: class table, dispatch loop, invocation.
pub mod vm;
