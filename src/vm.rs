use std::io::{self, BufRead, BufReader, Write};

use log::{debug, trace};

use cloader::class_file::ClassFile;
use cloader::constants::ConstantPool;
use cloader::descriptors::{FieldDescriptor, MethodDescriptor, ReturnDescriptor};

use crate::errors::execution::{ExecCause, ExecError};
use crate::frame::StackFrame;
use crate::natives::NativeRegistry;
use crate::ops::Mnemonic;
use crate::string_pool::StringPool;
use crate::value::{Reference, Value};

/// Upper bound on simultaneously loaded classes.
pub const MAX_CLASSES: usize = 32;
/// Operand-stack slots across all live frames.
pub const MAX_STACK_SLOTS: usize = 2048;
/// Local-variable slots across all live frames.
pub const MAX_LOCAL_SLOTS: usize = 512;
/// Nested invocation limit, independent of the slot budgets.
pub const MAX_CALL_DEPTH: usize = 256;

/// The virtual machine: loaded classes, the string pool, the host-shim
/// registry, and the I/O handles the shims talk to.
///
/// Each frame owns operand-stack and locals vectors sized by its method's
/// `max_stack`/`max_locals`; the VM additionally enforces a machine-wide slot
/// budget so runaway recursion fails loudly instead of growing without bound.
pub struct Vm {
    classes: Vec<ClassFile>,
    pub(crate) string_pool: StringPool,
    natives: NativeRegistry,
    stack_slots: usize,
    local_slots: usize,
    call_depth: usize,
    pub(crate) stdout: Box<dyn Write>,
    pub(crate) stdin: Box<dyn BufRead>,
}

impl Vm {
    pub fn new() -> Vm {
        Vm::with_io(
            Box::new(io::stdout()),
            Box::new(BufReader::new(io::stdin())),
        )
    }

    /// A machine with caller-supplied standard streams, used by tests and by
    /// any host that wants to capture program output.
    pub fn with_io(stdout: Box<dyn Write>, stdin: Box<dyn BufRead>) -> Vm {
        Vm {
            classes: vec![],
            string_pool: StringPool::new(),
            natives: NativeRegistry::standard(),
            stack_slots: 0,
            local_slots: 0,
            call_depth: 0,
            stdout,
            stdin,
        }
    }

    pub fn load_class(&mut self, class: ClassFile) -> Result<usize, ExecError> {
        if self.classes.len() >= MAX_CLASSES {
            return Err(ExecError::new(
                ExecCause::ClassLimitReached,
                &format!("{MAX_CLASSES} classes already loaded"),
            ));
        }
        debug!(
            "loading class {} ({} methods, pool size {})",
            class.name,
            class.methods.len(),
            class.constant_pool_count
        );
        self.classes.push(class);
        Ok(self.classes.len() - 1)
    }

    pub fn string(&self, id: usize) -> Result<&str, ExecError> {
        self.string_pool.get(id)
    }

    /// Run a method by class and method name, with no arguments. Returns the
    /// method's result value, if it has one.
    pub fn execute(
        &mut self,
        class_name: &str,
        method_name: &str,
    ) -> Result<Option<Value>, ExecError> {
        let class_index = self
            .classes
            .iter()
            .position(|class| class.name == class_name)
            .ok_or_else(|| {
                ExecError::new(ExecCause::ClassNotFound(class_name.to_string()), "")
            })?;
        let descriptor = {
            let class = &self.classes[class_index];
            let method = class.find_method(method_name).ok_or_else(|| {
                ExecError::new(
                    ExecCause::MethodNotFound(method_name.to_string()),
                    &format!("in class {}", class.name),
                )
            })?;
            class.method_descriptor(method)?
        };
        self.invoke(class_index, method_name, &descriptor, vec![])
    }

    /// Enter a fresh frame for a method of the loaded class and run it to a
    /// return. Arguments land in the lowest local slots, wide values taking
    /// two indices each.
    fn invoke(
        &mut self,
        class_index: usize,
        method_name: &str,
        descriptor: &str,
        args: Vec<Value>,
    ) -> Result<Option<Value>, ExecError> {
        let (code, max_stack, max_locals) = {
            let class = &self.classes[class_index];
            let method = class
                .find_method_exact(method_name, descriptor)
                .or_else(|| class.find_method(method_name))
                .ok_or_else(|| {
                    ExecError::new(
                        ExecCause::MethodNotFound(method_name.to_string()),
                        &format!("in class {}", class.name),
                    )
                })?;
            let code = method.code().ok_or_else(|| {
                ExecError::new(ExecCause::MissingCode(method_name.to_string()), "")
            })?;
            (code.code.clone(), code.max_stack, code.max_locals)
        };

        self.reserve_frame(max_stack as usize, max_locals as usize)?;
        let mut frame = StackFrame::new(
            class_index,
            method_name.to_string(),
            code,
            max_stack,
            max_locals,
        );
        let placed = place_arguments(&mut frame, args);
        let result = match placed {
            Ok(()) => self.run_frame(&mut frame),
            Err(err) => Err(err),
        };
        self.release_frame(max_stack as usize, max_locals as usize);
        result
    }

    fn reserve_frame(&mut self, max_stack: usize, max_locals: usize) -> Result<(), ExecError> {
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(ExecError::new(
                ExecCause::CallDepthExceeded,
                &format!("{MAX_CALL_DEPTH} nested invocations"),
            ));
        }
        if self.stack_slots + max_stack > MAX_STACK_SLOTS
            || self.local_slots + max_locals > MAX_LOCAL_SLOTS
        {
            return Err(ExecError::new(
                ExecCause::SlotBudgetExceeded,
                &format!(
                    "{}/{MAX_STACK_SLOTS} stack and {}/{MAX_LOCAL_SLOTS} local slots in use",
                    self.stack_slots, self.local_slots
                ),
            ));
        }
        self.call_depth += 1;
        self.stack_slots += max_stack;
        self.local_slots += max_locals;
        Ok(())
    }

    fn release_frame(&mut self, max_stack: usize, max_locals: usize) {
        self.call_depth -= 1;
        self.stack_slots -= max_stack;
        self.local_slots -= max_locals;
    }

    /// The fetch/decode/dispatch loop. Runs until the frame's method returns
    /// or faults; the returned value belongs on the caller's operand stack.
    fn run_frame(&mut self, frame: &mut StackFrame) -> Result<Option<Value>, ExecError> {
        while frame.pc < frame.code.len() {
            let opcode_pc = frame.pc;
            let opcode = frame.fetch_u1()?;
            let mnemonic = Mnemonic::from(opcode);
            trace!("{}@{opcode_pc:#06X}: {mnemonic:?}", frame.method_name);
            match mnemonic {
                Mnemonic::Nop => {}
                Mnemonic::AconstNull => frame.push_reference(Reference::Null)?,
                Mnemonic::IconstM1 => frame.push_int(-1)?,
                Mnemonic::Iconst0 => frame.push_int(0)?,
                Mnemonic::Iconst1 => frame.push_int(1)?,
                Mnemonic::Iconst2 => frame.push_int(2)?,
                Mnemonic::Iconst3 => frame.push_int(3)?,
                Mnemonic::Iconst4 => frame.push_int(4)?,
                Mnemonic::Iconst5 => frame.push_int(5)?,
                Mnemonic::Lconst0 => frame.push_long(0)?,
                Mnemonic::Lconst1 => frame.push_long(1)?,
                Mnemonic::Fconst0 => frame.push_float(0.0)?,
                Mnemonic::Fconst1 => frame.push_float(1.0)?,
                Mnemonic::Fconst2 => frame.push_float(2.0)?,
                Mnemonic::Dconst0 => frame.push_double(0.0)?,
                Mnemonic::Dconst1 => frame.push_double(1.0)?,
                Mnemonic::Bipush => {
                    let value = frame.fetch_u1()? as i8;
                    frame.push_int(value as i32)?;
                }
                Mnemonic::Sipush => {
                    let value = frame.fetch_i2()?;
                    frame.push_int(value as i32)?;
                }
                Mnemonic::Ldc => {
                    let index = frame.fetch_u1()? as u16;
                    self.load_constant(frame, index)?;
                }
                Mnemonic::LdcW => {
                    let index = frame.fetch_u2()?;
                    self.load_constant(frame, index)?;
                }
                Mnemonic::Ldc2W => {
                    let index = frame.fetch_u2()?;
                    self.load_wide_constant(frame, index)?;
                }
                Mnemonic::Iload => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.load_int(index)?;
                    frame.push_int(value)?;
                }
                Mnemonic::Lload => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.load_long(index)?;
                    frame.push_long(value)?;
                }
                Mnemonic::Fload => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.load_float(index)?;
                    frame.push_float(value)?;
                }
                Mnemonic::Dload => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.load_double(index)?;
                    frame.push_double(value)?;
                }
                Mnemonic::Aload => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.load_reference(index)?;
                    frame.push_reference(value)?;
                }
                Mnemonic::Iload0 => {
                    let value = frame.load_int(0)?;
                    frame.push_int(value)?;
                }
                Mnemonic::Iload1 => {
                    let value = frame.load_int(1)?;
                    frame.push_int(value)?;
                }
                Mnemonic::Iload2 => {
                    let value = frame.load_int(2)?;
                    frame.push_int(value)?;
                }
                Mnemonic::Iload3 => {
                    let value = frame.load_int(3)?;
                    frame.push_int(value)?;
                }
                Mnemonic::Aload0 => {
                    let value = frame.load_reference(0)?;
                    frame.push_reference(value)?;
                }
                Mnemonic::Aload1 => {
                    let value = frame.load_reference(1)?;
                    frame.push_reference(value)?;
                }
                Mnemonic::Aload2 => {
                    let value = frame.load_reference(2)?;
                    frame.push_reference(value)?;
                }
                Mnemonic::Aload3 => {
                    let value = frame.load_reference(3)?;
                    frame.push_reference(value)?;
                }
                Mnemonic::Istore => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.pop_int()?;
                    frame.store(index, Value::Int(value))?;
                }
                Mnemonic::Lstore => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.pop_long()?;
                    frame.store(index, Value::Long(value))?;
                }
                Mnemonic::Fstore => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.pop_float()?;
                    frame.store(index, Value::Float(value))?;
                }
                Mnemonic::Dstore => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.pop_double()?;
                    frame.store(index, Value::Double(value))?;
                }
                Mnemonic::Astore => {
                    let index = frame.fetch_u1()? as u16;
                    let value = frame.pop_reference()?;
                    frame.store(index, Value::Reference(value))?;
                }
                Mnemonic::Istore0 => {
                    let value = frame.pop_int()?;
                    frame.store(0, Value::Int(value))?;
                }
                Mnemonic::Istore1 => {
                    let value = frame.pop_int()?;
                    frame.store(1, Value::Int(value))?;
                }
                Mnemonic::Istore2 => {
                    let value = frame.pop_int()?;
                    frame.store(2, Value::Int(value))?;
                }
                Mnemonic::Istore3 => {
                    let value = frame.pop_int()?;
                    frame.store(3, Value::Int(value))?;
                }
                Mnemonic::Astore0 => {
                    let value = frame.pop_reference()?;
                    frame.store(0, Value::Reference(value))?;
                }
                Mnemonic::Astore1 => {
                    let value = frame.pop_reference()?;
                    frame.store(1, Value::Reference(value))?;
                }
                Mnemonic::Astore2 => {
                    let value = frame.pop_reference()?;
                    frame.store(2, Value::Reference(value))?;
                }
                Mnemonic::Astore3 => {
                    let value = frame.pop_reference()?;
                    frame.store(3, Value::Reference(value))?;
                }
                Mnemonic::Pop => {
                    frame.pop()?;
                }
                Mnemonic::Dup => {
                    let value = frame.pop()?;
                    frame.push(value)?;
                    frame.push(value)?;
                }
                Mnemonic::Swap => {
                    let top = frame.pop()?;
                    let below = frame.pop()?;
                    frame.push(top)?;
                    frame.push(below)?;
                }
                Mnemonic::Iadd => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a.wrapping_add(b))?;
                }
                Mnemonic::Ladd => {
                    let (a, b) = pop_long_pair(frame)?;
                    frame.push_long(a.wrapping_add(b))?;
                }
                Mnemonic::Fadd => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_float(a + b)?;
                }
                Mnemonic::Dadd => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_double(a + b)?;
                }
                Mnemonic::Isub => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a.wrapping_sub(b))?;
                }
                Mnemonic::Lsub => {
                    let (a, b) = pop_long_pair(frame)?;
                    frame.push_long(a.wrapping_sub(b))?;
                }
                Mnemonic::Fsub => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_float(a - b)?;
                }
                Mnemonic::Dsub => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_double(a - b)?;
                }
                Mnemonic::Imul => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a.wrapping_mul(b))?;
                }
                Mnemonic::Lmul => {
                    let (a, b) = pop_long_pair(frame)?;
                    frame.push_long(a.wrapping_mul(b))?;
                }
                Mnemonic::Fmul => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_float(a * b)?;
                }
                Mnemonic::Dmul => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_double(a * b)?;
                }
                Mnemonic::Idiv => {
                    let (a, b) = pop_int_pair(frame)?;
                    if b == 0 {
                        return Err(division_by_zero(frame));
                    }
                    frame.push_int(a.wrapping_div(b))?;
                }
                Mnemonic::Ldiv => {
                    let (a, b) = pop_long_pair(frame)?;
                    if b == 0 {
                        return Err(division_by_zero(frame));
                    }
                    frame.push_long(a.wrapping_div(b))?;
                }
                Mnemonic::Fdiv => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_float(a / b)?;
                }
                Mnemonic::Ddiv => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_double(a / b)?;
                }
                Mnemonic::Irem => {
                    let (a, b) = pop_int_pair(frame)?;
                    if b == 0 {
                        return Err(division_by_zero(frame));
                    }
                    frame.push_int(a.wrapping_rem(b))?;
                }
                Mnemonic::Lrem => {
                    let (a, b) = pop_long_pair(frame)?;
                    if b == 0 {
                        return Err(division_by_zero(frame));
                    }
                    frame.push_long(a.wrapping_rem(b))?;
                }
                Mnemonic::Frem => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_float(a % b)?;
                }
                Mnemonic::Drem => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_double(a % b)?;
                }
                Mnemonic::Ineg => {
                    let value = frame.pop_int()?;
                    frame.push_int(value.wrapping_neg())?;
                }
                Mnemonic::Lneg => {
                    let value = frame.pop_long()?;
                    frame.push_long(value.wrapping_neg())?;
                }
                Mnemonic::Fneg => {
                    let value = frame.pop_float()?;
                    frame.push_float(-value)?;
                }
                Mnemonic::Dneg => {
                    let value = frame.pop_double()?;
                    frame.push_double(-value)?;
                }
                Mnemonic::Iand => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a & b)?;
                }
                Mnemonic::Ior => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a | b)?;
                }
                Mnemonic::Ixor => {
                    let (a, b) = pop_int_pair(frame)?;
                    frame.push_int(a ^ b)?;
                }
                Mnemonic::Iinc => {
                    let index = frame.fetch_u1()? as u16;
                    let delta = frame.fetch_u1()? as i8;
                    let value = frame.load_int(index)?;
                    frame.store(index, Value::Int(value.wrapping_add(delta as i32)))?;
                }
                Mnemonic::I2l => {
                    let value = frame.pop_int()?;
                    frame.push_long(value as i64)?;
                }
                Mnemonic::I2f => {
                    let value = frame.pop_int()?;
                    frame.push_float(value as f32)?;
                }
                Mnemonic::I2d => {
                    let value = frame.pop_int()?;
                    frame.push_double(value as f64)?;
                }
                Mnemonic::L2i => {
                    let value = frame.pop_long()?;
                    frame.push_int(value as i32)?;
                }
                Mnemonic::L2f => {
                    let value = frame.pop_long()?;
                    frame.push_float(value as f32)?;
                }
                Mnemonic::L2d => {
                    let value = frame.pop_long()?;
                    frame.push_double(value as f64)?;
                }
                Mnemonic::F2i => {
                    // `as` truncates toward zero, maps NaN to 0, and
                    // saturates at the integer bounds.
                    let value = frame.pop_float()?;
                    frame.push_int(value as i32)?;
                }
                Mnemonic::F2l => {
                    let value = frame.pop_float()?;
                    frame.push_long(value as i64)?;
                }
                Mnemonic::F2d => {
                    let value = frame.pop_float()?;
                    frame.push_double(value as f64)?;
                }
                Mnemonic::D2i => {
                    let value = frame.pop_double()?;
                    frame.push_int(value as i32)?;
                }
                Mnemonic::D2l => {
                    let value = frame.pop_double()?;
                    frame.push_long(value as i64)?;
                }
                Mnemonic::D2f => {
                    let value = frame.pop_double()?;
                    frame.push_float(value as f32)?;
                }
                Mnemonic::Lcmp => {
                    let (a, b) = pop_long_pair(frame)?;
                    frame.push_int(if a > b {
                        1
                    } else if a == b {
                        0
                    } else {
                        -1
                    })?;
                }
                Mnemonic::Fcmpl => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_int(compare_floats(a as f64, b as f64, -1))?;
                }
                Mnemonic::Fcmpg => {
                    let (a, b) = pop_float_pair(frame)?;
                    frame.push_int(compare_floats(a as f64, b as f64, 1))?;
                }
                Mnemonic::Dcmpl => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_int(compare_floats(a, b, -1))?;
                }
                Mnemonic::Dcmpg => {
                    let (a, b) = pop_double_pair(frame)?;
                    frame.push_int(compare_floats(a, b, 1))?;
                }
                Mnemonic::Ifeq => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value == 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Ifne => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value != 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Iflt => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value < 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Ifge => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value >= 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Ifgt => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value > 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Ifle => {
                    let offset = frame.fetch_i2()?;
                    let value = frame.pop_int()?;
                    if value <= 0 {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmpeq => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a == b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmpne => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a != b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmplt => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a < b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmpge => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a >= b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmpgt => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a > b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::IfIcmple => {
                    let offset = frame.fetch_i2()?;
                    let (a, b) = pop_int_pair(frame)?;
                    if a <= b {
                        frame.branch(opcode_pc, offset)?;
                    }
                }
                Mnemonic::Goto => {
                    let offset = frame.fetch_i2()?;
                    frame.branch(opcode_pc, offset)?;
                }
                Mnemonic::Ireturn => {
                    let value = frame.pop_int()?;
                    return Ok(Some(Value::Int(value)));
                }
                Mnemonic::Lreturn => {
                    let value = frame.pop_long()?;
                    return Ok(Some(Value::Long(value)));
                }
                Mnemonic::Freturn => {
                    let value = frame.pop_float()?;
                    return Ok(Some(Value::Float(value)));
                }
                Mnemonic::Dreturn => {
                    let value = frame.pop_double()?;
                    return Ok(Some(Value::Double(value)));
                }
                Mnemonic::Areturn => {
                    let value = frame.pop_reference()?;
                    return Ok(Some(Value::Reference(value)));
                }
                Mnemonic::Return => return Ok(None),
                Mnemonic::Getstatic => {
                    // The pushed placeholder is never dereferenced, only
                    // handed back to the print shims as a receiver.
                    frame.fetch_u2()?;
                    frame.push_reference(Reference::StaticField)?;
                }
                Mnemonic::Invokevirtual => self.invoke_virtual(frame)?,
                Mnemonic::Invokespecial => self.invoke_special(frame)?,
                Mnemonic::Invokestatic => self.invoke_static(frame)?,
                Mnemonic::New => self.execute_new(frame)?,
                Mnemonic::Unknown(op) => {
                    return Err(ExecError::new(
                        ExecCause::UnknownOpcode(op),
                        &format!("at {opcode_pc:#06X} in {}", frame.method_name),
                    ));
                }
            }
        }
        // Fell off the end of the code region: treat as a void return, the
        // way a trailing `return` would.
        Ok(None)
    }

    /// `ldc` / `ldc_w`: int, float, and string constants.
    fn load_constant(&mut self, frame: &mut StackFrame, index: u16) -> Result<(), ExecError> {
        let entry = self.constant_at(frame.class_index, index)?;
        match entry {
            ConstantPool::Integer(value) => frame.push_int(value),
            ConstantPool::Float(value) => frame.push_float(value),
            ConstantPool::String(string_info) => {
                let text = {
                    let class = &self.classes[frame.class_index];
                    String::from(class.utf8(string_info.string_index)?)
                };
                let id = self.string_pool.intern(&text)?;
                frame.push_reference(Reference::String(id))
            }
            other => Err(ExecError::new(
                ExecCause::InvalidConstant(index),
                &format!("ldc cannot push a {} constant", other.kind()),
            )),
        }
    }

    /// `ldc2_w`: long and double constants.
    fn load_wide_constant(&mut self, frame: &mut StackFrame, index: u16) -> Result<(), ExecError> {
        match self.constant_at(frame.class_index, index)? {
            ConstantPool::Long(value) => frame.push_long(value),
            ConstantPool::Double(value) => frame.push_double(value),
            other => Err(ExecError::new(
                ExecCause::InvalidConstant(index),
                &format!("ldc2_w cannot push a {} constant", other.kind()),
            )),
        }
    }

    fn invoke_static(&mut self, frame: &mut StackFrame) -> Result<(), ExecError> {
        let index = frame.fetch_u2()?;
        let target = self.resolve_method_ref(frame.class_index, index)?;
        let signature = MethodDescriptor::parse(&target.descriptor)?;
        debug!(
            "invokestatic {}.{}{}",
            target.class_name, target.method_name, target.descriptor
        );

        if target.class_name == self.classes[frame.class_index].name {
            let args = pop_arguments(frame, &signature)?;
            let result =
                self.invoke(frame.class_index, &target.method_name, &target.descriptor, args)?;
            return push_result(frame, &signature, result);
        }
        if let Some(function) =
            self.natives
                .lookup(&target.class_name, &target.method_name, &target.descriptor)
        {
            let args = pop_arguments(frame, &signature)?;
            let result = function(self, None, &args)?;
            return push_result(frame, &signature, result);
        }
        Err(ExecError::new(
            ExecCause::MethodNotFound(format!("{}.{}", target.class_name, target.method_name)),
            &format!("descriptor {}", target.descriptor),
        ))
    }

    fn invoke_virtual(&mut self, frame: &mut StackFrame) -> Result<(), ExecError> {
        let index = frame.fetch_u2()?;
        let target = self.resolve_method_ref(frame.class_index, index)?;
        let signature = MethodDescriptor::parse(&target.descriptor)?;
        debug!(
            "invokevirtual {}.{}{}",
            target.class_name, target.method_name, target.descriptor
        );

        if target.class_name == self.classes[frame.class_index].name {
            let mut args = pop_arguments(frame, &signature)?;
            let receiver = frame.pop_reference()?;
            args.insert(0, Value::Reference(receiver));
            let result =
                self.invoke(frame.class_index, &target.method_name, &target.descriptor, args)?;
            return push_result(frame, &signature, result);
        }
        if let Some(function) =
            self.natives
                .lookup(&target.class_name, &target.method_name, &target.descriptor)
        {
            let args = pop_arguments(frame, &signature)?;
            let receiver = frame.pop_reference()?;
            let result = function(self, Some(receiver), &args)?;
            return push_result(frame, &signature, result);
        }
        Err(ExecError::new(
            ExecCause::MethodNotFound(format!("{}.{}", target.class_name, target.method_name)),
            &format!("descriptor {}", target.descriptor),
        ))
    }

    /// Constructors of the shim classes have no behavior here; the receiver
    /// was already produced by `new`. Arguments and receiver are consumed so
    /// the stack stays balanced, then the call is dropped.
    fn invoke_special(&mut self, frame: &mut StackFrame) -> Result<(), ExecError> {
        let index = frame.fetch_u2()?;
        let target = self.resolve_method_ref(frame.class_index, index)?;
        let signature = MethodDescriptor::parse(&target.descriptor)?;
        debug!(
            "invokespecial {}.{}{} (constructor no-op)",
            target.class_name, target.method_name, target.descriptor
        );
        pop_arguments(frame, &signature)?;
        frame.pop_reference()?;
        Ok(())
    }

    fn execute_new(&mut self, frame: &mut StackFrame) -> Result<(), ExecError> {
        let index = frame.fetch_u2()?;
        let class_name = self.classes[frame.class_index].class_name_at(index)?;
        debug!("new {class_name}");
        let reference = match class_name.as_str() {
            "java/util/Scanner" => Reference::Scanner,
            "java/lang/StringBuilder" => Reference::String(self.string_pool.intern("")?),
            _ => Reference::Null,
        };
        frame.push_reference(reference)
    }

    fn constant_at(&self, class_index: usize, index: u16) -> Result<ConstantPool, ExecError> {
        Ok(self.classes[class_index]
            .get_from_constant_pool(index)?
            .clone())
    }

    fn resolve_method_ref(
        &self,
        class_index: usize,
        index: u16,
    ) -> Result<MethodTarget, ExecError> {
        let class = &self.classes[class_index];
        let ConstantPool::Methodref(method_ref) = class.get_from_constant_pool(index)? else {
            return Err(ExecError::new(
                ExecCause::InvalidConstant(index),
                "expected a Methodref constant",
            ));
        };
        let class_name = class.class_name_at(method_ref.class_index)?;
        let ConstantPool::NameAndType(nat) =
            class.get_from_constant_pool(method_ref.name_and_type_index)?
        else {
            return Err(ExecError::new(
                ExecCause::InvalidConstant(method_ref.name_and_type_index),
                "expected a NameAndType constant",
            ));
        };
        Ok(MethodTarget {
            class_name,
            method_name: String::from(class.utf8(nat.name_index)?),
            descriptor: String::from(class.utf8(nat.descriptor_index)?),
        })
    }

    pub(crate) fn write_out(&mut self, text: &str) {
        // Host stdout failures do not surface to bytecode.
        let _ = self.stdout.write_all(text.as_bytes());
        let _ = self.stdout.flush();
    }
}

impl Default for Vm {
    fn default() -> Self {
        Vm::new()
    }
}

struct MethodTarget {
    class_name: String,
    method_name: String,
    descriptor: String,
}

fn division_by_zero(frame: &StackFrame) -> ExecError {
    ExecError::new(
        ExecCause::DivisionByZero,
        &format!("in {}", frame.method_name),
    )
}

/// +1 / 0 / -1 with the given result for an unordered (NaN) comparison.
fn compare_floats(a: f64, b: f64, unordered: i32) -> i32 {
    if a > b {
        1
    } else if a == b {
        0
    } else if a < b {
        -1
    } else {
        unordered
    }
}

/// Pop both operands of a binary int op; the top of stack is the right-hand
/// operand.
fn pop_int_pair(frame: &mut StackFrame) -> Result<(i32, i32), ExecError> {
    let b = frame.pop_int()?;
    let a = frame.pop_int()?;
    Ok((a, b))
}

fn pop_long_pair(frame: &mut StackFrame) -> Result<(i64, i64), ExecError> {
    let b = frame.pop_long()?;
    let a = frame.pop_long()?;
    Ok((a, b))
}

fn pop_float_pair(frame: &mut StackFrame) -> Result<(f32, f32), ExecError> {
    let b = frame.pop_float()?;
    let a = frame.pop_float()?;
    Ok((a, b))
}

fn pop_double_pair(frame: &mut StackFrame) -> Result<(f64, f64), ExecError> {
    let b = frame.pop_double()?;
    let a = frame.pop_double()?;
    Ok((a, b))
}

/// Pop call arguments in reverse declared order and hand them back in
/// declared order, checking each slot kind against the descriptor.
fn pop_arguments(
    frame: &mut StackFrame,
    signature: &MethodDescriptor,
) -> Result<Vec<Value>, ExecError> {
    let mut args = Vec::with_capacity(signature.params.len());
    for param in signature.params.iter().rev() {
        let value = frame.pop()?;
        if !param_matches(param, &value) {
            return Err(ExecError::new(
                ExecCause::TypeMismatch(param_kind(param)),
                &format!("argument was {}", value.kind()),
            ));
        }
        args.push(value);
    }
    args.reverse();
    Ok(args)
}

fn param_matches(param: &FieldDescriptor, value: &Value) -> bool {
    match param {
        FieldDescriptor::Byte
        | FieldDescriptor::Char
        | FieldDescriptor::Short
        | FieldDescriptor::Boolean
        | FieldDescriptor::Int => matches!(value, Value::Int(_)),
        FieldDescriptor::Long => matches!(value, Value::Long(_)),
        FieldDescriptor::Float => matches!(value, Value::Float(_)),
        FieldDescriptor::Double => matches!(value, Value::Double(_)),
        FieldDescriptor::Object(_) | FieldDescriptor::Array(_) => {
            matches!(value, Value::Reference(_))
        }
    }
}

fn param_kind(param: &FieldDescriptor) -> &'static str {
    match param {
        FieldDescriptor::Byte
        | FieldDescriptor::Char
        | FieldDescriptor::Short
        | FieldDescriptor::Boolean
        | FieldDescriptor::Int => "int",
        FieldDescriptor::Long => "long",
        FieldDescriptor::Float => "float",
        FieldDescriptor::Double => "double",
        FieldDescriptor::Object(_) | FieldDescriptor::Array(_) => "reference",
    }
}

/// Push a callee result if the descriptor promises one.
fn push_result(
    frame: &mut StackFrame,
    signature: &MethodDescriptor,
    result: Option<Value>,
) -> Result<(), ExecError> {
    match (&signature.ret, result) {
        (ReturnDescriptor::Void, _) => Ok(()),
        (ReturnDescriptor::Field(_), Some(value)) => frame.push(value),
        (ReturnDescriptor::Field(_), None) => Err(ExecError::new(
            ExecCause::TypeMismatch("return value"),
            "callee returned void for a value-returning descriptor",
        )),
    }
}

/// Seed a fresh frame's locals: parameters occupy the lowest indices, wide
/// values taking two slots each.
fn place_arguments(frame: &mut StackFrame, args: Vec<Value>) -> Result<(), ExecError> {
    let mut slot: u16 = 0;
    for value in args {
        let wide = value.is_wide();
        frame.store(slot, value)?;
        slot += if wide { 2 } else { 1 };
    }
    Ok(())
}
