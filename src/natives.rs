use std::io::BufRead;

use log::warn;

use crate::errors::execution::{ExecCause, ExecError};
use crate::value::{Reference, Value};
use crate::vm::Vm;

/// A host function bound to a method reference. Receives the popped receiver
/// (for virtual calls) and the popped arguments in declared order; a `Some`
/// result is pushed onto the caller's operand stack.
pub type NativeFn =
    fn(&mut Vm, Option<Reference>, &[Value]) -> Result<Option<Value>, ExecError>;

pub struct NativeEntry {
    pub class_name: &'static str,
    pub method_name: &'static str,
    pub descriptor: &'static str,
    pub function: NativeFn,
}

/// Host-shim table keyed on the exact `(class, name, descriptor)` triple,
/// with class names in internal form.
pub struct NativeRegistry {
    entries: Vec<NativeEntry>,
}

impl NativeRegistry {
    pub fn new() -> NativeRegistry {
        NativeRegistry { entries: vec![] }
    }

    /// The fixed table of console and string shims.
    pub fn standard() -> NativeRegistry {
        let mut registry = NativeRegistry::new();
        // Print shims answer both the static `System` idiom and the
        // `getstatic System.out` + `invokevirtual PrintStream` idiom.
        for class_name in ["java/lang/System", "java/io/PrintStream"] {
            registry.register(class_name, "print", "(I)V", print_int);
            registry.register(class_name, "println", "(I)V", println_int);
            registry.register(class_name, "print", "(Ljava/lang/String;)V", print_string);
            registry.register(class_name, "println", "(Ljava/lang/String;)V", println_string);
            registry.register(class_name, "println", "()V", println_void);
        }
        registry.register("java/util/Scanner", "nextInt", "()I", scanner_next_int);
        registry.register(
            "java/util/Scanner",
            "nextLine",
            "()Ljava/lang/String;",
            scanner_next_line,
        );
        registry.register(
            "java/lang/StringBuilder",
            "append",
            "(I)Ljava/lang/StringBuilder;",
            builder_append_int,
        );
        registry.register(
            "java/lang/StringBuilder",
            "append",
            "(Ljava/lang/String;)Ljava/lang/StringBuilder;",
            builder_append_string,
        );
        registry.register(
            "java/lang/StringBuilder",
            "toString",
            "()Ljava/lang/String;",
            builder_to_string,
        );
        registry
    }

    pub fn register(
        &mut self,
        class_name: &'static str,
        method_name: &'static str,
        descriptor: &'static str,
        function: NativeFn,
    ) {
        self.entries.push(NativeEntry {
            class_name,
            method_name,
            descriptor,
            function,
        });
    }

    pub fn lookup(&self, class_name: &str, method_name: &str, descriptor: &str) -> Option<NativeFn> {
        self.entries
            .iter()
            .find(|entry| {
                entry.class_name == class_name
                    && entry.method_name == method_name
                    && entry.descriptor == descriptor
            })
            .map(|entry| entry.function)
    }
}

impl Default for NativeRegistry {
    fn default() -> Self {
        NativeRegistry::standard()
    }
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, ExecError> {
    match args.get(index) {
        Some(Value::Int(value)) => Ok(*value),
        other => Err(ExecError::new(
            ExecCause::TypeMismatch("int"),
            &format!("shim argument {index} was {other:?}"),
        )),
    }
}

fn reference_arg(args: &[Value], index: usize) -> Result<Reference, ExecError> {
    match args.get(index) {
        Some(Value::Reference(value)) => Ok(*value),
        other => Err(ExecError::new(
            ExecCause::TypeMismatch("reference"),
            &format!("shim argument {index} was {other:?}"),
        )),
    }
}

fn print_int(vm: &mut Vm, _receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    let value = int_arg(args, 0)?;
    vm.write_out(&value.to_string());
    Ok(None)
}

fn println_int(vm: &mut Vm, _receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    let value = int_arg(args, 0)?;
    vm.write_out(&format!("{value}\n"));
    Ok(None)
}

fn print_string(vm: &mut Vm, _receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    if let Reference::String(id) = reference_arg(args, 0)? {
        let text = vm.string_pool.get(id)?.to_string();
        vm.write_out(&text);
    }
    Ok(None)
}

fn println_string(vm: &mut Vm, _receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    if let Reference::String(id) = reference_arg(args, 0)? {
        let text = vm.string_pool.get(id)?.to_string();
        vm.write_out(&text);
    }
    vm.write_out("\n");
    Ok(None)
}

fn println_void(vm: &mut Vm, _receiver: Option<Reference>, _args: &[Value]) -> Result<Option<Value>, ExecError> {
    vm.write_out("\n");
    Ok(None)
}

fn scanner_next_int(vm: &mut Vm, _receiver: Option<Reference>, _args: &[Value]) -> Result<Option<Value>, ExecError> {
    let value = match read_token(&mut *vm.stdin) {
        Some(token) => token.parse().unwrap_or(0),
        None => {
            warn!("stdin exhausted during nextInt, reading as 0");
            0
        }
    };
    Ok(Some(Value::Int(value)))
}

fn scanner_next_line(vm: &mut Vm, _receiver: Option<Reference>, _args: &[Value]) -> Result<Option<Value>, ExecError> {
    match read_line(&mut *vm.stdin) {
        Some(line) => {
            let id = vm.string_pool.intern(&line)?;
            Ok(Some(Value::Reference(Reference::String(id))))
        }
        None => Ok(Some(Value::Reference(Reference::Null))),
    }
}

fn builder_append_int(vm: &mut Vm, receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    let text = int_arg(args, 0)?.to_string();
    builder_append(vm, receiver, &text)
}

fn builder_append_string(vm: &mut Vm, receiver: Option<Reference>, args: &[Value]) -> Result<Option<Value>, ExecError> {
    let text = match reference_arg(args, 0)? {
        Reference::String(id) => vm.string_pool.get(id)?.to_string(),
        _ => String::new(),
    };
    builder_append(vm, receiver, &text)
}

fn builder_append(vm: &mut Vm, receiver: Option<Reference>, text: &str) -> Result<Option<Value>, ExecError> {
    let reference = match receiver {
        Some(Reference::String(id)) => {
            vm.string_pool.append(id, text)?;
            Reference::String(id)
        }
        // A null receiver still yields a usable builder.
        Some(Reference::Null) => Reference::String(vm.string_pool.intern(text)?),
        other => {
            return Err(ExecError::new(
                ExecCause::TypeMismatch("StringBuilder receiver"),
                &format!("found {other:?}"),
            ))
        }
    };
    Ok(Some(Value::Reference(reference)))
}

fn builder_to_string(vm: &mut Vm, receiver: Option<Reference>, _args: &[Value]) -> Result<Option<Value>, ExecError> {
    let reference = match receiver {
        Some(Reference::String(id)) => Reference::String(id),
        Some(Reference::Null) => Reference::String(vm.string_pool.intern("")?),
        other => {
            return Err(ExecError::new(
                ExecCause::TypeMismatch("StringBuilder receiver"),
                &format!("found {other:?}"),
            ))
        }
    };
    Ok(Some(Value::Reference(reference)))
}

/// Next whitespace-delimited token from stdin, `None` at end of input.
fn read_token(stdin: &mut dyn BufRead) -> Option<String> {
    let mut token = String::new();
    loop {
        let byte = match stdin.fill_buf() {
            Ok(buf) if buf.is_empty() => break,
            Ok(buf) => buf[0],
            Err(_) => break,
        };
        if byte.is_ascii_whitespace() {
            stdin.consume(1);
            if token.is_empty() {
                continue;
            }
            break;
        }
        token.push(byte as char);
        stdin.consume(1);
    }
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// One line from stdin with the trailing newline stripped, `None` at end of
/// input.
fn read_line(stdin: &mut dyn BufRead) -> Option<String> {
    let mut line = String::new();
    match stdin.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Some(line)
        }
    }
}
