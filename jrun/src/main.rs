use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;

use cloader::class_file::ClassFile;
use microjvm::value::Value;
use microjvm::vm::Vm;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a method from a Java class file", long_about = None)]
struct Args {
    /// Path to the .class file to load
    #[arg(value_name = "CLASS_FILE")]
    class_file: PathBuf,

    /// Method to execute
    #[arg(value_name = "METHOD", default_value = "main")]
    method: String,

    /// Print the loaded class instead of executing it
    #[arg(short, long)]
    describe: bool,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let args = Args::parse();

    let mut contents = vec![];
    let mut class_file = match File::open(&args.class_file) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("Error: failed to open '{}': {err}", args.class_file.display());
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = class_file.read_to_end(&mut contents) {
        eprintln!("Error: failed to read '{}': {err}", args.class_file.display());
        return ExitCode::FAILURE;
    }

    let class = match ClassFile::from_bytes(&contents) {
        Ok(class) => class,
        Err(err) => {
            eprintln!("Error: failed to load class file: {err}");
            return ExitCode::FAILURE;
        }
    };
    // The runtime representation owns deep copies of everything it keeps.
    drop(contents);

    if args.describe {
        print!("{}", class.to_pretty_fmt());
        return ExitCode::SUCCESS;
    }

    if class.find_method(&args.method).is_none() {
        eprintln!("Error: method '{}' not found in class {}", args.method, class.name);
        eprintln!("Available methods:");
        for method in &class.methods {
            if let Ok(name) = class.method_name(method) {
                eprintln!("  {name}");
            }
        }
        return ExitCode::FAILURE;
    }

    let class_name = class.name.clone();
    let mut vm = Vm::new();
    if let Err(err) = vm.load_class(class) {
        eprintln!("Error: {err}");
        return ExitCode::FAILURE;
    }

    match vm.execute(&class_name, &args.method) {
        // A numeric result becomes the process exit code; wider values are
        // narrowed only here, at the driver boundary.
        Ok(Some(Value::Int(value))) => exit_code(value),
        Ok(Some(Value::Long(value))) => exit_code(value as i32),
        Ok(result) => {
            debug!("{}.{} returned {result:?}", class_name, args.method);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(value: i32) -> ExitCode {
    ExitCode::from((value & 0xFF) as u8)
}
