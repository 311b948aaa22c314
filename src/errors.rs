pub mod execution {
    use std::error::Error;
    use std::fmt::Display;

    use cloader::errors::class_format_check::FormatError;

    #[derive(Debug)]
    pub enum ExecCause {
        UnknownOpcode(u8),
        DivisionByZero,
        BranchOutOfRange(i64),
        EndOfCode,
        InvalidConstant(u16),
        BadConstant(String),
        TypeMismatch(&'static str),
        StackOverflow,
        StackUnderflow,
        LocalOutOfRange(u16),
        ClassNotFound(String),
        ClassLimitReached,
        MethodNotFound(String),
        MissingCode(String),
        SlotBudgetExceeded,
        CallDepthExceeded,
        StringPoolExhausted,
        StringTooLong,
        InvalidStringRef(usize),
    }

    impl Display for ExecCause {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ExecCause::UnknownOpcode(op) => write!(f, "UnknownOpcode: {op:#04X}"),
                ExecCause::DivisionByZero => write!(f, "DivisionByZero"),
                ExecCause::BranchOutOfRange(target) => write!(f, "BranchOutOfRange: {target}"),
                ExecCause::EndOfCode => write!(f, "EndOfCode"),
                ExecCause::InvalidConstant(index) => write!(f, "InvalidConstant: {index}"),
                ExecCause::BadConstant(msg) => write!(f, "BadConstant: {msg}"),
                ExecCause::TypeMismatch(expected) => write!(f, "TypeMismatch: wanted {expected}"),
                ExecCause::StackOverflow => write!(f, "StackOverflow"),
                ExecCause::StackUnderflow => write!(f, "StackUnderflow"),
                ExecCause::LocalOutOfRange(index) => write!(f, "LocalOutOfRange: {index}"),
                ExecCause::ClassNotFound(name) => write!(f, "ClassNotFound: {name}"),
                ExecCause::ClassLimitReached => write!(f, "ClassLimitReached"),
                ExecCause::MethodNotFound(name) => write!(f, "MethodNotFound: {name}"),
                ExecCause::MissingCode(name) => write!(f, "MissingCode: {name}"),
                ExecCause::SlotBudgetExceeded => write!(f, "SlotBudgetExceeded"),
                ExecCause::CallDepthExceeded => write!(f, "CallDepthExceeded"),
                ExecCause::StringPoolExhausted => write!(f, "StringPoolExhausted"),
                ExecCause::StringTooLong => write!(f, "StringTooLong"),
                ExecCause::InvalidStringRef(id) => write!(f, "InvalidStringRef: {id}"),
            }
        }
    }

    #[derive(Debug)]
    pub struct ExecError {
        cause: ExecCause,
        msg: String,
    }

    impl ExecError {
        pub fn new(cause: ExecCause, msg: &str) -> ExecError {
            ExecError {
                cause,
                msg: msg.into(),
            }
        }

        pub fn cause(&self) -> &ExecCause {
            &self.cause
        }
    }

    impl Error for ExecError {}

    impl Display for ExecError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Execution Error: {}, {}", self.cause, self.msg)
        }
    }

    impl From<FormatError> for ExecError {
        fn from(err: FormatError) -> ExecError {
            ExecError::new(ExecCause::BadConstant(err.to_string()), "resolution failed")
        }
    }
}
