#![allow(clippy::enum_variant_names)]

pub mod class_format_check {
    use std::error::Error;
    use std::fmt::Display;

    #[derive(Debug)]
    pub enum FormatCause {
        IncorrectMagic(u32),
        ExtraBytes,
        InvalidIndex(u16),
        InvalidDescriptor(String),
        MissingCode,
    }

    impl Display for FormatCause {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                FormatCause::IncorrectMagic(m) => write!(f, "IncorrectMagic: {:#010X}", m),
                FormatCause::ExtraBytes => write!(f, "ExtraBytes"),
                FormatCause::InvalidIndex(index) => write!(f, "InvalidIndex: {index}"),
                FormatCause::InvalidDescriptor(desc) => write!(f, "InvalidDescriptor: {desc}"),
                FormatCause::MissingCode => write!(f, "MissingCode"),
            }
        }
    }

    #[derive(Debug)]
    pub struct FormatError {
        cause: FormatCause,
        msg: String,
    }

    impl FormatError {
        pub fn new(cause: FormatCause, msg: &str) -> FormatError {
            FormatError {
                cause,
                msg: msg.into(),
            }
        }

        pub fn cause(&self) -> &FormatCause {
            &self.cause
        }
    }

    impl Error for FormatError {}

    impl Display for FormatError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Format Error: {}, {}", self.cause, self.msg)
        }
    }
}

pub mod class_loading {
    use std::error::Error;
    use std::fmt::Display;

    #[derive(Debug)]
    pub enum LoadingCause {
        UnexpectedEof(u64),
        InvalidConstantTag(u8),
        InvalidAttributeNameIndex(u16),
        AttributeOverrun(u32),
    }

    impl Display for LoadingCause {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                LoadingCause::UnexpectedEof(pos) => write!(f, "UnexpectedEof: {pos:#06X}"),
                LoadingCause::InvalidConstantTag(t) => write!(f, "InvalidConstantTag: {t}"),
                LoadingCause::InvalidAttributeNameIndex(i) => {
                    write!(f, "InvalidAttributeNameIndex: {i}")
                }
                LoadingCause::AttributeOverrun(len) => write!(f, "AttributeOverrun: {len}"),
            }
        }
    }

    #[derive(Debug)]
    pub struct LoadingError {
        cause: LoadingCause,
        msg: String,
    }

    impl LoadingError {
        pub fn new(cause: LoadingCause, msg: &str) -> LoadingError {
            LoadingError {
                cause,
                msg: msg.into(),
            }
        }

        pub fn cause(&self) -> &LoadingCause {
            &self.cause
        }
    }

    impl Error for LoadingError {}

    impl Display for LoadingError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "Loading Error: {}, {}", self.cause, self.msg)
        }
    }
}
