/// [Class Access Flags](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.1-200-E.1)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassAccessFlags {
    /// Declared public; may be accessed from outside its package.
    AccPublic = 0x0001,
    /// Declared final; no subclasses allowed.
    AccFinal = 0x0010,
    /// Treat superclass methods specially when invoked by invokespecial.
    AccSuper = 0x0020,
    /// Is an interface, not a class.
    AccInterface = 0x0200,
    /// Declared abstract; must not be instantiated.
    AccAbstract = 0x0400,
    /// Declared synthetic; not present in the source code.
    AccSynthetic = 0x1000,
    /// Declared as an annotation interface.
    AccAnnotation = 0x2000,
    /// Declared as an enum class.
    AccEnum = 0x4000,
    /// Is a module, not a class or interface.
    AccModule = 0x8000,
}

impl ClassAccessFlags {
    const ALL: [ClassAccessFlags; 9] = [
        ClassAccessFlags::AccPublic,
        ClassAccessFlags::AccFinal,
        ClassAccessFlags::AccSuper,
        ClassAccessFlags::AccInterface,
        ClassAccessFlags::AccAbstract,
        ClassAccessFlags::AccSynthetic,
        ClassAccessFlags::AccAnnotation,
        ClassAccessFlags::AccEnum,
        ClassAccessFlags::AccModule,
    ];

    pub fn from_u16(value: u16) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|flag| value & *flag as u16 == *flag as u16)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassAccessFlags::AccPublic => "public",
            ClassAccessFlags::AccFinal => "final",
            ClassAccessFlags::AccSuper => "super",
            ClassAccessFlags::AccInterface => "interface",
            ClassAccessFlags::AccAbstract => "abstract",
            ClassAccessFlags::AccSynthetic => "synthetic",
            ClassAccessFlags::AccAnnotation => "annotation",
            ClassAccessFlags::AccEnum => "enum",
            ClassAccessFlags::AccModule => "module",
        }
    }
}

/// [Field Access Flags](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.5-200-A.1)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldAccessFlags {
    AccPublic = 0x0001,
    AccPrivate = 0x0002,
    AccProtected = 0x0004,
    AccStatic = 0x0008,
    AccFinal = 0x0010,
    AccVolatile = 0x0040,
    AccTransient = 0x0080,
    AccSynthetic = 0x1000,
    AccEnum = 0x4000,
}

impl FieldAccessFlags {
    const ALL: [FieldAccessFlags; 9] = [
        FieldAccessFlags::AccPublic,
        FieldAccessFlags::AccPrivate,
        FieldAccessFlags::AccProtected,
        FieldAccessFlags::AccStatic,
        FieldAccessFlags::AccFinal,
        FieldAccessFlags::AccVolatile,
        FieldAccessFlags::AccTransient,
        FieldAccessFlags::AccSynthetic,
        FieldAccessFlags::AccEnum,
    ];

    pub fn from_u16(value: u16) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|flag| value & *flag as u16 == *flag as u16)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldAccessFlags::AccPublic => "public",
            FieldAccessFlags::AccPrivate => "private",
            FieldAccessFlags::AccProtected => "protected",
            FieldAccessFlags::AccStatic => "static",
            FieldAccessFlags::AccFinal => "final",
            FieldAccessFlags::AccVolatile => "volatile",
            FieldAccessFlags::AccTransient => "transient",
            FieldAccessFlags::AccSynthetic => "synthetic",
            FieldAccessFlags::AccEnum => "enum",
        }
    }
}

/// [Method Access Flags](https://docs.oracle.com/javase/specs/jvms/se17/html/jvms-4.html#jvms-4.6-200-A.1)
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MethodAccessFlags {
    AccPublic = 0x0001,
    AccPrivate = 0x0002,
    AccProtected = 0x0004,
    AccStatic = 0x0008,
    AccFinal = 0x0010,
    AccSynchronized = 0x0020,
    AccBridge = 0x0040,
    AccVarArgs = 0x0080,
    AccNative = 0x0100,
    AccAbstract = 0x0400,
    AccStrict = 0x0800,
    AccSynthetic = 0x1000,
}

impl MethodAccessFlags {
    const ALL: [MethodAccessFlags; 12] = [
        MethodAccessFlags::AccPublic,
        MethodAccessFlags::AccPrivate,
        MethodAccessFlags::AccProtected,
        MethodAccessFlags::AccStatic,
        MethodAccessFlags::AccFinal,
        MethodAccessFlags::AccSynchronized,
        MethodAccessFlags::AccBridge,
        MethodAccessFlags::AccVarArgs,
        MethodAccessFlags::AccNative,
        MethodAccessFlags::AccAbstract,
        MethodAccessFlags::AccStrict,
        MethodAccessFlags::AccSynthetic,
    ];

    pub fn from_u16(value: u16) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|flag| value & *flag as u16 == *flag as u16)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MethodAccessFlags::AccPublic => "public",
            MethodAccessFlags::AccPrivate => "private",
            MethodAccessFlags::AccProtected => "protected",
            MethodAccessFlags::AccStatic => "static",
            MethodAccessFlags::AccFinal => "final",
            MethodAccessFlags::AccSynchronized => "synchronized",
            MethodAccessFlags::AccBridge => "bridge",
            MethodAccessFlags::AccVarArgs => "varargs",
            MethodAccessFlags::AccNative => "native",
            MethodAccessFlags::AccAbstract => "abstract",
            MethodAccessFlags::AccStrict => "strictfp",
            MethodAccessFlags::AccSynthetic => "synthetic",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_combined_flags() {
        let flags = MethodAccessFlags::from_u16(0x0009);
        assert_eq!(
            flags,
            vec![MethodAccessFlags::AccPublic, MethodAccessFlags::AccStatic]
        );
    }

    #[test]
    fn unknown_bits_are_ignored() {
        let flags = ClassAccessFlags::from_u16(0x0021 | 0x0002);
        assert_eq!(
            flags,
            vec![ClassAccessFlags::AccPublic, ClassAccessFlags::AccSuper]
        );
    }
}
