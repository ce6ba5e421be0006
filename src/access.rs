//! Access flag sets for classes and methods.
//!
//! The same bit means different things depending on where it sits (`0x0020`
//! is `ACC_SUPER` on a class but `ACC_SYNCHRONIZED` on a method), so each
//! location gets its own type. Unknown bits are retained so a decode/encode
//! round trip never loses information.

use bitflags::bitflags;

bitflags! {
    /// Class-level access flags (`ClassFile.access_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassAccess: u16 {
        const PUBLIC = 0x0001;
        const FINAL = 0x0010;
        const SUPER = 0x0020;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const MODULE = 0x8000;
    }
}

bitflags! {
    /// Flags of an `InnerClasses` entry (`inner_class_access_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct InnerClassAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const INTERFACE = 0x0200;
        const ABSTRACT = 0x0400;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
    }
}

bitflags! {
    /// Method access flags (`method_info.access_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccess: u16 {
        const PUBLIC = 0x0001;
        const PRIVATE = 0x0002;
        const PROTECTED = 0x0004;
        const STATIC = 0x0008;
        const FINAL = 0x0010;
        const SYNCHRONIZED = 0x0020;
        const BRIDGE = 0x0040;
        const VARARGS = 0x0080;
        const NATIVE = 0x0100;
        const ABSTRACT = 0x0400;
        const STRICT = 0x0800;
        const SYNTHETIC = 0x1000;
    }
}

impl ClassAccess {
    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }
}

impl InnerClassAccess {
    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }
}

impl MethodAccess {
    pub fn is_final(self) -> bool {
        self.contains(Self::FINAL)
    }

    pub fn is_public(self) -> bool {
        self.contains(Self::PUBLIC)
    }
}

/// Renders flags as the lowercase Java modifier keywords, e.g. `public final`.
pub fn method_modifiers(flags: MethodAccess) -> Vec<&'static str> {
    flags
        .iter_names()
        .map(|(name, _)| keyword(name))
        .collect()
}

/// Same as [`method_modifiers`] for class flags.
pub fn class_modifiers(flags: ClassAccess) -> Vec<&'static str> {
    flags
        .iter_names()
        .map(|(name, _)| keyword(name))
        .collect()
}

fn keyword(flag_name: &str) -> &'static str {
    match flag_name {
        "PUBLIC" => "public",
        "PRIVATE" => "private",
        "PROTECTED" => "protected",
        "STATIC" => "static",
        "FINAL" => "final",
        "SUPER" => "super",
        "SYNCHRONIZED" => "synchronized",
        "BRIDGE" => "bridge",
        "VARARGS" => "varargs",
        "NATIVE" => "native",
        "INTERFACE" => "interface",
        "ABSTRACT" => "abstract",
        "STRICT" => "strict",
        "SYNTHETIC" => "synthetic",
        "ANNOTATION" => "annotation",
        "ENUM" => "enum",
        "MODULE" => "module",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_bits_are_retained() {
        let flags = ClassAccess::from_bits_retain(0x0031 | 0x0100);
        assert!(flags.is_final());
        assert!(flags.is_public());
        assert_eq!(flags.bits(), 0x0131);
    }

    #[test]
    fn method_modifiers_follow_declaration_order() {
        let flags = MethodAccess::PUBLIC | MethodAccess::FINAL | MethodAccess::SYNCHRONIZED;
        assert_eq!(method_modifiers(flags), vec!["public", "final", "synchronized"]);
    }
}
