//! The class-file constant pool.
//!
//! Entries are kept in their encoded shape so that writing the pool back
//! reproduces the input exactly. `Utf8` payloads stay as raw modified-UTF-8
//! bytes; only lookups that need text decode them.

use crate::error::{ClassFormatError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Utf8(Vec<u8>),
    Integer(u32),
    Float(u32),
    Long(u64),
    Double(u64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { reference_kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot of a `Long` or `Double`; never written.
    Unusable,
}

impl Constant {
    pub const TAG_UTF8: u8 = 1;
    pub const TAG_INTEGER: u8 = 3;
    pub const TAG_FLOAT: u8 = 4;
    pub const TAG_LONG: u8 = 5;
    pub const TAG_DOUBLE: u8 = 6;
    pub const TAG_CLASS: u8 = 7;
    pub const TAG_STRING: u8 = 8;
    pub const TAG_FIELD_REF: u8 = 9;
    pub const TAG_METHOD_REF: u8 = 10;
    pub const TAG_INTERFACE_METHOD_REF: u8 = 11;
    pub const TAG_NAME_AND_TYPE: u8 = 12;
    pub const TAG_METHOD_HANDLE: u8 = 15;
    pub const TAG_METHOD_TYPE: u8 = 16;
    pub const TAG_DYNAMIC: u8 = 17;
    pub const TAG_INVOKE_DYNAMIC: u8 = 18;
    pub const TAG_MODULE: u8 = 19;
    pub const TAG_PACKAGE: u8 = 20;

    /// Long and double constants occupy two pool slots.
    pub fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }
}

/// One-based constant pool. Slot 0 is reserved and never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `constant_pool_count` value as written in the file (slots + 1).
    pub fn count(&self) -> usize {
        self.entries.len() + 1
    }

    pub fn get(&self, index: u16) -> Result<&Constant> {
        let slot = usize::from(index)
            .checked_sub(1)
            .ok_or(ClassFormatError::InvalidConstantIndex { index })?;
        match self.entries.get(slot) {
            Some(Constant::Unusable) | None => {
                Err(ClassFormatError::InvalidConstantIndex { index })
            }
            Some(constant) => Ok(constant),
        }
    }

    pub fn utf8_bytes(&self, index: u16) -> Result<&[u8]> {
        match self.get(index)? {
            Constant::Utf8(bytes) => Ok(bytes),
            _ => Err(ClassFormatError::UnexpectedConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    /// Decodes a `Utf8` entry from modified UTF-8.
    pub fn utf8(&self, index: u16) -> Result<String> {
        decode_modified_utf8(self.utf8_bytes(index)?)
            .ok_or(ClassFormatError::InvalidUtf8 { index })
    }

    /// Internal (slash-separated) name of a `Class` entry.
    pub fn class_name(&self, index: u16) -> Result<String> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(ClassFormatError::UnexpectedConstant {
                index,
                expected: "Class",
            }),
        }
    }

    pub(crate) fn raw_entries(&self) -> &[Constant] {
        &self.entries
    }

    pub(crate) fn push_raw(&mut self, constant: Constant) {
        self.entries.push(constant);
    }
}

/// Modified UTF-8 as used by class files: NUL is `C0 80`, characters outside
/// the BMP are surrogate pairs with each half in its own 3-byte sequence, and
/// 4-byte forms never appear.
fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while let Some((&b0, tail)) = rest.split_first() {
        let (unit, used) = match b0 {
            0x01..=0x7F => (u16::from(b0), 0),
            0xC0..=0xDF => {
                let b1 = continuation(tail, 0)?;
                ((u16::from(b0 & 0x1F) << 6) | b1, 1)
            }
            0xE0..=0xEF => {
                let b1 = continuation(tail, 0)?;
                let b2 = continuation(tail, 1)?;
                ((u16::from(b0 & 0x0F) << 12) | (b1 << 6) | b2, 2)
            }
            _ => return None,
        };
        units.push(unit);
        rest = &tail[used..];
    }
    String::from_utf16(&units).ok()
}

fn continuation(bytes: &[u8], at: usize) -> Option<u16> {
    match bytes.get(at) {
        Some(&b) if b & 0xC0 == 0x80 => Some(u16::from(b & 0x3F)),
        _ => None,
    }
}
