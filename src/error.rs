use thiserror::Error;

/// Failure to decode or re-encode a class file.
///
/// Both directions are recoverable: the tree walker falls back to copying the
/// original bytes when it sees one of these.
#[derive(Debug, Error)]
pub enum ClassFormatError {
    #[error("unexpected end of class file at offset {offset} (needed {needed} more bytes)")]
    Truncated { offset: usize, needed: usize },

    #[error("bad magic number 0x{0:08X}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {index} is out of range or unusable")]
    InvalidConstantIndex { index: u16 },

    #[error("constant pool index {index} is not a {expected} entry")]
    UnexpectedConstant { index: u16, expected: &'static str },

    #[error("constant pool index {index} is not valid modified UTF-8")]
    InvalidUtf8 { index: u16 },

    #[error("{0} trailing bytes after class file body")]
    TrailingBytes(usize),

    #[error("malformed InnerClasses attribute: {0}")]
    MalformedInnerClasses(String),

    #[error("too many {what} to encode ({count})")]
    TooMany { what: &'static str, count: usize },
}

pub type Result<T> = std::result::Result<T, ClassFormatError>;
