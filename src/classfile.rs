//! Stateless class-file codec.
//!
//! [`parse`] decodes the structural parts of a class file (constant pool,
//! access flags, fields, methods, attributes) into a [`ClassDescriptor`];
//! [`to_bytes`] writes it back. Everything the model does not interpret is
//! kept as opaque bytes, so an unmodified descriptor re-encodes to the exact
//! input.

use crate::access::{ClassAccess, MethodAccess};
use crate::constant_pool::{Constant, ConstantPool};
use crate::descriptor::{Attribute, ClassDescriptor, FieldInfo, InnerEntryRef, MethodDescriptor};
use crate::error::{ClassFormatError, Result};

pub const MAGIC: u32 = 0xCAFE_BABE;

const INNER_CLASSES: &[u8] = b"InnerClasses";
const INNER_CLASS_ENTRY_LEN: usize = 8;

pub fn parse(bytes: &[u8]) -> Result<ClassDescriptor> {
    let mut r = Reader::new(bytes);

    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::BadMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    let constant_pool = read_constant_pool(&mut r)?;

    let access = ClassAccess::from_bits_retain(r.u16()?);
    let this_class = r.u16()?;
    let super_class = r.u16()?;

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(usize::from(interface_count));
    for _ in 0..interface_count {
        interfaces.push(r.u16()?);
    }

    let field_count = r.u16()?;
    let mut fields = Vec::with_capacity(usize::from(field_count));
    for _ in 0..field_count {
        fields.push(FieldInfo {
            access_flags: r.u16()?,
            name_index: r.u16()?,
            descriptor_index: r.u16()?,
            attributes: read_attributes(&mut r)?,
        });
    }

    let method_count = r.u16()?;
    let mut methods = Vec::with_capacity(usize::from(method_count));
    for _ in 0..method_count {
        let access = MethodAccess::from_bits_retain(r.u16()?);
        let name_index = r.u16()?;
        let descriptor_index = r.u16()?;
        let attributes = read_attributes(&mut r)?;
        methods.push(MethodDescriptor {
            access,
            name: constant_pool.utf8(name_index)?,
            descriptor: constant_pool.utf8(descriptor_index)?,
            name_index,
            descriptor_index,
            attributes,
        });
    }

    let attributes = read_attributes(&mut r)?;

    if r.remaining() > 0 {
        return Err(ClassFormatError::TrailingBytes(r.remaining()));
    }

    let internal_name = constant_pool.class_name(this_class)?;
    let own_inner_entry = find_own_inner_entry(&constant_pool, &attributes, &internal_name)?;

    Ok(ClassDescriptor {
        minor_version,
        major_version,
        constant_pool,
        access,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
        attributes,
        name: internal_name.replace('/', "."),
        own_inner_entry,
    })
}

pub fn to_bytes(class: &ClassDescriptor) -> Result<Vec<u8>> {
    let mut w = Writer::default();

    w.u32(MAGIC);
    w.u16(class.minor_version);
    w.u16(class.major_version);
    write_constant_pool(&mut w, &class.constant_pool)?;

    w.u16(class.access.bits());
    w.u16(class.this_class);
    w.u16(class.super_class);

    w.u16(len_u16("interfaces", class.interfaces.len())?);
    for interface in &class.interfaces {
        w.u16(*interface);
    }

    w.u16(len_u16("fields", class.fields.len())?);
    for field in &class.fields {
        w.u16(field.access_flags);
        w.u16(field.name_index);
        w.u16(field.descriptor_index);
        write_attributes(&mut w, &field.attributes)?;
    }

    w.u16(len_u16("methods", class.methods.len())?);
    for method in &class.methods {
        w.u16(method.access.bits());
        w.u16(method.name_index);
        w.u16(method.descriptor_index);
        write_attributes(&mut w, &method.attributes)?;
    }

    write_attributes(&mut w, &class.attributes)?;
    Ok(w.into_inner())
}

fn read_constant_pool(r: &mut Reader<'_>) -> Result<ConstantPool> {
    let count = r.u16()?;
    let mut pool = ConstantPool::new();
    let mut index: u16 = 1;

    while index < count {
        let tag = r.u8()?;
        let constant = match tag {
            Constant::TAG_UTF8 => {
                let len = r.u16()?;
                Constant::Utf8(r.take(usize::from(len))?.to_vec())
            }
            Constant::TAG_INTEGER => Constant::Integer(r.u32()?),
            Constant::TAG_FLOAT => Constant::Float(r.u32()?),
            Constant::TAG_LONG => Constant::Long(r.u64()?),
            Constant::TAG_DOUBLE => Constant::Double(r.u64()?),
            Constant::TAG_CLASS => Constant::Class {
                name_index: r.u16()?,
            },
            Constant::TAG_STRING => Constant::String {
                string_index: r.u16()?,
            },
            Constant::TAG_FIELD_REF => Constant::FieldRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            Constant::TAG_METHOD_REF => Constant::MethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            Constant::TAG_INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            Constant::TAG_NAME_AND_TYPE => Constant::NameAndType {
                name_index: r.u16()?,
                descriptor_index: r.u16()?,
            },
            Constant::TAG_METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: r.u8()?,
                reference_index: r.u16()?,
            },
            Constant::TAG_METHOD_TYPE => Constant::MethodType {
                descriptor_index: r.u16()?,
            },
            Constant::TAG_DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            Constant::TAG_INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            Constant::TAG_MODULE => Constant::Module {
                name_index: r.u16()?,
            },
            Constant::TAG_PACKAGE => Constant::Package {
                name_index: r.u16()?,
            },
            _ => return Err(ClassFormatError::UnknownConstantTag { tag, index }),
        };

        let wide = constant.is_wide();
        pool.push_raw(constant);
        if wide {
            // The second slot must still be inside the declared pool.
            if index + 1 >= count {
                return Err(ClassFormatError::InvalidConstantIndex { index: index + 1 });
            }
            pool.push_raw(Constant::Unusable);
            index += 2;
        } else {
            index += 1;
        }
    }

    Ok(pool)
}

fn write_constant_pool(w: &mut Writer, pool: &ConstantPool) -> Result<()> {
    w.u16(len_u16("constant pool entries", pool.count())?);

    for constant in pool.raw_entries() {
        match constant {
            Constant::Utf8(bytes) => {
                w.u8(Constant::TAG_UTF8);
                w.u16(len_u16("bytes in a Utf8 constant", bytes.len())?);
                w.bytes(bytes);
            }
            Constant::Integer(v) => {
                w.u8(Constant::TAG_INTEGER);
                w.u32(*v);
            }
            Constant::Float(v) => {
                w.u8(Constant::TAG_FLOAT);
                w.u32(*v);
            }
            Constant::Long(v) => {
                w.u8(Constant::TAG_LONG);
                w.u64(*v);
            }
            Constant::Double(v) => {
                w.u8(Constant::TAG_DOUBLE);
                w.u64(*v);
            }
            Constant::Class { name_index } => {
                w.u8(Constant::TAG_CLASS);
                w.u16(*name_index);
            }
            Constant::String { string_index } => {
                w.u8(Constant::TAG_STRING);
                w.u16(*string_index);
            }
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => {
                w.u8(Constant::TAG_FIELD_REF);
                w.u16(*class_index);
                w.u16(*name_and_type_index);
            }
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                w.u8(Constant::TAG_METHOD_REF);
                w.u16(*class_index);
                w.u16(*name_and_type_index);
            }
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                w.u8(Constant::TAG_INTERFACE_METHOD_REF);
                w.u16(*class_index);
                w.u16(*name_and_type_index);
            }
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => {
                w.u8(Constant::TAG_NAME_AND_TYPE);
                w.u16(*name_index);
                w.u16(*descriptor_index);
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                w.u8(Constant::TAG_METHOD_HANDLE);
                w.u8(*reference_kind);
                w.u16(*reference_index);
            }
            Constant::MethodType { descriptor_index } => {
                w.u8(Constant::TAG_METHOD_TYPE);
                w.u16(*descriptor_index);
            }
            Constant::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                w.u8(Constant::TAG_DYNAMIC);
                w.u16(*bootstrap_method_attr_index);
                w.u16(*name_and_type_index);
            }
            Constant::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                w.u8(Constant::TAG_INVOKE_DYNAMIC);
                w.u16(*bootstrap_method_attr_index);
                w.u16(*name_and_type_index);
            }
            Constant::Module { name_index } => {
                w.u8(Constant::TAG_MODULE);
                w.u16(*name_index);
            }
            Constant::Package { name_index } => {
                w.u8(Constant::TAG_PACKAGE);
                w.u16(*name_index);
            }
            Constant::Unusable => {}
        }
    }

    Ok(())
}

fn read_attributes(r: &mut Reader<'_>) -> Result<Vec<Attribute>> {
    let count = r.u16()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let name_index = r.u16()?;
        let len = r.u32()?;
        let len = usize::try_from(len).map_err(|_| ClassFormatError::Truncated {
            offset: r.pos,
            needed: usize::MAX,
        })?;
        attributes.push(Attribute {
            name_index,
            info: r.take(len)?.to_vec(),
        });
    }
    Ok(attributes)
}

fn write_attributes(w: &mut Writer, attributes: &[Attribute]) -> Result<()> {
    w.u16(len_u16("attributes", attributes.len())?);
    for attribute in attributes {
        w.u16(attribute.name_index);
        let len = u32::try_from(attribute.info.len()).map_err(|_| ClassFormatError::TooMany {
            what: "bytes in an attribute",
            count: attribute.info.len(),
        })?;
        w.u32(len);
        w.bytes(&attribute.info);
    }
    Ok(())
}

/// Finds the `InnerClasses` entry describing the class itself, if any.
fn find_own_inner_entry(
    pool: &ConstantPool,
    attributes: &[Attribute],
    internal_name: &str,
) -> Result<Option<InnerEntryRef>> {
    for (attribute_index, attribute) in attributes.iter().enumerate() {
        if pool.utf8_bytes(attribute.name_index)? != INNER_CLASSES {
            continue;
        }

        let info = &attribute.info;
        let count = match info.get(0..2) {
            Some(b) => usize::from(u16::from_be_bytes([b[0], b[1]])),
            None => {
                return Err(ClassFormatError::MalformedInnerClasses(
                    "missing number_of_classes".to_string(),
                ));
            }
        };
        let expected = 2 + count * INNER_CLASS_ENTRY_LEN;
        if info.len() != expected {
            return Err(ClassFormatError::MalformedInnerClasses(format!(
                "{count} entries need {expected} bytes, found {}",
                info.len()
            )));
        }

        for entry in 0..count {
            let offset = 2 + entry * INNER_CLASS_ENTRY_LEN;
            let inner_class_index = u16::from_be_bytes([info[offset], info[offset + 1]]);
            if pool
                .class_name(inner_class_index)
                .is_ok_and(|name| name == internal_name)
            {
                return Ok(Some(InnerEntryRef {
                    attribute: attribute_index,
                    offset: offset + 6,
                }));
            }
        }
    }

    Ok(None)
}

fn len_u16(what: &'static str, count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| ClassFormatError::TooMany { what, count })
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ClassFormatError::Truncated {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(u64::from_be_bytes(buf))
    }
}

#[derive(Default)]
struct Writer {
    out: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.out.push(v);
    }

    fn u16(&mut self, v: u16) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn u32(&mut self, v: u32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn bytes(&mut self, v: &[u8]) {
        self.out.extend_from_slice(v);
    }

    fn into_inner(self) -> Vec<u8> {
        self.out
    }
}
