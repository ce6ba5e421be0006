//! In-memory model of one compiled class.
//!
//! A [`ClassDescriptor`] carries the identity and modifier sets that filtering
//! and mutation care about, plus everything else needed to re-encode the file
//! unchanged. It is built by [`crate::classfile::parse`] and consumed by
//! [`crate::classfile::to_bytes`].

use serde::Serialize;

use crate::access::{
    ClassAccess, InnerClassAccess, MethodAccess, class_modifiers, method_modifiers,
};
use crate::constant_pool::ConstantPool;

/// An attribute whose body is kept opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name_index: u16,
    pub info: Vec<u8>,
}

/// Fields are never inspected, only carried through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<Attribute>,
}

/// A declared method, identified by `(name, descriptor)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub(crate) access: MethodAccess,
    pub(crate) name: String,
    pub(crate) descriptor: String,
    pub(crate) name_index: u16,
    pub(crate) descriptor_index: u16,
    pub(crate) attributes: Vec<Attribute>,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// JVM method descriptor, e.g. `(I)Ljava/lang/String;`.
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn access(&self) -> MethodAccess {
        self.access
    }

    pub fn set_access(&mut self, access: MethodAccess) {
        self.access = access;
    }

    /// `name + descriptor`, the identity used in logs and reports.
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.descriptor)
    }
}

/// Location of this class's own entry inside its `InnerClasses` attribute.
///
/// `offset` points at the entry's `inner_class_access_flags` within the
/// attribute body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InnerEntryRef {
    pub(crate) attribute: usize,
    pub(crate) offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    pub(crate) minor_version: u16,
    pub(crate) major_version: u16,
    pub(crate) constant_pool: ConstantPool,
    pub(crate) access: ClassAccess,
    pub(crate) this_class: u16,
    pub(crate) super_class: u16,
    pub(crate) interfaces: Vec<u16>,
    pub(crate) fields: Vec<FieldInfo>,
    pub(crate) methods: Vec<MethodDescriptor>,
    pub(crate) attributes: Vec<Attribute>,
    pub(crate) name: String,
    pub(crate) own_inner_entry: Option<InnerEntryRef>,
}

impl ClassDescriptor {
    /// Fully-qualified binary name, dot separated (`a.b.Outer$Inner`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package part of [`Self::name`]; empty for the default package.
    pub fn package_name(&self) -> &str {
        package_of(&self.name)
    }

    pub fn simple_name(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((_, simple)) => simple,
            None => &self.name,
        }
    }

    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    pub fn access(&self) -> ClassAccess {
        self.access
    }

    pub fn set_access(&mut self, access: ClassAccess) {
        self.access = access;
    }

    /// Flags recorded for this class in its own `InnerClasses` entry, if it is
    /// a nested class.
    pub fn inner_class_access(&self) -> Option<InnerClassAccess> {
        let entry = self.own_inner_entry?;
        let info = &self.attributes.get(entry.attribute)?.info;
        let bytes = info.get(entry.offset..entry.offset + 2)?;
        Some(InnerClassAccess::from_bits_retain(u16::from_be_bytes([
            bytes[0], bytes[1],
        ])))
    }

    /// Overwrites the flags of this class's own `InnerClasses` entry. Returns
    /// `false` when the class has no such entry.
    pub fn set_inner_class_access(&mut self, access: InnerClassAccess) -> bool {
        let Some(entry) = self.own_inner_entry else {
            return false;
        };
        let Some(attribute) = self.attributes.get_mut(entry.attribute) else {
            return false;
        };
        match attribute.info.get_mut(entry.offset..entry.offset + 2) {
            Some(slot) => {
                slot.copy_from_slice(&access.bits().to_be_bytes());
                true
            }
            None => false,
        }
    }

    /// A class is final when its own flags or its nested-class entry say so.
    pub fn is_final(&self) -> bool {
        self.access.is_final() || self.inner_class_access().is_some_and(|a| a.is_final())
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }

    pub fn methods_mut(&mut self) -> &mut [MethodDescriptor] {
        &mut self.methods
    }

    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodDescriptor> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    pub fn fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Serializable view used by the `inspect` command.
    pub fn summary(&self) -> ClassSummary {
        ClassSummary {
            name: self.name.clone(),
            package: self.package_name().to_string(),
            version: format!("{}.{}", self.major_version, self.minor_version),
            access_flags: self.access.bits(),
            modifiers: class_modifiers(self.access),
            inner_class_flags: self.inner_class_access().map(|a| a.bits()),
            is_final: self.is_final(),
            fields: self.fields.len(),
            methods: self
                .methods
                .iter()
                .map(|m| MethodSummary {
                    name: m.name.clone(),
                    descriptor: m.descriptor().to_string(),
                    access_flags: m.access.bits(),
                    modifiers: method_modifiers(m.access),
                })
                .collect(),
        }
    }
}

/// Package of a dot-separated binary name.
pub fn package_of(fqn: &str) -> &str {
    match fqn.rsplit_once('.') {
        Some((package, _)) => package,
        None => "",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub name: String,
    pub package: String,
    pub version: String,
    pub access_flags: u16,
    pub modifiers: Vec<&'static str>,
    pub inner_class_flags: Option<u16>,
    pub is_final: bool,
    pub fields: usize,
    pub methods: Vec<MethodSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodSummary {
    pub name: String,
    pub descriptor: String,
    pub access_flags: u16,
    pub modifiers: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_of_handles_default_and_nested() {
        assert_eq!(package_of("com.example.api.Bar"), "com.example.api");
        assert_eq!(package_of("com.example.api.Bar$Nested"), "com.example.api");
        assert_eq!(package_of("TopLevel"), "");
    }
}
