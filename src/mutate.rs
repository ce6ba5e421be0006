use serde::Serialize;
use tracing::debug;

use crate::access::{ClassAccess, InnerClassAccess, MethodAccess};
use crate::descriptor::ClassDescriptor;

/// What [`strip_finals`] changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StripSummary {
    pub class_stripped: bool,
    /// `name + descriptor` of every method whose final flag was cleared.
    pub methods: Vec<String>,
}

impl StripSummary {
    pub fn is_empty(&self) -> bool {
        !self.class_stripped && self.methods.is_empty()
    }
}

/// Clears `final` on the class and on each of its public final methods.
///
/// Only the final bit is ever touched. Non-public methods keep their flags
/// even when final. Running it twice changes nothing the second time.
pub fn strip_finals(class: &mut ClassDescriptor) -> StripSummary {
    let mut summary = StripSummary::default();

    let access = class.access();
    if access.is_final() {
        class.set_access(access.difference(ClassAccess::FINAL));
        summary.class_stripped = true;
    }
    if let Some(inner) = class.inner_class_access()
        && inner.is_final()
    {
        class.set_inner_class_access(inner.difference(InnerClassAccess::FINAL));
        summary.class_stripped = true;
    }
    if summary.class_stripped {
        debug!("{} - stripped final", class.name());
    }

    let class_name = class.name().to_string();
    for method in class.methods_mut() {
        let access = method.access();
        if access.is_public() && access.is_final() {
            method.set_access(access.difference(MethodAccess::FINAL));
            debug!("{class_name}#{} - stripped final", method.name());
            summary.methods.push(method.signature());
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::{parse, to_bytes};

    const BAR: &[u8] = include_bytes!("../tests/fixtures/classes/com/example/api/Bar.class");
    const NESTED: &[u8] =
        include_bytes!("../tests/fixtures/classes/com/example/api/Bar$Nested.class");

    fn flags(class: &ClassDescriptor, name: &str) -> u16 {
        class
            .methods()
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.access().bits())
            .unwrap()
    }

    #[test]
    fn strips_class_and_public_final_methods_only() {
        let mut class = parse(BAR).unwrap();
        let summary = strip_finals(&mut class);

        assert!(summary.class_stripped);
        assert_eq!(summary.methods, vec!["hello()Ljava/lang/String;".to_string()]);
        assert_eq!(class.access().bits(), 0x0021);
        assert_eq!(flags(&class, "hello"), 0x0001);
        assert_eq!(flags(&class, "secret"), 0x0012);
        assert_eq!(flags(&class, "guarded"), 0x0014);
        assert_eq!(flags(&class, "open"), 0x0001);
        assert_eq!(flags(&class, "<init>"), 0x0001);
        assert_eq!(flags(&class, "lambda$hello$0"), 0x100a);
    }

    #[test]
    fn stripped_class_survives_reencoding() {
        let mut class = parse(BAR).unwrap();
        strip_finals(&mut class);
        let bytes = to_bytes(&class).unwrap();
        assert_eq!(bytes.len(), BAR.len());

        let reparsed = parse(&bytes).unwrap();
        assert_eq!(reparsed, class);
        assert!(!reparsed.is_final());
    }

    #[test]
    fn strip_is_idempotent() {
        let mut once = parse(BAR).unwrap();
        strip_finals(&mut once);

        let mut twice = once.clone();
        let second = strip_finals(&mut twice);
        assert!(second.is_empty());
        assert_eq!(once, twice);
    }

    #[test]
    fn nested_class_loses_final_in_both_places() {
        let mut class = parse(NESTED).unwrap();
        let summary = strip_finals(&mut class);
        assert!(summary.class_stripped);
        assert_eq!(summary.methods, vec!["go()V".to_string()]);
        assert!(!class.access().is_final());
        assert_eq!(
            class.inner_class_access(),
            Some(InnerClassAccess::PUBLIC | InnerClassAccess::STATIC)
        );
        assert!(!class.is_final());
    }
}
