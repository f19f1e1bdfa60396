//! Type descriptors
//!
//! Canonical mapping between source types, IR type tags and JVM descriptors.

use crate::frontend::ast::SourceType;
use std::fmt;

/// IR / bytecode type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int32,
    Bool,
    Void,
    Reference(String),
    Array(Box<TypeTag>),
}

impl TypeTag {
    /// Array of `elem`; `None` for `void`
    pub fn array_of(elem: TypeTag) -> Option<TypeTag> {
        match elem {
            TypeTag::Void => None,
            elem => Some(TypeTag::Array(Box::new(elem))),
        }
    }

    pub fn int_array() -> TypeTag {
        TypeTag::Array(Box::new(TypeTag::Int32))
    }

    pub fn reference(name: &str) -> TypeTag {
        TypeTag::Reference(name.to_string())
    }

    /// Source type to tag. `void[]` collapses to `void`, which the semantic pass
    /// never lets through.
    pub fn from_source(ty: &SourceType) -> TypeTag {
        match ty {
            SourceType::Int => TypeTag::Int32,
            SourceType::Boolean => TypeTag::Bool,
            SourceType::Void => TypeTag::Void,
            SourceType::Class(name) => TypeTag::Reference(name.clone()),
            SourceType::Array(elem) => {
                TypeTag::array_of(TypeTag::from_source(elem)).unwrap_or(TypeTag::Void)
            }
        }
    }

    /// Reference-like values use the `a*` opcode family
    pub fn is_reference(&self) -> bool {
        matches!(self, TypeTag::Reference(_) | TypeTag::Array(_))
    }

    /// Values held as JVM ints (`int` and `boolean`)
    pub fn is_int_like(&self) -> bool {
        matches!(self, TypeTag::Int32 | TypeTag::Bool)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeTag::Void)
    }

    pub fn element(&self) -> Option<&TypeTag> {
        match self {
            TypeTag::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// Class name of a reference type
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeTag::Reference(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    /// IR suffix notation: `i32`, `bool`, `V`, `array.i32`, or the class name
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            TypeTag::Int32 => write!(f, "i32"),
            TypeTag::Bool => write!(f, "bool"),
            TypeTag::Void => write!(f, "V"),
            TypeTag::Reference(name) => write!(f, "{}", name),
            TypeTag::Array(elem) => write!(f, "array.{}", elem),
        }
    }
}

/// Resolves simple class names to JVM internal names using the imports
#[derive(Debug, Clone, Default)]
pub struct ClassResolver {
    class_name: String,
    imports: Vec<String>,
}

impl ClassResolver {
    pub fn new(
        class_name: &str,
        imports: &[String],
    ) -> Self {
        Self {
            class_name: class_name.to_string(),
            imports: imports.to_vec(),
        }
    }

    /// `java.util.List` imported → `java/util/List`; `String` → `java/lang/String`;
    /// anything else (including the current class) stays as written.
    pub fn qualify(
        &self,
        name: &str,
    ) -> String {
        if name == self.class_name {
            return name.to_string();
        }
        if let Some(path) = self
            .imports
            .iter()
            .find(|path| path.rsplit('.').next() == Some(name))
        {
            return path.replace('.', "/");
        }
        match name {
            "String" => "java/lang/String".to_string(),
            "Object" => "java/lang/Object".to_string(),
            _ => name.to_string(),
        }
    }

    /// Superclass internal name, defaulting to the root object type
    pub fn super_class(
        &self,
        super_class: Option<&str>,
    ) -> String {
        super_class
            .map(|name| self.qualify(name))
            .unwrap_or_else(|| "java/lang/Object".to_string())
    }

    /// Field / parameter descriptor
    pub fn descriptor(
        &self,
        ty: &TypeTag,
    ) -> String {
        match ty {
            TypeTag::Int32 => "I".to_string(),
            TypeTag::Bool => "Z".to_string(),
            TypeTag::Void => "V".to_string(),
            TypeTag::Reference(name) => format!("L{};", self.qualify(name)),
            TypeTag::Array(elem) => format!("[{}", self.descriptor(elem)),
        }
    }

    /// Method descriptor `(params)ret`
    pub fn method_descriptor<'a>(
        &self,
        params: impl IntoIterator<Item = &'a TypeTag>,
        ret: &TypeTag,
    ) -> String {
        let params: String = params.into_iter().map(|p| self.descriptor(p)).collect();
        format!("({}){}", params, self.descriptor(ret))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_to_tag() {
        assert_eq!(TypeTag::from_source(&SourceType::Int), TypeTag::Int32);
        assert_eq!(TypeTag::from_source(&SourceType::Boolean), TypeTag::Bool);
        assert_eq!(
            TypeTag::from_source(&SourceType::int_array()),
            TypeTag::int_array()
        );
        assert_eq!(
            TypeTag::from_source(&SourceType::class("Foo")),
            TypeTag::reference("Foo")
        );
    }

    #[test]
    fn test_array_never_wraps_void() {
        assert_eq!(TypeTag::array_of(TypeTag::Void), None);
        assert_eq!(
            TypeTag::from_source(&SourceType::Array(Box::new(SourceType::Void))),
            TypeTag::Void
        );
    }

    #[test]
    fn test_descriptors() {
        let resolver = ClassResolver::new("Simple", &["java.util.List".to_string(), "io".to_string()]);
        assert_eq!(resolver.descriptor(&TypeTag::Int32), "I");
        assert_eq!(resolver.descriptor(&TypeTag::Bool), "Z");
        assert_eq!(resolver.descriptor(&TypeTag::int_array()), "[I");
        assert_eq!(
            resolver.descriptor(&TypeTag::reference("List")),
            "Ljava/util/List;"
        );
        assert_eq!(
            resolver.descriptor(&TypeTag::Array(Box::new(TypeTag::reference("String")))),
            "[Ljava/lang/String;"
        );
        assert_eq!(resolver.descriptor(&TypeTag::reference("Simple")), "LSimple;");
        assert_eq!(resolver.qualify("io"), "io");
    }

    #[test]
    fn test_method_descriptor() {
        let resolver = ClassResolver::default();
        let params = [TypeTag::Int32, TypeTag::Bool];
        assert_eq!(
            resolver.method_descriptor(&params, &TypeTag::Int32),
            "(IZ)I"
        );
        assert_eq!(resolver.method_descriptor(&[], &TypeTag::Void), "()V");
    }

    #[test]
    fn test_super_class_default() {
        let resolver = ClassResolver::new("A", &["pkg.Base".to_string()]);
        assert_eq!(resolver.super_class(None), "java/lang/Object");
        assert_eq!(resolver.super_class(Some("Base")), "pkg/Base");
    }
}
