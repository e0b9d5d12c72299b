use std::fmt;
use std::sync::{Arc, OnceLock};

/// Shared handle to a class descriptor.
///
/// Transform resolution is memoized per handle, so long-lived handles should
/// be reused rather than rebuilt.
pub type ClassRef = Arc<Class>;

/// Integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntType {
    pub const ALL: [IntType; 8] = [
        IntType::I8,
        IntType::I16,
        IntType::I32,
        IntType::I64,
        IntType::U8,
        IntType::U16,
        IntType::U32,
        IntType::U64,
    ];

    pub fn name(self) -> &'static str {
        match self {
            IntType::I8 => "i8",
            IntType::I16 => "i16",
            IntType::I32 => "i32",
            IntType::I64 => "i64",
            IntType::U8 => "u8",
            IntType::U16 => "u16",
            IntType::U32 => "u32",
            IntType::U64 => "u64",
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntType::I8 | IntType::I16 | IntType::I32 | IntType::I64)
    }
}

/// Floating-point widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    pub fn name(self) -> &'static str {
        match self {
            FloatType::F32 => "f32",
            FloatType::F64 => "f64",
        }
    }
}

/// Well-known value types with a canonical text form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Date,
    DateTime,
    Locale,
    Url,
    Uri,
    Path,
    BigInteger,
    BigDecimal,
    Currency,
    TimeZone,
}

impl Family {
    pub const ALL: [Family; 10] = [
        Family::Date,
        Family::DateTime,
        Family::Locale,
        Family::Url,
        Family::Uri,
        Family::Path,
        Family::BigInteger,
        Family::BigDecimal,
        Family::Currency,
        Family::TimeZone,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Date => "date",
            Family::DateTime => "datetime",
            Family::Locale => "locale",
            Family::Url => "url",
            Family::Uri => "uri",
            Family::Path => "path",
            Family::BigInteger => "biginteger",
            Family::BigDecimal => "bigdecimal",
            Family::Currency => "currency",
            Family::TimeZone => "timezone",
        }
    }
}

/// How a field is laid out in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// An attribute of the owning element.
    Attribute,
    /// A child element.
    Element,
    /// The text content of the owning element.
    Text,
    /// Repeated child elements named after the field, with no wrapper.
    Collection,
}

/// Where a field finds its declared class.
///
/// `Deferred` breaks construction-time recursion for self-referencing types.
#[derive(Clone)]
pub enum ClassSource {
    Fixed(ClassRef),
    Deferred(fn() -> ClassRef),
}

impl ClassSource {
    pub fn resolve(&self) -> ClassRef {
        match self {
            ClassSource::Fixed(class) => class.clone(),
            ClassSource::Deferred(source) => source(),
        }
    }
}

impl From<ClassRef> for ClassSource {
    fn from(class: ClassRef) -> Self {
        ClassSource::Fixed(class)
    }
}

impl From<&ClassRef> for ClassSource {
    fn from(class: &ClassRef) -> Self {
        ClassSource::Fixed(class.clone())
    }
}

impl fmt::Debug for ClassSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassSource::Fixed(class) => write!(f, "Fixed({})", class.name()),
            ClassSource::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

/// Descriptor of one field of a record class.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    role: Role,
    required: bool,
    class: ClassSource,
    entry: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, role: Role, class: impl Into<ClassSource>) -> Self {
        Field {
            name: name.into(),
            role,
            required: true,
            class: class.into(),
            entry: None,
        }
    }

    pub fn attribute(name: impl Into<String>, class: impl Into<ClassSource>) -> Self {
        Self::new(name, Role::Attribute, class)
    }

    pub fn element(name: impl Into<String>, class: impl Into<ClassSource>) -> Self {
        Self::new(name, Role::Element, class)
    }

    pub fn text(name: impl Into<String>, class: impl Into<ClassSource>) -> Self {
        Self::new(name, Role::Text, class)
    }

    /// A collection field; `class` is the array class holding the entries.
    pub fn collection(name: impl Into<String>, class: impl Into<ClassSource>) -> Self {
        Self::new(name, Role::Collection, class)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Element name used for array entries of this field.
    pub fn entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn class(&self) -> ClassRef {
        self.class.resolve()
    }

    pub fn entry_name(&self) -> Option<&str> {
        self.entry.as_deref()
    }
}

/// A composite class: an ordered list of fields plus an optional parent.
#[derive(Debug, Clone, Default)]
pub struct Record {
    parent: Option<ClassRef>,
    root: Option<String>,
    fields: Vec<Field>,
}

impl Record {
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// Fields declared directly on this record, excluding inherited ones.
    pub fn own_fields(&self) -> &[Field] {
        &self.fields
    }
}

/// The shape of a class.
#[derive(Debug, Clone)]
pub enum Repr {
    Bool,
    Char,
    Int(IntType),
    Float(FloatType),
    Text,
    Family(Family),
    Array(ClassRef),
    Enum(Vec<String>),
    Record(Record),
    /// A value type with no built-in codec; resolved by a caller matcher.
    Opaque,
}

/// A runtime class descriptor.
#[derive(Debug, Clone)]
pub struct Class {
    name: String,
    repr: Repr,
}

macro_rules! builtin_class {
    ($fn:ident, $name:expr, $repr:expr) => {
        pub fn $fn() -> ClassRef {
            static CLASS: OnceLock<ClassRef> = OnceLock::new();
            CLASS.get_or_init(|| Arc::new(Class::new($name, $repr))).clone()
        }
    };
}

impl Class {
    pub fn new(name: impl Into<String>, repr: Repr) -> Self {
        Class {
            name: name.into(),
            repr,
        }
    }

    builtin_class!(boolean, "bool", Repr::Bool);
    builtin_class!(character, "char", Repr::Char);
    builtin_class!(text, "string", Repr::Text);

    pub fn int(kind: IntType) -> ClassRef {
        static CLASSES: [OnceLock<ClassRef>; 8] = [const { OnceLock::new() }; 8];
        let index = IntType::ALL.iter().position(|k| *k == kind).unwrap_or_default();
        CLASSES[index]
            .get_or_init(|| Arc::new(Class::new(kind.name(), Repr::Int(kind))))
            .clone()
    }

    pub fn float(kind: FloatType) -> ClassRef {
        static CLASSES: [OnceLock<ClassRef>; 2] = [const { OnceLock::new() }; 2];
        let index = match kind {
            FloatType::F32 => 0,
            FloatType::F64 => 1,
        };
        CLASSES[index]
            .get_or_init(|| Arc::new(Class::new(kind.name(), Repr::Float(kind))))
            .clone()
    }

    pub fn family(family: Family) -> ClassRef {
        static CLASSES: [OnceLock<ClassRef>; 10] = [const { OnceLock::new() }; 10];
        let index = Family::ALL.iter().position(|f| *f == family).unwrap_or_default();
        CLASSES[index]
            .get_or_init(|| Arc::new(Class::new(family.name(), Repr::Family(family))))
            .clone()
    }

    /// An array class over `component`, named `component[]`.
    pub fn array(component: ClassRef) -> ClassRef {
        Arc::new(Class::new(format!("{}[]", component.name), Repr::Array(component)))
    }

    pub fn enumeration(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = impl Into<String>>,
    ) -> ClassRef {
        let variants = variants.into_iter().map(Into::into).collect();
        Arc::new(Class::new(name, Repr::Enum(variants)))
    }

    pub fn opaque(name: impl Into<String>) -> ClassRef {
        Arc::new(Class::new(name, Repr::Opaque))
    }

    pub fn record(name: impl Into<String>) -> RecordBuilder {
        RecordBuilder {
            name: name.into(),
            record: Record::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repr(&self) -> &Repr {
        &self.repr
    }

    pub fn is_record(&self) -> bool {
        matches!(self.repr, Repr::Record(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.repr, Repr::Array(_))
    }

    pub fn component(&self) -> Option<&ClassRef> {
        match &self.repr {
            Repr::Array(component) => Some(component),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match &self.repr {
            Repr::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn parent(&self) -> Option<&ClassRef> {
        self.as_record().and_then(Record::parent)
    }

    /// Element name used when this class is the document root.
    pub fn root_name(&self) -> &str {
        self.as_record()
            .and_then(|r| r.root.as_deref())
            .unwrap_or(&self.name)
    }

    /// All fields, inherited ones first.
    pub fn fields(&self) -> Vec<&Field> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(record) = class.as_record() {
                chain.push(record.own_fields());
            }
            current = class.parent().map(|p| p.as_ref());
        }
        chain.into_iter().rev().flatten().collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields().into_iter().find(|f| f.name == name)
    }

    /// Returns true if a value of class `other` may stand where `self` is
    /// declared: the same class, a descendant record, or an array whose
    /// component is assignable.
    pub fn is_assignable_from(&self, other: &Class) -> bool {
        if self.name == other.name {
            return true;
        }
        if let (Some(mine), Some(theirs)) = (self.component(), other.component()) {
            return mine.is_assignable_from(theirs);
        }
        let mut ancestor = other.parent();
        while let Some(class) = ancestor {
            if class.name == self.name {
                return true;
            }
            ancestor = class.parent();
        }
        false
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Class {}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Builds a record class.
pub struct RecordBuilder {
    name: String,
    record: Record,
}

impl RecordBuilder {
    /// Inherits the fields of `parent`, which must itself be a record.
    pub fn extends(mut self, parent: &ClassRef) -> Self {
        self.record.parent = Some(parent.clone());
        self
    }

    /// Element name used when this class is the document root.
    pub fn root(mut self, name: impl Into<String>) -> Self {
        self.record.root = Some(name.into());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.record.fields.push(field);
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.record.fields.extend(fields);
        self
    }

    pub fn build(self) -> ClassRef {
        Arc::new(Class::new(self.name, Repr::Record(self.record)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ClassRef {
        Class::record("Shape")
            .field(Field::attribute("name", Class::text()))
            .build()
    }

    #[test]
    fn builtin_classes_are_shared() {
        assert!(Arc::ptr_eq(&Class::text(), &Class::text()));
        assert!(Arc::ptr_eq(&Class::int(IntType::U16), &Class::int(IntType::U16)));
        assert!(!Arc::ptr_eq(&Class::int(IntType::U16), &Class::int(IntType::I16)));
        assert_eq!(Class::family(Family::Url).name(), "url");
    }

    #[test]
    fn inherited_fields_come_first() {
        let shape = shape();
        let circle = Class::record("Circle")
            .extends(&shape)
            .field(Field::attribute("radius", Class::float(FloatType::F64)))
            .build();

        let names: Vec<_> = circle.fields().iter().map(|f| f.name().to_string()).collect();
        assert_eq!(names, vec!["name", "radius"]);
        assert!(circle.field("name").is_some());
    }

    #[test]
    fn assignability_follows_parents() {
        let shape = shape();
        let circle = Class::record("Circle").extends(&shape).build();
        let square = Class::record("Square").extends(&shape).build();

        assert!(shape.is_assignable_from(&circle));
        assert!(!circle.is_assignable_from(&shape));
        assert!(!circle.is_assignable_from(&square));
        assert!(Class::array(shape.clone()).is_assignable_from(&Class::array(circle)));
    }

    #[test]
    fn array_names_component() {
        let array = Class::array(Class::int(IntType::I32));
        assert_eq!(array.name(), "i32[]");
        assert_eq!(array.component().map(|c| c.name()), Some("i32"));
    }

    #[test]
    fn deferred_field_class() {
        fn node() -> ClassRef {
            static NODE: OnceLock<ClassRef> = OnceLock::new();
            NODE.get_or_init(|| {
                Class::record("Node")
                    .field(Field::element("next", ClassSource::Deferred(node)).optional())
                    .build()
            })
            .clone()
        }

        let next = node().field("next").map(Field::class).unwrap();
        assert!(Arc::ptr_eq(&next, &node()));
    }

    #[test]
    fn root_name_defaults_to_class_name() {
        assert_eq!(shape().root_name(), "Shape");
        let named = Class::record("Shape").root("shape").build();
        assert_eq!(named.root_name(), "shape");
    }
}
