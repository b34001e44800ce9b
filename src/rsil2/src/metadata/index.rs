macro_rules! define_index {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub u32);

        impl $name {
            /// Sentinel meaning "no entry".
            pub const INVALID: $name = $name(0xFFFF_FFFF);

            pub fn is_valid(self) -> bool {
                self != Self::INVALID
            }
        }

        impl From<u32> for $name {
            fn from(value: u32) -> Self {
                $name(value)
            }
        }
    };
}

define_index!(
    /// Key into the identifier string pool.
    StringIndex
);
define_index!(
    /// Index into the type table (generic/by-ref/by-val shapes included).
    TypeIndex
);
define_index!(
    /// Index into the type-definition table.
    TypeDefinitionIndex
);
define_index!(
    /// Index into the method table.
    MethodIndex
);
define_index!(
    /// Index into the field table.
    FieldIndex
);
define_index!(
    /// Index into the property table.
    PropertyIndex
);
define_index!(
    /// Index into the event table.
    EventIndex
);
define_index!(
    /// Index into the parameter table.
    ParameterIndex
);
define_index!(
    /// Index into the image table.
    ImageIndex
);
define_index!(
    /// Index into the assembly table.
    AssemblyIndex
);
define_index!(
    /// Index into the generic-container table.
    GenericContainerIndex
);
define_index!(
    /// Index into the nested-type table.
    NestedTypeIndex
);
define_index!(
    /// Index into the interfaces table.
    InterfacesIndex
);
define_index!(
    /// Index into the vtable-method table.
    VTableIndex
);
define_index!(
    /// Index into the interface-offsets table.
    InterfaceOffsetIndex
);

/// A 32-bit identifier combining a one-byte table tag with a 24-bit
/// table-local index, following the managed metadata token layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetadataToken(pub u32);

impl MetadataToken {
    pub const TYPE_DEF: u8 = 0x02;
    pub const FIELD: u8 = 0x04;
    pub const METHOD: u8 = 0x06;
    pub const PROPERTY: u8 = 0x07;

    pub fn new(table: u8, index: u32) -> MetadataToken {
        MetadataToken((table as u32) << 24 | (index & 0x00FF_FFFF))
    }

    pub fn type_def(index: u32) -> MetadataToken {
        MetadataToken::new(Self::TYPE_DEF, index)
    }

    pub fn field(index: u32) -> MetadataToken {
        MetadataToken::new(Self::FIELD, index)
    }

    pub fn method(index: u32) -> MetadataToken {
        MetadataToken::new(Self::METHOD, index)
    }

    pub fn property(index: u32) -> MetadataToken {
        MetadataToken::new(Self::PROPERTY, index)
    }

    pub fn table(self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn index(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }
}
