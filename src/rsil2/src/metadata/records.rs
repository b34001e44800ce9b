use byteorder::{LittleEndian, ReadBytesExt};

use super::*;

/// A fixed-size row of one of the record tables. Rows are decoded field by
/// field so the layout holds on any host, regardless of alignment.
pub trait Record: Sized {
    /// Serialized size of one row in bytes.
    const SIZE: usize;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<Self, std::io::Error>;
}

/// # Image record
///
/// One row per assembly image. Each image owns a contiguous range of the
/// type-definition table.
///
/// Columns:
/// * `name_index` (an index into the string pool)
/// * `assembly_index` (an index into the assembly table)
/// * `type_start`, `type_count` (the type-definition range owned by this image)
/// * `exported_type_start`, `exported_type_count` (the exported-type range)
/// * `entry_point_index` (an index into the method table, or absent)
/// * `token` (the metadata token)
/// * `custom_attribute_start`, `custom_attribute_count`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageRecord {
    pub name_index: StringIndex,
    pub assembly_index: AssemblyIndex,
    pub type_start: TypeDefinitionIndex,
    pub type_count: u32,
    pub exported_type_start: TypeDefinitionIndex,
    pub exported_type_count: u32,
    pub entry_point_index: MethodIndex,
    pub token: u32,
    pub custom_attribute_start: i32,
    pub custom_attribute_count: i32,
}

impl Record for ImageRecord {
    const SIZE: usize = 40;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<ImageRecord, std::io::Error> {
        Ok(ImageRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            assembly_index: AssemblyIndex(buffer.read_u32::<LittleEndian>()?),
            type_start: TypeDefinitionIndex(buffer.read_u32::<LittleEndian>()?),
            type_count: buffer.read_u32::<LittleEndian>()?,
            exported_type_start: TypeDefinitionIndex(buffer.read_u32::<LittleEndian>()?),
            exported_type_count: buffer.read_u32::<LittleEndian>()?,
            entry_point_index: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            token: buffer.read_u32::<LittleEndian>()?,
            custom_attribute_start: buffer.read_i32::<LittleEndian>()?,
            custom_attribute_count: buffer.read_i32::<LittleEndian>()?,
        })
    }
}

/// # Type-definition record
///
/// Columns:
/// * `name_index`, `namespace_index` (indices into the string pool)
/// * `byval_type_index`, `byref_type_index`, `declaring_type_index`,
///   `parent_index`, `element_type_index` (indices into the type table)
/// * `generic_container_index`
/// * `flags` (the type attributes bitmask)
/// * eight range starts: fields, methods, events, properties, nested types,
///   interfaces, vtable slots, interface offsets
/// * eight `u16` range lengths in a different order: methods, properties,
///   fields, events, nested types, vtable slots, interfaces, interface
///   offsets
/// * `bitfield` (packed layout/semantics flags)
/// * `token` (the metadata token, `0x02` tag)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeRecord {
    pub name_index: StringIndex,
    pub namespace_index: StringIndex,
    pub byval_type_index: TypeIndex,
    pub byref_type_index: TypeIndex,
    pub declaring_type_index: TypeIndex,
    pub parent_index: TypeIndex,
    pub element_type_index: TypeIndex,
    pub generic_container_index: GenericContainerIndex,
    pub flags: u32,
    pub field_start: FieldIndex,
    pub method_start: MethodIndex,
    pub event_start: EventIndex,
    pub property_start: PropertyIndex,
    pub nested_types_start: NestedTypeIndex,
    pub interfaces_start: InterfacesIndex,
    pub vtable_start: VTableIndex,
    pub interface_offsets_start: InterfaceOffsetIndex,
    pub method_count: u16,
    pub property_count: u16,
    pub field_count: u16,
    pub event_count: u16,
    pub nested_type_count: u16,
    pub vtable_count: u16,
    pub interfaces_count: u16,
    pub interface_offsets_count: u16,
    pub bitfield: u32,
    pub token: u32,
}

impl Record for TypeRecord {
    const SIZE: usize = 92;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<TypeRecord, std::io::Error> {
        Ok(TypeRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            namespace_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            byval_type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            byref_type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            declaring_type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            parent_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            element_type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            generic_container_index: GenericContainerIndex(buffer.read_u32::<LittleEndian>()?),
            flags: buffer.read_u32::<LittleEndian>()?,
            field_start: FieldIndex(buffer.read_u32::<LittleEndian>()?),
            method_start: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            event_start: EventIndex(buffer.read_u32::<LittleEndian>()?),
            property_start: PropertyIndex(buffer.read_u32::<LittleEndian>()?),
            nested_types_start: NestedTypeIndex(buffer.read_u32::<LittleEndian>()?),
            interfaces_start: InterfacesIndex(buffer.read_u32::<LittleEndian>()?),
            vtable_start: VTableIndex(buffer.read_u32::<LittleEndian>()?),
            interface_offsets_start: InterfaceOffsetIndex(buffer.read_u32::<LittleEndian>()?),
            method_count: buffer.read_u16::<LittleEndian>()?,
            property_count: buffer.read_u16::<LittleEndian>()?,
            field_count: buffer.read_u16::<LittleEndian>()?,
            event_count: buffer.read_u16::<LittleEndian>()?,
            nested_type_count: buffer.read_u16::<LittleEndian>()?,
            vtable_count: buffer.read_u16::<LittleEndian>()?,
            interfaces_count: buffer.read_u16::<LittleEndian>()?,
            interface_offsets_count: buffer.read_u16::<LittleEndian>()?,
            bitfield: buffer.read_u32::<LittleEndian>()?,
            token: buffer.read_u32::<LittleEndian>()?,
        })
    }
}

/// # Method record
///
/// Columns: `name_index`, `declaring_type`, `return_type`,
/// `parameter_start`, `generic_container_index`, `token` (`0x06` tag), then
/// four `u16` fields: `flags`, `iflags`, `slot`, `parameter_count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MethodRecord {
    pub name_index: StringIndex,
    pub declaring_type: TypeDefinitionIndex,
    pub return_type: TypeIndex,
    pub parameter_start: ParameterIndex,
    pub generic_container_index: GenericContainerIndex,
    pub token: u32,
    pub flags: u16,
    pub iflags: u16,
    pub slot: u16,
    pub parameter_count: u16,
}

impl Record for MethodRecord {
    const SIZE: usize = 32;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<MethodRecord, std::io::Error> {
        Ok(MethodRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            declaring_type: TypeDefinitionIndex(buffer.read_u32::<LittleEndian>()?),
            return_type: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            parameter_start: ParameterIndex(buffer.read_u32::<LittleEndian>()?),
            generic_container_index: GenericContainerIndex(buffer.read_u32::<LittleEndian>()?),
            token: buffer.read_u32::<LittleEndian>()?,
            flags: buffer.read_u16::<LittleEndian>()?,
            iflags: buffer.read_u16::<LittleEndian>()?,
            slot: buffer.read_u16::<LittleEndian>()?,
            parameter_count: buffer.read_u16::<LittleEndian>()?,
        })
    }
}

/// # Field record
///
/// Columns: `name_index`, `declaring_type`, `type_index`, `token` (`0x04` tag).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRecord {
    pub name_index: StringIndex,
    pub declaring_type: TypeDefinitionIndex,
    pub type_index: TypeIndex,
    pub token: u32,
}

impl Record for FieldRecord {
    const SIZE: usize = 16;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<FieldRecord, std::io::Error> {
        Ok(FieldRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            declaring_type: TypeDefinitionIndex(buffer.read_u32::<LittleEndian>()?),
            type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
            token: buffer.read_u32::<LittleEndian>()?,
        })
    }
}

/// # Property record
///
/// Columns: `name_index`, getter and setter method indices, `attrs`,
/// `token` (`0x07` tag).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyRecord {
    pub name_index: StringIndex,
    pub get: MethodIndex,
    pub set: MethodIndex,
    pub attrs: u32,
    pub token: u32,
}

impl Record for PropertyRecord {
    const SIZE: usize = 20;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<PropertyRecord, std::io::Error> {
        Ok(PropertyRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            get: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            set: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            attrs: buffer.read_u32::<LittleEndian>()?,
            token: buffer.read_u32::<LittleEndian>()?,
        })
    }
}

/// # Event record
///
/// Columns: `name_index`, `declaring_type`, add/remove/raise method
/// indices, `token`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventRecord {
    pub name_index: StringIndex,
    pub declaring_type: TypeDefinitionIndex,
    pub add: MethodIndex,
    pub remove: MethodIndex,
    pub raise: MethodIndex,
    pub token: u32,
}

impl Record for EventRecord {
    const SIZE: usize = 24;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<EventRecord, std::io::Error> {
        Ok(EventRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            declaring_type: TypeDefinitionIndex(buffer.read_u32::<LittleEndian>()?),
            add: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            remove: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            raise: MethodIndex(buffer.read_u32::<LittleEndian>()?),
            token: buffer.read_u32::<LittleEndian>()?,
        })
    }
}

/// # Parameter record
///
/// Columns: `name_index`, `token`, `type_index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterRecord {
    pub name_index: StringIndex,
    pub token: u32,
    pub type_index: TypeIndex,
}

impl Record for ParameterRecord {
    const SIZE: usize = 12;

    fn read_from(buffer: &mut Buffer<'_>) -> Result<ParameterRecord, std::io::Error> {
        Ok(ParameterRecord {
            name_index: StringIndex(buffer.read_u32::<LittleEndian>()?),
            token: buffer.read_u32::<LittleEndian>()?,
            type_index: TypeIndex(buffer.read_u32::<LittleEndian>()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    #[test]
    fn method_record_round_trip() {
        let mut bytes = Vec::new();
        for value in [3u32, 7, 0xFFFF_FFFF, 0, 0xFFFF_FFFF, 0x0600_0002] {
            bytes.write_u32::<LittleEndian>(value).unwrap();
        }
        for value in [0x0086u16, 0x01C0, 5, 2] {
            bytes.write_u16::<LittleEndian>(value).unwrap();
        }
        assert_eq!(bytes.len(), MethodRecord::SIZE);

        let record = MethodRecord::read_from(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(record.name_index, StringIndex(3));
        assert_eq!(record.declaring_type, TypeDefinitionIndex(7));
        assert!(!record.return_type.is_valid());
        assert_eq!(record.parameter_start, ParameterIndex(0));
        assert_eq!(record.token, 0x0600_0002);
        assert_eq!(record.flags, 0x0086);
        assert_eq!(record.iflags, 0x01C0);
        assert_eq!(record.slot, 5);
        assert_eq!(record.parameter_count, 2);
    }

    #[test]
    fn type_record_counts_follow_the_range_starts() {
        let mut bytes = Vec::new();
        // name, namespace, five type links, generic container, flags.
        for value in [1u32, 2, 3, 4, 5, 6, 7, 8, 0x10_0001] {
            bytes.write_u32::<LittleEndian>(value).unwrap();
        }
        // Range starts: fields, methods, events, properties, nested,
        // interfaces, vtable, interface offsets.
        for value in [10u32, 20, 30, 40, 50, 60, 70, 80] {
            bytes.write_u32::<LittleEndian>(value).unwrap();
        }
        // Counts: methods, properties, fields, events, nested, vtable,
        // interfaces, interface offsets.
        for value in [2u16, 3, 4, 5, 6, 7, 8, 9] {
            bytes.write_u16::<LittleEndian>(value).unwrap();
        }
        bytes.write_u32::<LittleEndian>(0xAA).unwrap();
        bytes.write_u32::<LittleEndian>(0x0200_0001).unwrap();
        assert_eq!(bytes.len(), TypeRecord::SIZE);

        let record = TypeRecord::read_from(&mut Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(record.parent_index, TypeIndex(6));
        assert_eq!(record.flags, 0x10_0001);
        assert_eq!(record.field_start, FieldIndex(10));
        assert_eq!(record.method_start, MethodIndex(20));
        assert_eq!(record.method_count, 2);
        assert_eq!(record.field_count, 4);
        assert_eq!(record.bitfield, 0xAA);
        assert_eq!(record.token, 0x0200_0001);
    }

    #[test]
    fn record_sizes_match_the_serialized_layout() {
        assert_eq!(ImageRecord::SIZE, 40);
        assert_eq!(TypeRecord::SIZE, 92);
        assert_eq!(MethodRecord::SIZE, 32);
        assert_eq!(FieldRecord::SIZE, 16);
        assert_eq!(PropertyRecord::SIZE, 20);
        assert_eq!(EventRecord::SIZE, 24);
        assert_eq!(ParameterRecord::SIZE, 12);
    }
}
