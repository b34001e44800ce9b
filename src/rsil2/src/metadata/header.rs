use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::LoadError;

use super::*;

/// Size of the serialized header in bytes: 66 little-endian `i32` fields.
pub const HEADER_SIZE: usize = 264;

/// Accepted values of the `sanity` magic: the standard form, the
/// byte-swapped form, and the legacy variant emitted by old toolchains.
pub const ACCEPTED_SANITY: [u32; 3] = [0xFAB1_1BAF, 0x0B11_BFAF, 0xEAB1_1BAF];

/// Lowest metadata version this reader understands.
pub const MIN_VERSION: i32 = 16;
/// Highest metadata version this reader understands.
pub const MAX_VERSION: i32 = 32;

/// # Global metadata header
///
/// The blob starts with a fixed-size header: a magic, a version, and one
/// `(offset, count)` pair per table. Offsets are absolute file offsets;
/// counts are record counts except for the raw-data regions, where they are
/// byte sizes.
///
/// | Offset | Field                  | Description |
/// | ------ | ---------------------- | ----------- |
/// | 0x00   | `sanity`               | Magic identifying the format, see [`ACCEPTED_SANITY`]. |
/// | 0x04   | `version`              | Format version, `16..=32`. |
/// | 0x08   | `string_literal_*`     | Literal table and its raw data region. |
/// | 0x18   | `string_*`             | Identifier string pool: a table of `string_count` 32-bit offsets followed by NUL-terminated byte runs. |
/// | 0x20.. | per-table pairs        | Events, properties, methods, default values, parameters, fields, generics, nested types, interfaces, vtables, type definitions, images, assemblies and several regions this reader tolerates but never dereferences. |
///
/// A number of the trailing pairs only exist in some versions; they are
/// always present in the serialized form read here and simply hold zero on
/// files that predate them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GlobalMetadataHeader {
    pub sanity: i32,
    pub version: i32,
    pub string_literal_offset: i32,
    pub string_literal_count: i32,
    pub string_literal_data_offset: i32,
    pub string_literal_data_count: i32,
    pub string_offset: i32,
    pub string_count: i32,
    pub events_offset: i32,
    pub events_count: i32,
    pub properties_offset: i32,
    pub properties_count: i32,
    pub methods_offset: i32,
    pub methods_count: i32,
    pub parameter_default_values_offset: i32,
    pub parameter_default_values_count: i32,
    pub field_default_values_offset: i32,
    pub field_default_values_count: i32,
    pub field_and_parameter_default_value_data_offset: i32,
    pub field_and_parameter_default_value_data_count: i32,
    pub field_marshaled_sizes_offset: i32,
    pub field_marshaled_sizes_count: i32,
    pub parameters_offset: i32,
    pub parameters_count: i32,
    pub fields_offset: i32,
    pub fields_count: i32,
    pub generic_parameters_offset: i32,
    pub generic_parameters_count: i32,
    pub generic_parameter_constraints_offset: i32,
    pub generic_parameter_constraints_count: i32,
    pub generic_containers_offset: i32,
    pub generic_containers_count: i32,
    pub nested_types_offset: i32,
    pub nested_types_count: i32,
    pub interfaces_offset: i32,
    pub interfaces_count: i32,
    pub vtable_methods_offset: i32,
    pub vtable_methods_count: i32,
    pub interface_offsets_offset: i32,
    pub interface_offsets_count: i32,
    pub type_definitions_offset: i32,
    pub type_definitions_count: i32,
    pub images_offset: i32,
    pub images_count: i32,
    pub assemblies_offset: i32,
    pub assemblies_count: i32,
    pub metadata_usage_lists_offset: i32,
    pub metadata_usage_lists_count: i32,
    pub metadata_usage_pairs_offset: i32,
    pub metadata_usage_pairs_count: i32,
    pub field_refs_offset: i32,
    pub field_refs_count: i32,
    pub referenced_assemblies_offset: i32,
    pub referenced_assemblies_count: i32,
    pub attributes_info_offset: i32,
    pub attributes_info_count: i32,
    pub attribute_types_offset: i32,
    pub attribute_types_count: i32,
    pub unresolved_virtual_call_parameter_types_offset: i32,
    pub unresolved_virtual_call_parameter_types_count: i32,
    pub unresolved_virtual_call_parameter_ranges_offset: i32,
    pub unresolved_virtual_call_parameter_ranges_count: i32,
    pub windows_runtime_type_names_offset: i32,
    pub windows_runtime_type_names_size: i32,
    pub exported_type_definitions_offset: i32,
    pub exported_type_definitions_count: i32,
}

impl GlobalMetadataHeader {
    /// Parses and validates the header at the start of `data`.
    pub fn read(data: &[u8]) -> Result<GlobalMetadataHeader, LoadError> {
        if data.len() < HEADER_SIZE {
            return Err(LoadError::MalformedHeader);
        }

        let mut buffer = Cursor::new(data);
        let header =
            GlobalMetadataHeader::read_from(&mut buffer).map_err(|_| LoadError::MalformedHeader)?;
        header.validate()?;
        Ok(header)
    }

    fn read_from(buffer: &mut Buffer<'_>) -> Result<GlobalMetadataHeader, std::io::Error> {
        Ok(GlobalMetadataHeader {
            sanity: buffer.read_i32::<LittleEndian>()?,
            version: buffer.read_i32::<LittleEndian>()?,
            string_literal_offset: buffer.read_i32::<LittleEndian>()?,
            string_literal_count: buffer.read_i32::<LittleEndian>()?,
            string_literal_data_offset: buffer.read_i32::<LittleEndian>()?,
            string_literal_data_count: buffer.read_i32::<LittleEndian>()?,
            string_offset: buffer.read_i32::<LittleEndian>()?,
            string_count: buffer.read_i32::<LittleEndian>()?,
            events_offset: buffer.read_i32::<LittleEndian>()?,
            events_count: buffer.read_i32::<LittleEndian>()?,
            properties_offset: buffer.read_i32::<LittleEndian>()?,
            properties_count: buffer.read_i32::<LittleEndian>()?,
            methods_offset: buffer.read_i32::<LittleEndian>()?,
            methods_count: buffer.read_i32::<LittleEndian>()?,
            parameter_default_values_offset: buffer.read_i32::<LittleEndian>()?,
            parameter_default_values_count: buffer.read_i32::<LittleEndian>()?,
            field_default_values_offset: buffer.read_i32::<LittleEndian>()?,
            field_default_values_count: buffer.read_i32::<LittleEndian>()?,
            field_and_parameter_default_value_data_offset: buffer.read_i32::<LittleEndian>()?,
            field_and_parameter_default_value_data_count: buffer.read_i32::<LittleEndian>()?,
            field_marshaled_sizes_offset: buffer.read_i32::<LittleEndian>()?,
            field_marshaled_sizes_count: buffer.read_i32::<LittleEndian>()?,
            parameters_offset: buffer.read_i32::<LittleEndian>()?,
            parameters_count: buffer.read_i32::<LittleEndian>()?,
            fields_offset: buffer.read_i32::<LittleEndian>()?,
            fields_count: buffer.read_i32::<LittleEndian>()?,
            generic_parameters_offset: buffer.read_i32::<LittleEndian>()?,
            generic_parameters_count: buffer.read_i32::<LittleEndian>()?,
            generic_parameter_constraints_offset: buffer.read_i32::<LittleEndian>()?,
            generic_parameter_constraints_count: buffer.read_i32::<LittleEndian>()?,
            generic_containers_offset: buffer.read_i32::<LittleEndian>()?,
            generic_containers_count: buffer.read_i32::<LittleEndian>()?,
            nested_types_offset: buffer.read_i32::<LittleEndian>()?,
            nested_types_count: buffer.read_i32::<LittleEndian>()?,
            interfaces_offset: buffer.read_i32::<LittleEndian>()?,
            interfaces_count: buffer.read_i32::<LittleEndian>()?,
            vtable_methods_offset: buffer.read_i32::<LittleEndian>()?,
            vtable_methods_count: buffer.read_i32::<LittleEndian>()?,
            interface_offsets_offset: buffer.read_i32::<LittleEndian>()?,
            interface_offsets_count: buffer.read_i32::<LittleEndian>()?,
            type_definitions_offset: buffer.read_i32::<LittleEndian>()?,
            type_definitions_count: buffer.read_i32::<LittleEndian>()?,
            images_offset: buffer.read_i32::<LittleEndian>()?,
            images_count: buffer.read_i32::<LittleEndian>()?,
            assemblies_offset: buffer.read_i32::<LittleEndian>()?,
            assemblies_count: buffer.read_i32::<LittleEndian>()?,
            metadata_usage_lists_offset: buffer.read_i32::<LittleEndian>()?,
            metadata_usage_lists_count: buffer.read_i32::<LittleEndian>()?,
            metadata_usage_pairs_offset: buffer.read_i32::<LittleEndian>()?,
            metadata_usage_pairs_count: buffer.read_i32::<LittleEndian>()?,
            field_refs_offset: buffer.read_i32::<LittleEndian>()?,
            field_refs_count: buffer.read_i32::<LittleEndian>()?,
            referenced_assemblies_offset: buffer.read_i32::<LittleEndian>()?,
            referenced_assemblies_count: buffer.read_i32::<LittleEndian>()?,
            attributes_info_offset: buffer.read_i32::<LittleEndian>()?,
            attributes_info_count: buffer.read_i32::<LittleEndian>()?,
            attribute_types_offset: buffer.read_i32::<LittleEndian>()?,
            attribute_types_count: buffer.read_i32::<LittleEndian>()?,
            unresolved_virtual_call_parameter_types_offset: buffer.read_i32::<LittleEndian>()?,
            unresolved_virtual_call_parameter_types_count: buffer.read_i32::<LittleEndian>()?,
            unresolved_virtual_call_parameter_ranges_offset: buffer.read_i32::<LittleEndian>()?,
            unresolved_virtual_call_parameter_ranges_count: buffer.read_i32::<LittleEndian>()?,
            windows_runtime_type_names_offset: buffer.read_i32::<LittleEndian>()?,
            windows_runtime_type_names_size: buffer.read_i32::<LittleEndian>()?,
            exported_type_definitions_offset: buffer.read_i32::<LittleEndian>()?,
            exported_type_definitions_count: buffer.read_i32::<LittleEndian>()?,
        })
    }

    fn validate(&self) -> Result<(), LoadError> {
        if !ACCEPTED_SANITY.contains(&(self.sanity as u32)) {
            return Err(LoadError::BadMagic(self.sanity as u32));
        }
        if self.version < MIN_VERSION || self.version > MAX_VERSION {
            return Err(LoadError::UnsupportedVersion(self.version));
        }

        // Large titles ship pools in the tens of millions; anything past
        // these limits is a corrupt or hostile file, not a big game.
        if self.string_count as u32 > 100_000_000 {
            return Err(LoadError::ImplausibleCounts {
                what: "string",
                count: self.string_count,
            });
        }
        if self.type_definitions_count as u32 > 20_000_000 {
            return Err(LoadError::ImplausibleCounts {
                what: "type definition",
                count: self.type_definitions_count,
            });
        }
        if self.methods_count as u32 > 100_000_000 {
            return Err(LoadError::ImplausibleCounts {
                what: "method",
                count: self.methods_count,
            });
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        use byteorder::WriteBytesExt;

        let fields = [
            self.sanity,
            self.version,
            self.string_literal_offset,
            self.string_literal_count,
            self.string_literal_data_offset,
            self.string_literal_data_count,
            self.string_offset,
            self.string_count,
            self.events_offset,
            self.events_count,
            self.properties_offset,
            self.properties_count,
            self.methods_offset,
            self.methods_count,
            self.parameter_default_values_offset,
            self.parameter_default_values_count,
            self.field_default_values_offset,
            self.field_default_values_count,
            self.field_and_parameter_default_value_data_offset,
            self.field_and_parameter_default_value_data_count,
            self.field_marshaled_sizes_offset,
            self.field_marshaled_sizes_count,
            self.parameters_offset,
            self.parameters_count,
            self.fields_offset,
            self.fields_count,
            self.generic_parameters_offset,
            self.generic_parameters_count,
            self.generic_parameter_constraints_offset,
            self.generic_parameter_constraints_count,
            self.generic_containers_offset,
            self.generic_containers_count,
            self.nested_types_offset,
            self.nested_types_count,
            self.interfaces_offset,
            self.interfaces_count,
            self.vtable_methods_offset,
            self.vtable_methods_count,
            self.interface_offsets_offset,
            self.interface_offsets_count,
            self.type_definitions_offset,
            self.type_definitions_count,
            self.images_offset,
            self.images_count,
            self.assemblies_offset,
            self.assemblies_count,
            self.metadata_usage_lists_offset,
            self.metadata_usage_lists_count,
            self.metadata_usage_pairs_offset,
            self.metadata_usage_pairs_count,
            self.field_refs_offset,
            self.field_refs_count,
            self.referenced_assemblies_offset,
            self.referenced_assemblies_count,
            self.attributes_info_offset,
            self.attributes_info_count,
            self.attribute_types_offset,
            self.attribute_types_count,
            self.unresolved_virtual_call_parameter_types_offset,
            self.unresolved_virtual_call_parameter_types_count,
            self.unresolved_virtual_call_parameter_ranges_offset,
            self.unresolved_virtual_call_parameter_ranges_count,
            self.windows_runtime_type_names_offset,
            self.windows_runtime_type_names_size,
            self.exported_type_definitions_offset,
            self.exported_type_definitions_count,
        ];
        for field in fields {
            out.write_i32::<LittleEndian>(field).unwrap();
        }
    }
}
