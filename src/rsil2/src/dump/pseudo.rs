use std::io::{self, Write};

use crate::metadata::{
    FieldIndex, ImageIndex, MetadataLoader, MetadataToken, MethodIndex, TypeDefinitionIndex,
};

/// Writes the bounded pseudo-source outline: a banner, then per-image,
/// per-type and per-method comment lines carrying indices, file offsets,
/// flags and tokens. `max_elements` caps images and types per image;
/// methods are capped at `max_elements / 100` per type.
///
/// Name lookups prefer recovered symbols, then decrypted strings, then the
/// raw pool, then an index placeholder. Rows that fail to decode are
/// skipped.
pub fn write_pseudo_source<W: Write>(
    loader: &MetadataLoader,
    out: &mut W,
    max_elements: usize,
) -> io::Result<()> {
    let Some(metadata) = loader.metadata() else {
        return Ok(());
    };
    let header = metadata.header();

    writeln!(out, "// IL2CPP Metadata Dump")?;
    writeln!(out, "// Generated by rsil2")?;
    writeln!(out, "// File offset information included")?;
    writeln!(
        out,
        "// Unity Version: {} | Sanity: 0x{:x}",
        header.version, header.sanity as u32
    )?;
    writeln!(
        out,
        "// Total Types: {} | Methods: {}",
        header.type_definitions_count, header.methods_count
    )?;
    writeln!(out)?;

    let type_total = header.type_definitions_count.max(0) as u32;
    let method_total = header.methods_count.max(0) as u32;
    let method_limit = max_elements / 100;

    let image_count = (header.images_count.max(0) as usize).min(max_elements);
    for i in 0..image_count as u32 {
        let image_index = ImageIndex(i);
        let Some(image) = metadata.image(image_index) else {
            continue;
        };

        writeln!(
            out,
            "// Image: {} | Index: {} | Offset: 0x{:x}",
            loader.image_display_name(image_index, &image),
            i,
            metadata.image_offset(image_index)
        )?;
        writeln!(
            out,
            "//   Type Range: [{}, {}] | Count: {}",
            image.type_start.0,
            image.type_start.0 as u64 + image.type_count as u64,
            image.type_count
        )?;

        let type_count = (image.type_count as usize).min(max_elements);
        for t in 0..type_count as u32 {
            let Some(raw_index) = image.type_start.0.checked_add(t) else {
                break;
            };
            if raw_index >= type_total {
                continue;
            }
            let type_index = TypeDefinitionIndex(raw_index);
            let Some(type_record) = metadata.type_definition(type_index) else {
                continue;
            };

            writeln!(
                out,
                "// Type: {}.{} | Index: {} | TypeDef Offset: 0x{:x} | Flags: 0x{:x} | Methods: {}",
                loader.namespace_display_name(&type_record),
                loader.type_display_name(type_index, &type_record),
                raw_index,
                metadata.type_definition_offset(type_index),
                type_record.flags,
                type_record.method_count
            )?;

            let method_count = (type_record.method_count as usize).min(method_limit);
            for m in 0..method_count as u32 {
                let Some(raw_method) = type_record.method_start.0.checked_add(m) else {
                    break;
                };
                if raw_method >= method_total {
                    continue;
                }
                let method_index = MethodIndex(raw_method);
                let Some(method) = metadata.method(method_index) else {
                    continue;
                };

                writeln!(
                    out,
                    "//   Method: {} | Index: {} | MethodDef Offset: 0x{:x} | Token: 0x{:x} | Flags: 0x{:x}",
                    loader.method_display_name(method_index, &method),
                    raw_method,
                    metadata.method_offset(method_index),
                    method.token,
                    method.flags
                )?;
            }

            writeln!(out)?;
        }
        writeln!(out)?;
    }

    Ok(())
}

/// Writes the full declaration rendering: namespace blocks with one class
/// per type and one line per method and field. No row limits.
pub fn write_declarations<W: Write>(loader: &MetadataLoader, out: &mut W) -> io::Result<()> {
    let Some(metadata) = loader.metadata() else {
        return Ok(());
    };
    let header = metadata.header();
    let type_total = header.type_definitions_count.max(0) as u32;
    let method_total = header.methods_count.max(0) as u32;
    let field_total = header.fields_count.max(0) as u32;

    writeln!(out, "// Generated by rsil2")?;
    writeln!(out)?;

    for i in 0..header.images_count.max(0) as u32 {
        let image_index = ImageIndex(i);
        let Some(image) = metadata.image(image_index) else {
            continue;
        };
        writeln!(
            out,
            "// Image: {}",
            loader.image_display_name(image_index, &image)
        )?;
        writeln!(out)?;

        for t in 0..image.type_count {
            let Some(raw_index) = image.type_start.0.checked_add(t) else {
                break;
            };
            if raw_index >= type_total {
                continue;
            }
            let type_index = TypeDefinitionIndex(raw_index);
            let Some(type_record) = metadata.type_definition(type_index) else {
                continue;
            };

            let namespace = loader.namespace_display_name(&type_record);
            if !namespace.is_empty() {
                writeln!(out, "namespace {} {{", namespace)?;
            }
            writeln!(
                out,
                "    // Token: 0x{:08x}",
                MetadataToken::type_def(raw_index).0
            )?;
            writeln!(
                out,
                "    public class {} {{",
                loader.type_display_name(type_index, &type_record)
            )?;

            for m in 0..type_record.method_count as u32 {
                let Some(raw_method) = type_record.method_start.0.checked_add(m) else {
                    break;
                };
                if raw_method >= method_total {
                    continue;
                }
                let method_index = MethodIndex(raw_method);
                let Some(method) = metadata.method(method_index) else {
                    continue;
                };
                writeln!(
                    out,
                    "        public void {}(); // Token: 0x{:x}",
                    loader.method_display_name(method_index, &method),
                    method.token
                )?;
            }

            for f in 0..type_record.field_count as u32 {
                let Some(raw_field) = type_record.field_start.0.checked_add(f) else {
                    break;
                };
                if raw_field >= field_total {
                    continue;
                }
                let field_index = FieldIndex(raw_field);
                let Some(field) = metadata.field(field_index) else {
                    continue;
                };
                writeln!(
                    out,
                    "        public var {}; // Token: 0x{:x}",
                    loader.field_display_name(field_index, &field),
                    field.token
                )?;
            }

            writeln!(out, "    }}")?;
            if !namespace.is_empty() {
                writeln!(out, "}}")?;
            }
            writeln!(out)?;
        }
    }

    Ok(())
}
