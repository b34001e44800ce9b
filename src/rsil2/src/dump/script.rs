use std::io::{self, Write};

use serde::Serialize;

use crate::metadata::{MetadataLoader, MethodIndex, TypeDefinitionIndex};

/// Top-level shape of `script.json`.
#[derive(Debug, Serialize)]
struct ScriptIndex {
    metadata: ScriptMetadata,
    types: Vec<ScriptType>,
    methods: Vec<ScriptMethod>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptMetadata {
    version: i32,
    sanity: i32,
    string_count: i32,
    type_definitions_count: i32,
    methods_count: i32,
    images_offset: i32,
    type_definitions_offset: i32,
    methods_offset: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptType {
    index: u32,
    name: String,
    namespace: String,
    flags: u32,
    method_count: u16,
    offset: usize,
    offset_hex: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptMethod {
    index: u32,
    name: String,
    token: u32,
    flags: u16,
    offset: usize,
    offset_hex: String,
}

/// Writes the machine-readable index: a `metadata` block mirroring the
/// header, plus `types` and `methods` arrays with names resolved through
/// the override chain. `limit` caps both arrays; `None` emits everything.
/// Rows that fail to decode are skipped.
pub fn write_script_json<W: Write>(
    loader: &MetadataLoader,
    out: &mut W,
    limit: Option<usize>,
) -> io::Result<()> {
    let Some(metadata) = loader.metadata() else {
        return Ok(());
    };
    let header = metadata.header();

    let type_total = header.type_definitions_count.max(0) as usize;
    let type_count = limit.map_or(type_total, |n| type_total.min(n));
    let mut types = Vec::with_capacity(type_count);
    for i in 0..type_count as u32 {
        let index = TypeDefinitionIndex(i);
        let Some(record) = metadata.type_definition(index) else {
            continue;
        };
        let offset = metadata.type_definition_offset(index);
        types.push(ScriptType {
            index: i,
            name: loader.type_display_name(index, &record),
            namespace: loader.namespace_display_name(&record),
            flags: record.flags,
            method_count: record.method_count,
            offset,
            offset_hex: format!("0x{offset:x}"),
        });
    }

    let method_total = header.methods_count.max(0) as usize;
    let method_count = limit.map_or(method_total, |n| method_total.min(n));
    let mut methods = Vec::with_capacity(method_count);
    for i in 0..method_count as u32 {
        let index = MethodIndex(i);
        let Some(record) = metadata.method(index) else {
            continue;
        };
        let offset = metadata.method_offset(index);
        methods.push(ScriptMethod {
            index: i,
            name: loader.method_display_name(index, &record),
            token: record.token,
            flags: record.flags,
            offset,
            offset_hex: format!("0x{offset:x}"),
        });
    }

    let index = ScriptIndex {
        metadata: ScriptMetadata {
            version: header.version,
            sanity: header.sanity,
            string_count: header.string_count,
            type_definitions_count: header.type_definitions_count,
            methods_count: header.methods_count,
            images_offset: header.images_offset,
            type_definitions_offset: header.type_definitions_offset,
            methods_offset: header.methods_offset,
        },
        types,
        methods,
    };

    serde_json::to_writer_pretty(&mut *out, &index)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MetadataBuilder;
    use serde_json::Value;

    fn render(loader: &MetadataLoader, limit: Option<usize>) -> Value {
        let mut out = Vec::new();
        write_script_json(loader, &mut out, limit).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn minimal_blob_produces_one_type_entry() {
        let mut builder = MetadataBuilder::new();
        let type_name = builder.add_string("Foo");
        let namespace = builder.add_string("");
        builder.add_type(type_name, namespace);

        let loader = builder.build_loader();
        let json = render(&loader, Some(10));

        assert_eq!(json["metadata"]["version"], 24);
        assert_eq!(json["metadata"]["typeDefinitionsCount"], 1);
        let types = json["types"].as_array().unwrap();
        assert_eq!(types.len(), 1);
        assert_eq!(types[0]["name"], "Foo");
        assert_eq!(types[0]["namespace"], "");
        assert_eq!(types[0]["index"], 0);
        let offset = types[0]["offset"].as_u64().unwrap();
        assert_eq!(
            types[0]["offsetHex"].as_str().unwrap(),
            format!("0x{offset:x}")
        );
    }

    #[test]
    fn limit_caps_both_arrays() {
        let mut builder = MetadataBuilder::new();
        let namespace = builder.add_string("");
        for i in 0..12 {
            let name = builder.add_string(&format!("T{i}"));
            builder.add_type(name, namespace);
            builder.add_method(name, i);
        }

        let loader = builder.build_loader();
        let json = render(&loader, Some(10));
        assert_eq!(json["types"].as_array().unwrap().len(), 10);
        assert_eq!(json["methods"].as_array().unwrap().len(), 10);

        let unlimited = render(&loader, None);
        assert_eq!(unlimited["types"].as_array().unwrap().len(), 12);
        assert_eq!(unlimited["methods"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn five_types_emit_exactly_five_entries() {
        let mut builder = MetadataBuilder::new();
        let namespace = builder.add_string("");
        for i in 0..5 {
            let name = builder.add_string(&format!("E{i}"));
            builder.add_type(name, namespace);
        }

        let loader = builder.build_loader();
        let json = render(&loader, Some(10));
        let types = json["types"].as_array().unwrap();
        assert_eq!(types.len(), 5);
        assert_eq!(types[4]["index"], 4);
    }

    #[test]
    fn method_entries_carry_token_and_flags() {
        let mut builder = MetadataBuilder::new();
        let name = builder.add_string("Run");
        builder.add_method(name, 0);

        let loader = builder.build_loader();
        let json = render(&loader, Some(10));
        let methods = json["methods"].as_array().unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0]["name"], "Run");
        assert_eq!(methods[0]["token"], 0x0600_0000u32);
    }
}
