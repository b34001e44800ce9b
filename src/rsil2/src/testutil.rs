//! Shared builder for synthetic metadata blobs used across the test
//! modules. Tables are laid out behind the header in a fixed order:
//! string offset table, string data, type definitions, methods, fields,
//! properties, images.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::metadata::{GlobalMetadata, GlobalMetadataHeader, MetadataLoader, HEADER_SIZE};

const INVALID: u32 = 0xFFFF_FFFF;

pub(crate) struct MetadataBuilder {
    pub sanity: u32,
    pub version: i32,
    strings: Vec<Vec<u8>>,
    types: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    fields: Vec<Vec<u8>>,
    properties: Vec<Vec<u8>>,
    images: Vec<Vec<u8>>,
}

impl MetadataBuilder {
    pub fn new() -> MetadataBuilder {
        MetadataBuilder {
            sanity: 0xFAB1_1BAF,
            version: 24,
            strings: Vec::new(),
            types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Adds a pool entry and returns its string index.
    pub fn add_string(&mut self, text: &str) -> u32 {
        self.add_raw_string(text.as_bytes())
    }

    /// Adds a pool entry with arbitrary (NUL-free) bytes.
    pub fn add_raw_string(&mut self, bytes: &[u8]) -> u32 {
        assert!(!bytes.contains(&0), "pool entries are NUL-terminated");
        self.strings.push(bytes.to_vec());
        (self.strings.len() - 1) as u32
    }

    pub fn add_type(&mut self, name: u32, namespace: u32) -> u32 {
        self.add_type_row(name, namespace, INVALID, INVALID, 0, INVALID, 0)
    }

    pub fn add_type_with_parent(&mut self, name: u32, namespace: u32, parent: u32) -> u32 {
        self.add_type_row(name, namespace, parent, INVALID, 0, INVALID, 0)
    }

    pub fn add_type_with_methods(
        &mut self,
        name: u32,
        namespace: u32,
        method_start: u32,
        method_count: u16,
    ) -> u32 {
        self.add_type_row(name, namespace, INVALID, method_start, method_count, INVALID, 0)
    }

    pub fn add_type_full(
        &mut self,
        name: u32,
        namespace: u32,
        method_start: u32,
        method_count: u16,
        field_start: u32,
        field_count: u16,
    ) -> u32 {
        self.add_type_row(
            name,
            namespace,
            INVALID,
            method_start,
            method_count,
            field_start,
            field_count,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn add_type_row(
        &mut self,
        name: u32,
        namespace: u32,
        parent: u32,
        method_start: u32,
        method_count: u16,
        field_start: u32,
        field_count: u16,
    ) -> u32 {
        let index = self.types.len() as u32;
        let mut row = Vec::with_capacity(92);
        row.write_u32::<LittleEndian>(name).unwrap();
        row.write_u32::<LittleEndian>(namespace).unwrap();
        // byval, byref, declaring, parent, element.
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(parent).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        // Generic container, flags.
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        // Range starts: fields, methods, events, properties, nested,
        // interfaces, vtable, interface offsets.
        row.write_u32::<LittleEndian>(field_start).unwrap();
        row.write_u32::<LittleEndian>(method_start).unwrap();
        for _ in 0..6 {
            row.write_u32::<LittleEndian>(INVALID).unwrap();
        }
        // Counts: methods, properties, fields, events, nested, vtable,
        // interfaces, interface offsets.
        row.write_u16::<LittleEndian>(method_count).unwrap();
        row.write_u16::<LittleEndian>(0).unwrap();
        row.write_u16::<LittleEndian>(field_count).unwrap();
        for _ in 0..5 {
            row.write_u16::<LittleEndian>(0).unwrap();
        }
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(0x0200_0000 | index).unwrap();
        assert_eq!(row.len(), 92);
        self.types.push(row);
        index
    }

    pub fn add_method(&mut self, name: u32, declaring_type: u32) -> u32 {
        let index = self.methods.len() as u32;
        let mut row = Vec::with_capacity(32);
        row.write_u32::<LittleEndian>(name).unwrap();
        row.write_u32::<LittleEndian>(declaring_type).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(0x0600_0000 | index).unwrap();
        for _ in 0..4 {
            row.write_u16::<LittleEndian>(0).unwrap();
        }
        assert_eq!(row.len(), 32);
        self.methods.push(row);
        index
    }

    pub fn add_field(&mut self, name: u32, declaring_type: u32) -> u32 {
        let index = self.fields.len() as u32;
        let mut row = Vec::with_capacity(16);
        row.write_u32::<LittleEndian>(name).unwrap();
        row.write_u32::<LittleEndian>(declaring_type).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(0x0400_0000 | index).unwrap();
        self.fields.push(row);
        index
    }

    pub fn add_property(&mut self, name: u32, get: u32, set: u32) -> u32 {
        let index = self.properties.len() as u32;
        let mut row = Vec::with_capacity(20);
        row.write_u32::<LittleEndian>(name).unwrap();
        row.write_u32::<LittleEndian>(get).unwrap();
        row.write_u32::<LittleEndian>(set).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(0x0700_0000 | index).unwrap();
        self.properties.push(row);
        index
    }

    pub fn add_image(&mut self, name: u32, type_start: u32, type_count: u32) -> u32 {
        let index = self.images.len() as u32;
        let mut row = Vec::with_capacity(40);
        row.write_u32::<LittleEndian>(name).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(type_start).unwrap();
        row.write_u32::<LittleEndian>(type_count).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(INVALID).unwrap();
        row.write_u32::<LittleEndian>(index).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        row.write_u32::<LittleEndian>(0).unwrap();
        self.images.push(row);
        index
    }

    /// Assembles the blob. String offsets use the relative convention.
    pub fn build(&self) -> Vec<u8> {
        let mut string_offsets = Vec::with_capacity(self.strings.len());
        let mut string_data = Vec::new();
        for entry in &self.strings {
            string_offsets.push(string_data.len() as i32);
            string_data.extend_from_slice(entry);
            string_data.push(0);
        }

        let string_table_len = self.strings.len() * 4;
        let types_offset = HEADER_SIZE + string_table_len + string_data.len();
        let methods_offset = types_offset + self.types.len() * 92;
        let fields_offset = methods_offset + self.methods.len() * 32;
        let properties_offset = fields_offset + self.fields.len() * 16;
        let images_offset = properties_offset + self.properties.len() * 20;

        let header = GlobalMetadataHeader {
            sanity: self.sanity as i32,
            version: self.version,
            string_offset: HEADER_SIZE as i32,
            string_count: self.strings.len() as i32,
            type_definitions_offset: types_offset as i32,
            type_definitions_count: self.types.len() as i32,
            methods_offset: methods_offset as i32,
            methods_count: self.methods.len() as i32,
            fields_offset: fields_offset as i32,
            fields_count: self.fields.len() as i32,
            properties_offset: properties_offset as i32,
            properties_count: self.properties.len() as i32,
            images_offset: images_offset as i32,
            images_count: self.images.len() as i32,
            ..GlobalMetadataHeader::default()
        };

        let mut out = Vec::new();
        header.write_to(&mut out);
        for offset in string_offsets {
            out.write_i32::<LittleEndian>(offset).unwrap();
        }
        out.extend_from_slice(&string_data);
        for table in [
            &self.types,
            &self.methods,
            &self.fields,
            &self.properties,
            &self.images,
        ] {
            for row in table {
                out.extend_from_slice(row);
            }
        }
        out
    }

    pub fn build_metadata(&self) -> GlobalMetadata {
        GlobalMetadata::parse(self.build()).expect("test blob must parse")
    }

    pub fn build_loader(&self) -> MetadataLoader {
        let mut loader = MetadataLoader::new();
        loader.load_bytes(self.build()).expect("test blob must load");
        loader
    }
}
