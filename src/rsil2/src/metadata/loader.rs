use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use paste::paste;

use crate::dump;
use crate::error::LoadError;
use crate::recovery::{DeobfuscationResult, Overrides, Profile};
use crate::scan;
use crate::vlog::VerboseLog;

use super::*;

/// A parsed metadata blob: the raw bytes plus the validated header.
///
/// The buffer is immutable after load. Every record and string lookup
/// borrows from it and rechecks bounds on access, so a single corrupt
/// index degrades to an absent record instead of aborting the whole dump.
pub struct GlobalMetadata {
    pub(crate) data: Vec<u8>,
    header: GlobalMetadataHeader,
}

macro_rules! define_table_accessor {
    ($(#[$doc:meta])* $fn_name:ident, $table:ident, $index:ty, $record:ty) => {
        paste! {
            $(#[$doc])*
            pub fn $fn_name(&self, index: $index) -> Option<$record> {
                self.record::<$record>(
                    self.header.[<$table _offset>],
                    self.header.[<$table _count>],
                    index.0,
                )
            }

            /// File offset of the indexed row, computed whether or not the
            /// row itself decodes.
            pub fn [<$fn_name _offset>](&self, index: $index) -> usize {
                self.header.[<$table _offset>] as u32 as usize
                    + index.0 as usize * <$record as Record>::SIZE
            }
        }
    };
}

impl GlobalMetadata {
    /// Validates the header and adopts the buffer.
    pub fn parse(data: Vec<u8>) -> Result<GlobalMetadata, LoadError> {
        let header = GlobalMetadataHeader::read(&data)?;
        Ok(GlobalMetadata { data, header })
    }

    pub fn header(&self) -> &GlobalMetadataHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    define_table_accessor!(
        /// Looks up a type-definition row. `None` when the index is out of
        /// range or the row falls outside the buffer.
        type_definition,
        type_definitions,
        TypeDefinitionIndex,
        TypeRecord
    );
    define_table_accessor!(
        /// Looks up a method row.
        method,
        methods,
        MethodIndex,
        MethodRecord
    );
    define_table_accessor!(
        /// Looks up a field row.
        field,
        fields,
        FieldIndex,
        FieldRecord
    );
    define_table_accessor!(
        /// Looks up a property row.
        property,
        properties,
        PropertyIndex,
        PropertyRecord
    );
    define_table_accessor!(
        /// Looks up an event row.
        event,
        events,
        EventIndex,
        EventRecord
    );
    define_table_accessor!(
        /// Looks up a parameter row.
        parameter,
        parameters,
        ParameterIndex,
        ParameterRecord
    );
    define_table_accessor!(
        /// Looks up an image row.
        image,
        images,
        ImageIndex,
        ImageRecord
    );

    fn record<R: Record>(&self, offset: i32, count: i32, index: u32) -> Option<R> {
        if index >= count as u32 {
            return None;
        }
        let table_start = offset as u32 as usize;
        if table_start >= self.data.len() {
            return None;
        }
        let start = table_start + index as usize * R::SIZE;
        let end = start.checked_add(R::SIZE)?;
        if end > self.data.len() {
            return None;
        }
        R::read_from(&mut Cursor::new(&self.data[start..end])).ok()
    }
}

/// Owns the metadata buffer, the optional companion library image, the
/// obfuscation profiles and the two override maps.
///
/// Analysis runs in fixed phases: load, detection, string decryption,
/// symbol recovery, emission. The override maps are the only mutable state
/// once the file is loaded.
pub struct MetadataLoader {
    metadata: Option<GlobalMetadata>,
    lib_data: Vec<u8>,
    profiles: Vec<Profile>,
    overrides: Overrides,
    is_obfuscated: bool,
    vlog: VerboseLog,
}

impl MetadataLoader {
    pub fn new() -> MetadataLoader {
        MetadataLoader {
            metadata: None,
            lib_data: Vec::new(),
            profiles: Profile::all(),
            overrides: Overrides::default(),
            is_obfuscated: false,
            vlog: VerboseLog::new(),
        }
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        self.vlog
            .line(format!("[*] Loading metadata file: {}", path.display()));
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(source) => {
                self.vlog.line("[-] Failed to open metadata file");
                return Err(LoadError::FileUnreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        self.load_bytes(data)
    }

    /// Validates and adopts an in-memory blob; the entry point for callers
    /// that already hold the bytes.
    pub fn load_bytes(&mut self, data: Vec<u8>) -> Result<(), LoadError> {
        match GlobalMetadata::parse(data) {
            Ok(metadata) => {
                let header = metadata.header();
                self.vlog.line(format!(
                    "[+] Metadata loaded successfully. Version: {}",
                    header.version
                ));
                self.vlog.line(format!(
                    "[+] String count: {}, Type count: {}",
                    header.string_count, header.type_definitions_count
                ));
                self.vlog.line(format!(
                    "[+] Method count: {}, Field count: {}",
                    header.methods_count, header.fields_count
                ));
                self.metadata = Some(metadata);
                Ok(())
            }
            Err(error) => {
                self.vlog.line(format!("[-] {error}"));
                Err(error)
            }
        }
    }

    /// Reads the companion native library verbatim. Only the informational
    /// scans consume it; its absence never changes the emitted artifacts.
    pub fn load_library(&mut self, path: &Path) -> Result<(), LoadError> {
        self.vlog
            .line(format!("[*] Loading library: {}", path.display()));
        match fs::read(path) {
            Ok(data) => {
                self.lib_data = data;
                Ok(())
            }
            Err(source) => {
                self.vlog.line("[-] Failed to open library file");
                Err(LoadError::FileUnreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }

    pub fn metadata(&self) -> Option<&GlobalMetadata> {
        self.metadata.as_ref()
    }

    pub fn is_obfuscated(&self) -> bool {
        self.is_obfuscated
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Hands back everything logged so far; the caller decides where it
    /// goes.
    pub fn drain_log(&mut self) -> String {
        self.vlog.drain()
    }

    #[cfg(test)]
    pub(crate) fn log(&self) -> &VerboseLog {
        &self.vlog
    }

    /// Runs every profile's detector over the table samples and latches
    /// the obfuscation flag.
    pub fn detect_obfuscation(&mut self) {
        self.vlog.line("[*] Detecting obfuscation patterns...");
        let Some(metadata) = &self.metadata else {
            return;
        };

        for profile in &self.profiles {
            if profile.detect(metadata) {
                self.vlog.line(format!("[+] Detected: {}", profile.name()));
                self.is_obfuscated = true;
            }
        }

        if !self.is_obfuscated {
            self.vlog.line("[*] No known obfuscation detected");
        }
    }

    /// Applies every triggered profile once. A failing action is reported
    /// through the result; overrides collected before the failure stay in
    /// place.
    pub fn apply_deobfuscation(&mut self) -> DeobfuscationResult {
        if !self.is_obfuscated {
            self.vlog.line("[*] No obfuscation to deobfuscate");
            return DeobfuscationResult::succeeded();
        }

        self.vlog.line("[*] Applying deobfuscation...");
        let Some(metadata) = &self.metadata else {
            return DeobfuscationResult::succeeded();
        };

        let profiles = self.profiles.clone();
        for profile in profiles {
            if !profile.detect(metadata) {
                continue;
            }
            self.vlog.line(format!("[+] Applying: {}", profile.name()));
            if let Err(error) = profile.apply(metadata, &mut self.overrides, &mut self.vlog) {
                self.vlog.line(format!("[-] Deobfuscation failed: {error}"));
                return DeobfuscationResult::failed(error.to_string());
            }
        }

        self.vlog.line("[+] Deobfuscation completed successfully");
        DeobfuscationResult::succeeded()
    }

    /// Decrypted override for a string index, falling back to the raw
    /// resolved string.
    pub fn best_string(&self, index: StringIndex) -> String {
        if let Some(decrypted) = self.overrides.strings.get(&index) {
            return decrypted.clone();
        }
        match &self.metadata {
            Some(metadata) => metadata.string(index).to_string(),
            None => String::new(),
        }
    }

    pub fn recovered_symbol(&self, token: MetadataToken) -> Option<&str> {
        self.overrides.symbols.get(&token).map(String::as_str)
    }

    pub fn type_display_name(&self, index: TypeDefinitionIndex, record: &TypeRecord) -> String {
        if let Some(symbol) = self.recovered_symbol(MetadataToken::type_def(index.0)) {
            return symbol.to_string();
        }
        let name = self.best_string(record.name_index);
        if name.is_empty() {
            format!("Type_{}", index.0)
        } else {
            name
        }
    }

    /// Namespaces keep their raw form; an empty namespace stays empty.
    pub fn namespace_display_name(&self, record: &TypeRecord) -> String {
        self.best_string(record.namespace_index)
    }

    pub fn method_display_name(&self, index: MethodIndex, record: &MethodRecord) -> String {
        if let Some(symbol) = self.recovered_symbol(MetadataToken::method(index.0)) {
            return symbol.to_string();
        }
        let name = self.best_string(record.name_index);
        if name.is_empty() {
            format!("Method_{}", index.0)
        } else {
            name
        }
    }

    pub fn field_display_name(&self, index: FieldIndex, record: &FieldRecord) -> String {
        if let Some(symbol) = self.recovered_symbol(MetadataToken::field(index.0)) {
            return symbol.to_string();
        }
        let name = self.best_string(record.name_index);
        if name.is_empty() {
            format!("Field_{}", index.0)
        } else {
            name
        }
    }

    pub fn image_display_name(&self, index: ImageIndex, record: &ImageRecord) -> String {
        let name = self.best_string(record.name_index);
        if name.is_empty() {
            format!("Image_{}", index.0)
        } else {
            name
        }
    }

    /// Runs the informational fingerprint scans over the companion
    /// library. Findings only reach the verbose log.
    pub fn analyze_library(&mut self) {
        if self.lib_data.is_empty() {
            self.vlog
                .line("[!] No library loaded for control flow analysis");
            return;
        }

        self.vlog.line("[*] Starting control flow restoration...");
        scan::find_dispatcher_patterns(&self.lib_data, &mut self.vlog);
        scan::find_switch_obfuscation(&self.lib_data, &mut self.vlog);
        scan::find_junk_code(&self.lib_data, &mut self.vlog);
        self.vlog.line("[+] Control flow restoration completed");

        self.vlog
            .line("[*] Analyzing binary for additional symbols...");
        scan::find_embedded_symbols(&self.lib_data, &mut self.vlog);
        self.vlog
            .line("[*] Cross-referencing symbols with binary data...");
        scan::cross_reference_symbols(&self.lib_data, &self.overrides, &mut self.vlog);
        self.vlog.line("[+] Binary analysis completed");
    }

    /// Emits `dump.cs` and `script.json` into the working directory. The
    /// limited mode caps tables at ten rows to keep output bounded on huge
    /// files; `full` renders every declaration instead.
    pub fn process(&mut self, full: bool) {
        self.vlog.line("[*] Starting basic metadata processing...");
        if self.metadata.is_none() {
            return;
        }

        let result = if full {
            self.vlog.line("[*] Generating full declaration output...");
            self.emit_artifacts(None)
        } else {
            self.vlog
                .line("[*] Generating limited output for stability...");
            self.emit_artifacts(Some(10))
        };

        match result {
            Ok(()) => self.vlog.line("[+] Metadata processing completed"),
            Err(error) => self
                .vlog
                .line(format!("[-] Failed to write output: {error}")),
        }
    }

    fn emit_artifacts(&self, limit: Option<usize>) -> io::Result<()> {
        let mut cs = BufWriter::new(File::create("dump.cs")?);
        match limit {
            Some(max_elements) => dump::write_pseudo_source(self, &mut cs, max_elements)?,
            None => dump::write_declarations(self, &mut cs)?,
        }
        cs.flush()?;

        let mut json = BufWriter::new(File::create("script.json")?);
        dump::write_script_json(self, &mut json, limit)?;
        json.flush()?;

        Ok(())
    }

    /// Writes `deobfuscation_report.txt` into the working directory.
    pub fn generate_report(&mut self) {
        let result = File::create("deobfuscation_report.txt")
            .and_then(|file| {
                let mut out = BufWriter::new(file);
                dump::write_report(self, &mut out)?;
                out.flush()
            });
        if let Err(error) = result {
            self.vlog
                .line(format!("[-] Failed to write deobfuscation report: {error}"));
        }
    }
}

impl Default for MetadataLoader {
    fn default() -> Self {
        MetadataLoader::new()
    }
}
