use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use rsil2::{MetadataLoader, StringIndex};

/// Dumper and deobfuscation analyzer for IL2CPP global metadata.
#[derive(Parser, Debug)]
#[command(name = "rsil2")]
#[command(about = "IL2CPP metadata dumper and deobfuscator", long_about = None)]
struct Cli {
    /// Path to the global-metadata.dat file
    metadata: PathBuf,

    /// Optional companion native library (e.g. libil2cpp.so)
    library: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,

    /// Emit the full declaration dump instead of the bounded outline
    #[arg(long)]
    full: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level)
        .init();

    let mut loader = MetadataLoader::new();

    if let Some(library) = &cli.library {
        log::info!("Library: {}", library.display());
        if loader.load_library(library).is_err() {
            log::warn!("Failed to load library, continuing without binary analysis");
        }
    }

    log::info!("Target: {}", cli.metadata.display());
    if let Err(error) = loader.load_file(&cli.metadata) {
        log::error!("Failed to load metadata: {error}");
        eprint!("{}", loader.drain_log());
        return ExitCode::FAILURE;
    }

    if let Some(header) = loader.metadata().map(|metadata| metadata.header()) {
        log::info!("Header sanity: 0x{:x}", header.sanity as u32);
        log::info!("Header version: {}", header.version);
        log::info!("String count: {}", header.string_count);
        log::info!("Type definition count: {}", header.type_definitions_count);
        log::info!("Method count: {}", header.methods_count);
    }
    probe_strings(&loader);

    loader.detect_obfuscation();
    let result = loader.apply_deobfuscation();
    if !result.success {
        log::warn!("Deobfuscation incomplete: {}", result.error_message);
    }
    loader.analyze_library();
    loader.process(cli.full);
    loader.generate_report();

    print!("{}", loader.drain_log());
    ExitCode::SUCCESS
}

/// Surfaces the first resolvable pool entry so an operator can eyeball
/// string-pool health before reading the artifacts.
fn probe_strings(loader: &MetadataLoader) {
    let Some(metadata) = loader.metadata() else {
        return;
    };

    for i in 0..100 {
        let text = metadata.string(StringIndex(i));
        if !text.is_empty() {
            log::info!("String at index {i}: {text}");
            return;
        }
    }
    log::info!("No valid strings found in first 100 indices");
}
