//! gipack-cli - Command-line interface for gipack
//!
//! Lists, extracts and inspects Gentee installer packages, including
//! packages embedded at an offset inside a setup executable.

use clap::{Parser, Subcommand};
use gipack::{PackageArchive, PackageEntry};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::{self, File};
use std::io::{self, BufReader, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "gipack-cli")]
#[command(about = "A CLI tool for reading Gentee installer packages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Byte offset of the package inside the input file
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Filename prefix to strip while loading (for example "data\\")
    #[arg(long, default_value = "")]
    prefix: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the entries in a package
    List {
        /// Package file, or installer executable together with --offset
        input: PathBuf,
    },

    /// Extract entries into a directory
    Extract {
        /// Package file, or installer executable together with --offset
        input: PathBuf,

        /// Glob over entry paths; extracts everything when omitted
        pattern: Option<String>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Force overwrite of existing files
        #[arg(short, long)]
        force: bool,
    },

    /// Show a package summary
    Info {
        /// Package file, or installer executable together with --offset
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { input } => {
            list_package(&input, cli.offset, &cli.prefix, cli.verbose)
        }
        Commands::Extract {
            input,
            pattern,
            output,
            force,
        } => extract_package(
            &input,
            pattern.as_deref(),
            &output,
            force,
            cli.offset,
            &cli.prefix,
            cli.verbose,
            cli.quiet,
        ),
        Commands::Info { input } => show_package_info(&input, cli.offset, &cli.prefix, cli.verbose),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_archive(
    input: &Path,
    offset: u64,
    prefix: &str,
) -> Result<PackageArchive<BufReader<File>>, Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file '{}' does not exist", input.display()).into());
    }
    let mut reader = BufReader::new(File::open(input)?);
    reader.seek(SeekFrom::Start(offset))?;
    let archive = PackageArchive::load(reader, prefix)
        .map_err(|e| format!("Failed to load package: {}", e))?;
    Ok(archive)
}

fn list_package(
    input: &Path,
    offset: u64,
    prefix: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let archive = open_archive(input, offset, prefix)?;

    println!("{:>12}  {:<10} Path", "Size", "Storage");
    for entry in archive.entries() {
        let storage = if entry.is_compressed() {
            "packed"
        } else {
            "stored"
        };
        if verbose {
            println!(
                "{:>12}  {:<10} {} (at {}, {} bytes in package)",
                entry.size(),
                storage,
                entry.path(),
                entry.data_start(),
                entry.data_span()
            );
        } else {
            println!("{:>12}  {:<10} {}", entry.size(), storage, entry.path());
        }
    }
    println!("{} entries", archive.len());

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn extract_package(
    input: &Path,
    pattern: Option<&str>,
    output: &Path,
    force: bool,
    offset: u64,
    prefix: &str,
    verbose: bool,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let archive = open_archive(input, offset, prefix)?;

    let entries: Vec<&PackageEntry> = match pattern {
        Some(pattern) => archive.matching_entries(pattern, true),
        None => archive.entries().collect(),
    };
    if entries.is_empty() {
        if !quiet {
            println!("Nothing to extract");
        }
        return Ok(());
    }

    let start_time = Instant::now();
    let progress = if !quiet {
        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut extracted = 0usize;
    let mut total_bytes = 0u64;
    for entry in entries {
        let Some(target) = safe_target(output, entry.path()) else {
            eprintln!("Warning: skipping entry with unsafe path {:?}", entry.path());
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
            continue;
        };
        if target.exists() && !force {
            return Err(format!(
                "Output file '{}' already exists. Use --force to overwrite",
                target.display()
            )
            .into());
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        if let Some(ref pb) = progress {
            pb.set_message(entry.path().to_string());
        }
        if verbose {
            println!("Extracting '{}' ({} bytes)", entry.path(), entry.size());
        }

        let mut stream = archive.open(entry.path())?;
        let mut file = File::create(&target)?;
        let copied = io::copy(&mut stream, &mut file)?;
        if stream.err() || copied < entry.size() {
            return Err(format!(
                "Entry '{}' decoded short ({} of {} bytes)",
                entry.path(),
                copied,
                entry.size()
            )
            .into());
        }

        extracted += 1;
        total_bytes += copied;
        if let Some(ref pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }
    if !quiet {
        println!("✓ Extracted {} entries ({} bytes)", extracted, total_bytes);
        println!("  Time: {:.2?}", start_time.elapsed());
    }

    Ok(())
}

fn show_package_info(
    input: &Path,
    offset: u64,
    prefix: &str,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let archive = open_archive(input, offset, prefix)?;

    let mut stored = 0usize;
    let mut packed = 0usize;
    let mut total_size = 0u64;
    let mut total_span = 0u64;
    for entry in archive.entries() {
        if entry.is_compressed() {
            packed += 1;
        } else {
            stored += 1;
        }
        total_size += entry.size();
        total_span += entry.data_span();
    }

    println!("Package Information:");
    println!("  File: {}", input.display());
    if offset > 0 {
        println!("  Package offset: {}", offset);
    }
    println!("  Entries: {} ({} packed, {} stored)", archive.len(), packed, stored);
    println!("  Decompressed: {} bytes", total_size);
    println!("  In package: {} bytes", total_span);
    if total_size > 0 {
        println!(
            "  Ratio: {:.1}%",
            (total_span as f64 / total_size as f64) * 100.0
        );
    }

    if verbose {
        if let Some(largest) = archive.entries().max_by_key(|e| e.size()) {
            println!("  Largest entry: {} ({} bytes)", largest.path(), largest.size());
        }
    }

    Ok(())
}

/// Resolve an entry path inside the output directory, refusing absolute
/// paths and any traversal outside it.
fn safe_target(dir: &Path, entry_path: &str) -> Option<PathBuf> {
    let relative = Path::new(entry_path);
    if relative.components().next().is_none() {
        return None;
    }
    let mut target = dir.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => target.push(part),
            _ => return None,
        }
    }
    Some(target)
}
