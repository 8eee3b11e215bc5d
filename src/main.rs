//! Perun CLI - inspection tool for model container files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use perun::mdl::{model_catalog, peek};
use perun::prelude::*;

/// Perun - model container inspection tool
#[derive(Parser)]
#[command(name = "perun")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the container envelope of a file
    Info {
        /// Path to the container file
        #[arg(short, long, env = "INPUT_MODEL")]
        input: PathBuf,
    },

    /// Print the scene hierarchy of a model file
    Tree {
        /// Path to the model file
        #[arg(short, long, env = "INPUT_MODEL")]
        input: PathBuf,
    },

    /// List the geometry stream contents of a model file
    Geometry {
        /// Path to the model file
        #[arg(short, long, env = "INPUT_MODEL")]
        input: PathBuf,
    },

    /// Compute the catalog hash of a structure name
    Hash {
        /// Structure name to hash
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input } => cmd_info(&input),
        Commands::Tree { input } => cmd_tree(&input),
        Commands::Geometry { input } => cmd_geometry(&input),
        Commands::Hash { name } => {
            println!("0x{:08X}  {}", crc::hash_str(&name), name);
            Ok(())
        }
    }
}

fn cmd_info(input: &PathBuf) -> Result<()> {
    let data = std::fs::read(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let envelope = peek(&data).context("failed to parse container envelope")?;

    let struct_name = model_catalog()
        .get(envelope.struct_hash)
        .map(|def| def.name)
        .unwrap_or("<unknown>");

    println!("File:            {}", input.display());
    println!("Size:            {} bytes", data.len());
    println!("Record kind:     {:?}", envelope.kind);
    println!(
        "Format version:  {}.{}",
        envelope.format_version, envelope.content_version
    );
    println!(
        "Structure:       {} (0x{:08X})",
        struct_name, envelope.struct_hash
    );
    println!("Body length:     {} bytes", envelope.body_len);
    if !envelope.asset_id.is_nil() {
        println!("Asset id:        {}", envelope.asset_id);
    }
    Ok(())
}

fn cmd_tree(input: &PathBuf) -> Result<()> {
    let file = ModelFile::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;

    println!("{} ({} nodes)", file.model.name, file.model.root.subtree_len());
    print_node(&file.model.root, 0);
    Ok(())
}

fn print_node(node: &SceneNode, depth: usize) {
    let indent = "  ".repeat(depth);
    let name = if node.name.is_empty() { "<unnamed>" } else { &node.name };
    if node.flags != 0 {
        println!("{indent}{name} [flags 0x{:X}]", node.flags);
    } else {
        println!("{indent}{name}");
    }
    for child in &node.children {
        print_node(child, depth + 1);
    }
}

fn cmd_geometry(input: &PathBuf) -> Result<()> {
    let file = ModelFile::open(input)
        .with_context(|| format!("failed to open {}", input.display()))?;
    let geometry = &file.model.geometry;

    println!(
        "Layout: {} attributes, stride {} bytes, {}-bit indices",
        geometry.layout.len(),
        geometry.stride,
        geometry.index_width * 8
    );
    for entry in &geometry.layout {
        println!(
            "  semantic {} format {} at offset {}",
            entry.semantic, entry.format, entry.offset
        );
    }

    println!("Meshes: {}", geometry.meshes.len());
    for mesh in &geometry.meshes {
        println!(
            "  {:24} {:>8} verts {:>8} indices  hash 0x{:08X}",
            mesh.id, mesh.vertex_count, mesh.index_count, mesh.content_hash
        );
        println!(
            "    bounds ({:.3}, {:.3}, {:.3}) .. ({:.3}, {:.3}, {:.3}), {} hull verts",
            mesh.bounds_min.x,
            mesh.bounds_min.y,
            mesh.bounds_min.z,
            mesh.bounds_max.x,
            mesh.bounds_max.y,
            mesh.bounds_max.z,
            mesh.hull_end - mesh.hull_start
        );
    }

    println!(
        "Shared buffers: {} hull verts, {} index bytes",
        geometry.hull_vertices.len(),
        geometry.index_data.len()
    );
    Ok(())
}
