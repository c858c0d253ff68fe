mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use plate_core::Composition;
use plate_core::layout::gap_logical;
use plate_core::persist::ProjectFile;
use preview_core::{Assets, Color, Pixmap, RenderOptions, Scene};

use cli::Args;

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = match args.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
    debug!("Command-line args: {:?}", args);

    let text = fs::read_to_string(&args.project)
        .with_context(|| format!("reading project {}", args.project.display()))?;
    let project = ProjectFile::from_json(&text)
        .with_context(|| format!("parsing project {}", args.project.display()))?;
    let plates = &project.plates.plates;
    info!(
        "{} plate(s), {} socket group(s), sockets {}",
        plates.len(),
        project.sockets.groups.len(),
        if project.sockets.enabled { "on" } else { "off" }
    );

    let (vw, vh) = args.viewport();
    let composition = match args.scale {
        Some(scale) => Composition::with_scale(plates, gap_logical(plates.len(), vw, vh), scale),
        None => Composition::fit(plates, vw, vh),
    };
    debug!("scale {:.4}, gap {:.3} cm", composition.scale, composition.gap);

    let motif = args.motif.as_deref().and_then(load_optional);
    let tile = args.socket_tile.as_deref().and_then(load_optional);

    let mut opts = RenderOptions {
        dpr: args.dpr,
        draw_sockets: project.sockets.enabled && !args.no_sockets,
        ..RenderOptions::default()
    };
    if let Some([r, g, b, a]) = args.background {
        opts.background = Color::from_rgba8(r, g, b, a);
    }

    let scene = Scene {
        plates,
        groups: &project.sockets.groups,
        composition: &composition,
    };
    let assets = Assets {
        motif: motif.as_ref(),
        socket_tile: tile.as_ref(),
    };
    let pixmap = preview_core::render(&scene, &assets, &opts).context("rendering preview")?;
    let bytes = preview_core::encode_png(&pixmap).context("encoding PNG")?;

    let out = output_path(&args.out);
    fs::write(&out, &bytes).with_context(|| format!("writing {}", out.display()))?;
    info!("wrote {}×{} px to {}", pixmap.width(), pixmap.height(), out.display());
    println!("{}", out.display());
    Ok(())
}

/// A missing or broken image only degrades the output.
fn load_optional(path: &Path) -> Option<Pixmap> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(err) => {
            warn!("cannot read {}: {err}", path.display());
            return None;
        }
    };
    match preview_core::decode_image(&bytes) {
        Ok(p) => Some(p),
        Err(err) => {
            warn!("{}: {err}", path.display());
            None
        }
    }
}

fn output_path(out: &Path) -> PathBuf {
    if out.is_dir() {
        out.join(preview_core::export_file_name(chrono::Utc::now()))
    } else {
        out.to_path_buf()
    }
}
