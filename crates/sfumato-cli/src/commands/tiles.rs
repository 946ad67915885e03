//! Tile plan inspection for the tiled VAE decoder.

use clap::Args;
use serde::Serialize;
use sfumato_vae::{LATENT_SCALE, TileGrid};

#[derive(Args)]
pub struct TilesArgs {
    /// Image width in pixels
    #[arg(long, default_value = "512")]
    width: usize,

    /// Image height in pixels
    #[arg(long, default_value = "512")]
    height: usize,

    /// Tile size in pixels
    #[arg(long, default_value = "256")]
    tile_size: usize,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct TileRow {
    index: usize,
    col: usize,
    row: usize,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    feathered: [bool; 4],
}

pub fn run(args: TilesArgs) -> anyhow::Result<()> {
    if args.width % LATENT_SCALE != 0 || args.height % LATENT_SCALE != 0 {
        anyhow::bail!(
            "image size {}x{} must be a multiple of {LATENT_SCALE}",
            args.width,
            args.height
        );
    }
    let (lw, lh) = (args.width / LATENT_SCALE, args.height / LATENT_SCALE);
    let grid = TileGrid::plan(lw, lh, args.tile_size)?;

    let rows: Vec<TileRow> = grid
        .tiles()
        .map(|t| TileRow {
            index: t.index,
            col: t.col,
            row: t.row,
            x: t.x,
            y: t.y,
            width: t.width,
            height: t.height,
            feathered: [t.edges.left, t.edges.right, t.edges.top, t.edges.bottom],
        })
        .collect();

    if args.json {
        let report = serde_json::json!({
            "latent_width": lw,
            "latent_height": lh,
            "tiles_x": grid.tiles_x(),
            "tiles_y": grid.tiles_y(),
            "stride": grid.stride(),
            "overlap": grid.overlap(),
            "extent": grid.extent(),
            "tiles": rows,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{}x{} px -> {lw}x{lh} latent, {}x{} tiles ({} total)",
        args.width,
        args.height,
        grid.tiles_x(),
        grid.tiles_y(),
        grid.len()
    );
    println!(
        "  stride {}  overlap {}  extent {} (latent px)",
        grid.stride(),
        grid.overlap(),
        grid.extent()
    );
    println!();
    println!("  {:>4}  {:>7}  {:>11}  {:>9}  feather", "tile", "col,row", "x,y", "w x h");
    for r in &rows {
        let edges: String = ["L", "R", "T", "B"]
            .iter()
            .zip(r.feathered)
            .filter(|(_, on)| *on)
            .map(|(name, _)| *name)
            .collect();
        println!(
            "  {:>4}  {:>7}  {:>11}  {:>9}  {}",
            r.index,
            format!("{},{}", r.col, r.row),
            format!("{},{}", r.x, r.y),
            format!("{}x{}", r.width, r.height),
            if edges.is_empty() { "-" } else { edges.as_str() }
        );
    }
    Ok(())
}
