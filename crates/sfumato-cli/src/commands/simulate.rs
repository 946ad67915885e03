//! End-to-end dry run: sample with a synthetic denoiser, then tile-decode.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sfumato_core::{CancelToken, DType, Tensor};
use sfumato_sampler::{Conditioning, GuidanceCompositor, Sampler, noise};
use sfumato_vae::{decode_single, to_rgba8, unscale_latent};

use super::common::SettingsArgs;
use crate::synthetic::{AnalyticDenoiser, UpsampleDecoder, target_latent};

/// Token count and width of the placeholder prompt embedding.
const PROMPT_DIMS: [usize; 3] = [1, 77, 8];

#[derive(Args)]
pub struct SimulateArgs {
    #[command(flatten)]
    settings: SettingsArgs,

    /// Write the decoded image as a binary PPM
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Skip the unconditional pass (no negative prompt)
    #[arg(long)]
    no_negative: bool,

    /// Decode the whole latent in one call instead of tiles
    #[arg(long)]
    single_shot: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let config = args.settings.resolve()?;
    let scheduler = config.build_scheduler()?;
    let dims = config.latent_dims();
    let steps = scheduler.steps();

    let cancel = CancelToken::new();
    let c = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nCancelling...");
        c.cancel();
    })?;

    let prompt = Tensor::full(DType::F32, &PROMPT_DIMS, 1.0);
    let conditioning = if args.no_negative {
        Conditioning::positive(prompt)
    } else {
        Conditioning::guided(prompt, Tensor::zeros(DType::F32, &PROMPT_DIMS))
    };
    let guided = conditioning.negative.is_some()
        && GuidanceCompositor::new(config.guidance_scale).needs_unconditional();

    let target = target_latent(dims);
    let mut denoiser = AnalyticDenoiser::new(&scheduler, target.clone(), if guided { 2 } else { 1 });
    let mut sampler = Sampler::new(scheduler, config.pool());
    let initial = noise::gaussian(DType::F32, &dims, config.seed, sampler.pool_mut());

    println!(
        "Sampling {}x{} with {} ({} steps, guidance {}, seed {})",
        config.width, config.height, config.sampler, steps, config.guidance_scale, config.seed
    );

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(steps as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let outcome = sampler.run(
        &mut denoiser,
        initial,
        &conditioning,
        &config.sample_options(),
        &cancel,
        |p| {
            pb.set_position((p.step + 1) as u64);
            pb.set_message(format!("sigma {:.4}", p.sigma));
        },
    )?;

    if outcome.cancelled {
        pb.abandon_with_message("cancelled");
        println!("Cancelled after {}/{steps} steps", outcome.completed_steps);
        return Ok(());
    }
    pb.finish_with_message("done");

    let error = mean_abs_diff(&outcome.latent, &target);
    println!("  mean |latent - target| = {error:.6}");

    let (_, mut pool) = sampler.into_parts();
    let mut latent = outcome.latent;
    unscale_latent(&mut latent);

    let (width, height) = (config.width as usize, config.height as usize);
    let image = if args.single_shot {
        decode_single(&latent, &mut UpsampleDecoder)?
    } else {
        let decoder = config.tiled_decoder();
        let decoded = decoder.decode(&latent, width, height, &mut UpsampleDecoder, &mut pool, &cancel)?;
        println!("  decoded {}/{} tiles", decoded.decoded_tiles, decoded.total_tiles);
        if decoded.cancelled {
            println!("Cancelled during decode");
            return Ok(());
        }
        decoded.image
    };

    let stats = pool.stats();
    println!(
        "  pool: {} hits, {} misses, {} discarded",
        stats.hits, stats.misses, stats.discarded
    );

    if let Some(path) = &args.output {
        let rgba = to_rgba8(&image)?;
        write_ppm(path, width, height, &rgba)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn mean_abs_diff(a: &Tensor, b: &Tensor) -> f32 {
    if a.is_empty() {
        return 0.0;
    }
    let sum: f32 = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).abs())
        .sum();
    sum / a.len() as f32
}

fn write_ppm(path: &Path, width: usize, height: usize, rgba: &[u8]) -> anyhow::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{width} {height}\n255\n")?;
    for px in rgba.chunks_exact(4) {
        out.write_all(&px[..3])?;
    }
    out.flush()?;
    Ok(())
}
