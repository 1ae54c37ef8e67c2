use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use dem_align::io::{object_from_json, write_alignment_report};
use dem_align::store::FsStore;
use dem_align::{AlignConfig, AlignError, GeoReference, OrthoAligner};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Parser)]
#[command(version, about)]
struct DemAlignCli {
    /// first orthoimage
    ortho1: PathBuf,

    /// first dem
    dem1: PathBuf,

    /// second orthoimage
    ortho2: PathBuf,

    /// second dem
    dem2: PathBuf,

    /// prefix of the json report, no report when omitted
    output_prefix: Option<String>,

    /// json file overriding the default pipeline settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// directory for interest point and match caches
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// seed of the ransac sampler
    #[arg(long)]
    seed: Option<u64>,

    /// hide the matching progress bar
    #[arg(long)]
    no_progress: bool,
}

fn require_file(path: &Path) -> Result<(), AlignError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AlignError::SourceUnreadable {
            path: path.to_path_buf(),
            reason: "no such file".to_string(),
        })
    }
}

fn run(cli: DemAlignCli) -> Result<(), AlignError> {
    let mut config: AlignConfig = match &cli.config {
        Some(path) => object_from_json(path)?,
        None => AlignConfig::default(),
    };
    if cli.cache_dir.is_some() {
        config.cache_dir = cli.cache_dir.clone();
    }
    config.matcher.show_progress = !cli.no_progress;

    // DEMs only need to exist; alignment works on the orthoimages.
    require_file(&cli.dem1)?;
    require_file(&cli.dem2)?;
    log::debug!("dems: {} {}", cli.dem1.display(), cli.dem2.display());

    let ortho1_geo = GeoReference::read_for_image(&cli.ortho1)?;
    let ortho2_geo = GeoReference::read_for_image(&cli.ortho2)?;

    let store = match &config.cache_dir {
        Some(dir) => FsStore::with_cache_dir(dir),
        None => FsStore::new(),
    };
    let mut aligner = OrthoAligner::from_config(store, &config);
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed.unwrap_or_else(rand::random));
    let result = aligner.align(&cli.ortho1, &cli.ortho2, &ortho1_geo, &ortho2_geo, &mut rng)?;

    println!("Ransac Result: {}", result.transform);
    println!("# inliers: {}", result.inliers.len());

    if let Some(prefix) = &cli.output_prefix {
        let report_path = PathBuf::from(format!("{}-align.json", prefix));
        write_alignment_report(&report_path, &cli.ortho1, &cli.ortho2, &result)?;
        log::info!("report written to {}", report_path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = DemAlignCli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
