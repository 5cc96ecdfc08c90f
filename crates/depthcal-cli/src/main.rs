use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use depthcal_core::Real;
use depthcal_pipeline::{
    io::{load_config, load_json, save_json},
    reconstruct_point_cloud, run_frame, CalibrationState, FrameInput, FrameReport,
};
use log::info;
use rand::{rngs::StdRng, SeedableRng};

/// Calibrate one frame's disparity against sparse world points and report
/// proximity between detections.
#[derive(Debug, Parser)]
#[command(author, version, about = "Depth calibration and proximity pipeline")]
struct Args {
    /// Path to JSON file containing a FrameInput.
    #[arg(long)]
    input: PathBuf,

    /// Optional path to JSON PipelineConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Calibration state from a previous frame.
    #[arg(long)]
    state: Option<PathBuf>,

    /// Where to write the updated calibration state.
    #[arg(long)]
    state_out: Option<PathBuf>,

    /// RANSAC seed, overriding the config.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the calibrated point cloud (JSON) to this path.
    #[arg(long)]
    cloud: Option<PathBuf>,

    /// Pixel stride used when sampling the point cloud.
    #[arg(long, default_value_t = 4)]
    cloud_stride: usize,
}

fn run_from_files(args: &Args) -> Result<FrameReport> {
    let input: FrameInput = load_json(&args.input)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let state = match &args.state {
        Some(path) => load_json::<CalibrationState>(path)?,
        None => CalibrationState::default(),
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let out = run_frame(&input, &config, state, &mut rng).context("frame pipeline failed")?;

    if let Some(path) = &args.state_out {
        save_json(&out.state, path)?;
    }
    if let Some(path) = &args.cloud {
        let vp = input.camera.viewport;
        let k = input.intrinsics.scaled(
            out.normalized.width() as Real / vp.width as Real,
            out.normalized.height() as Real / vp.height as Real,
        );
        let cloud = reconstruct_point_cloud(
            &out.normalized,
            &out.state.result,
            &k,
            config.proximity.convention,
            args.cloud_stride,
        );
        info!("writing {} cloud points to {}", cloud.len(), path.display());
        save_json(&cloud, path)?;
    }
    Ok(out.report)
}

fn write_report_json(report: &FrameReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let report = run_from_files(&args)?;
    println!("{}", write_report_json(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use depthcal_core::{
        synthetic::{SyntheticCamera, SyntheticScene},
        DepthPoint,
    };
    use depthcal_pipeline::{CameraSnapshot, DetectionBox};
    use tempfile::NamedTempFile;

    fn synthetic_input() -> FrameInput {
        let cam = SyntheticCamera::default();
        let mut rng = StdRng::seed_from_u64(21);
        let world = cam.sample_visible_points(200, 1.0, 6.0, &mut rng);
        let scene = SyntheticScene::render(cam, &world, (80, 60), 0.3, 0.1, 0.0);
        FrameInput {
            disparity: scene.raster,
            points: scene.points,
            camera: CameraSnapshot {
                translation: scene.camera.translation(),
                view: scene.camera.view,
                projection: scene.camera.projection,
                viewport: scene.camera.viewport,
            },
            intrinsics: scene.camera.intrinsics(),
            detections: vec![DetectionBox::new(100.0, 100.0, 200.0, 300.0, "person", 0.9)],
        }
    }

    fn args_for(input: &NamedTempFile) -> Args {
        Args::parse_from(["depthcal", "--input", input.path().to_str().unwrap()])
    }

    #[test]
    fn helper_smoke_test() {
        let input_file = NamedTempFile::new().unwrap();
        let state_file = NamedTempFile::new().unwrap();
        let cloud_file = NamedTempFile::new().unwrap();
        save_json(&synthetic_input(), input_file.path()).unwrap();

        let mut args = args_for(&input_file);
        args.state_out = Some(state_file.path().to_path_buf());
        args.cloud = Some(cloud_file.path().to_path_buf());
        args.cloud_stride = 10;

        let report = run_from_files(&args).expect("cli helper should succeed");
        let json = write_report_json(&report).unwrap();
        let parsed: FrameReport = serde_json::from_str(&json).unwrap();
        assert!(parsed.calibration.fresh);
        assert_eq!(parsed.detections.len(), 1);

        let state: CalibrationState = load_json(state_file.path()).unwrap();
        assert_eq!(state.fitted_frames, 1);
        assert!(state.result.scale > 0.0);

        let cloud: Vec<DepthPoint> = load_json(cloud_file.path()).unwrap();
        assert!(!cloud.is_empty());
        assert!(cloud.len() <= 8 * 6);
    }

    #[test]
    fn previous_state_is_threaded_in() {
        let input_file = NamedTempFile::new().unwrap();
        let state_file = NamedTempFile::new().unwrap();
        let mut input = synthetic_input();
        input.points.clear();
        save_json(&input, input_file.path()).unwrap();
        let mut previous = CalibrationState::default();
        previous.result.scale = 0.7;
        previous.fitted_frames = 4;
        save_json(&previous, state_file.path()).unwrap();

        let mut args = args_for(&input_file);
        args.state = Some(state_file.path().to_path_buf());
        let report = run_from_files(&args).unwrap();
        assert!(!report.calibration.fresh);
        assert_eq!(report.calibration.scale, 0.7);
    }

    #[test]
    fn missing_input_is_an_error() {
        let args = Args::parse_from(["depthcal", "--input", "/nonexistent/frame.json"]);
        assert!(run_from_files(&args).is_err());
    }
}
