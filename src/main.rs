use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_lidar_mapping::config::MappingConfig;
use rust_lidar_mapping::io::{ReplayDataset, ReplayEvent};
use rust_lidar_mapping::registration::SolverState;
use rust_lidar_mapping::system::{MappingOutput, MappingSystem};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rust_lidar_mapping=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let dataset_path = args.next().unwrap_or_else(|| "data/replay".to_string());
    let config = match args.next() {
        Some(path) => MappingConfig::from_yaml_file(&path)
            .with_context(|| format!("Failed to load config {}", path))?,
        None => MappingConfig::default(),
    };
    let output_dir: PathBuf = config.output.map_file_path.clone();

    info!("Loading replay dataset from: {}", dataset_path);
    let dataset = ReplayDataset::new(&dataset_path)?;
    info!(
        "Loaded {} frames and {} pose priors",
        dataset.len(),
        dataset.priors.len()
    );

    let system = MappingSystem::new(config)?;
    let mut summary = RunSummary::default();

    for event in dataset.events() {
        match event {
            ReplayEvent::Frame(idx) => system.push_frame(dataset.frame(idx)?)?,
            ReplayEvent::Prior(idx) => system.push_prior(dataset.priors[idx].clone())?,
        }
        for output in system.outputs().try_iter() {
            summary.record(&output);
        }
    }

    let outputs = system.outputs().clone();
    let mapper = system.shutdown()?;
    while let Ok(output) = outputs.recv_timeout(Duration::from_millis(10)) {
        summary.record(&output);
    }
    summary.log();

    let report = mapper
        .persist(&output_dir)
        .with_context(|| format!("Failed to save map to {}", output_dir.display()))?;
    if !report.written {
        info!("No points were mapped; nothing saved");
    }

    Ok(())
}

#[derive(Default)]
struct RunSummary {
    cycles: usize,
    converged: usize,
    aborted: usize,
    degenerate: usize,
    total_ms: f64,
}

impl RunSummary {
    fn record(&mut self, output: &MappingOutput) {
        self.cycles += 1;
        match output.report.state {
            SolverState::Converged => self.converged += 1,
            SolverState::AbortedSparseMap => self.aborted += 1,
            _ => {}
        }
        if output.report.is_degenerate {
            self.degenerate += 1;
        }
        self.total_ms += output.timing.total_ms;

        let t = &output.odometry.translation;
        info!(
            "cycle {:>5} t={:.3}s {:?} iters={} corrs={} pos=[{:.2}, {:.2}, {:.2}] {:.1}ms",
            output.cycle,
            output.odometry.timestamp_s,
            output.report.state,
            output.report.iterations,
            output.report.num_correspondences,
            t.x,
            t.y,
            t.z,
            output.timing.total_ms
        );
    }

    fn log(&self) {
        let mean_ms = if self.cycles > 0 {
            self.total_ms / self.cycles as f64
        } else {
            0.0
        };
        info!(
            "{} cycles: {} converged, {} sparse-map aborts, {} degenerate, {:.1}ms mean",
            self.cycles, self.converged, self.aborted, self.degenerate, mean_ms
        );
    }
}
