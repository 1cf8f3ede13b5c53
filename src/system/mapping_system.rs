//! Mapping System - thread orchestration around the `LaserMapper`.
//!
//! The `MappingSystem` owns the input channel and spawns the mapping thread.
//! Frames and priors are fed independently; every completed cycle comes back
//! on the output channel. Shutdown closes the input, lets the thread drain
//! whatever can still be paired, and hands the mapper back for persistence.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info};

use crate::config::MappingConfig;
use crate::error::{MappingError, Result};
use crate::imu::GlobalState;
use crate::mapping::{InputSynchronizer, LaserMapper, SyncStatus};

use super::messages::{LidarFrame, MappingInput, MappingOutput};
use super::shared_state::SharedState;

/// Timeout for receiving inputs. Allows periodic shutdown checks.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

pub struct MappingSystem {
    shared: Arc<SharedState>,

    /// Channel sender for inputs (driver -> mapping thread).
    input_sender: Option<Sender<MappingInput>>,

    /// Completed cycles (mapping thread -> driver).
    output_receiver: Receiver<MappingOutput>,

    mapping_handle: Option<JoinHandle<LaserMapper>>,
}

impl MappingSystem {
    /// Validate `config`, build the mapper and spawn the mapping thread.
    pub fn new(config: MappingConfig) -> Result<Self> {
        let shared = SharedState::new();
        let synchronizer = InputSynchronizer::new(config.sync.clone());
        let mapper = LaserMapper::new(config)?;

        // Unbounded on both sides: inputs are never throttled.
        let (input_sender, input_receiver) = unbounded::<MappingInput>();
        let (output_sender, output_receiver) = unbounded::<MappingOutput>();

        let mapping_handle = Self::spawn_mapping(
            mapper,
            synchronizer,
            shared.clone(),
            input_receiver,
            output_sender,
        );

        Ok(Self {
            shared,
            input_sender: Some(input_sender),
            output_receiver,
            mapping_handle: Some(mapping_handle),
        })
    }

    fn spawn_mapping(
        mapper: LaserMapper,
        synchronizer: InputSynchronizer,
        shared: Arc<SharedState>,
        input_receiver: Receiver<MappingInput>,
        output_sender: Sender<MappingOutput>,
    ) -> JoinHandle<LaserMapper> {
        thread::spawn(move || {
            let mut worker = MappingWorker {
                mapper,
                synchronizer,
                shared,
                output_sender,
            };
            worker.run(input_receiver);
            worker.mapper
        })
    }

    pub fn push_frame(&self, frame: LidarFrame) -> Result<()> {
        self.send(MappingInput::Frame(frame))
    }

    pub fn push_prior(&self, prior: GlobalState) -> Result<()> {
        self.send(MappingInput::Prior(prior))
    }

    fn send(&self, input: MappingInput) -> Result<()> {
        let sender = self.input_sender.as_ref().ok_or(MappingError::Disconnected)?;
        sender.send(input).map_err(|_| MappingError::Disconnected)
    }

    /// Outputs of completed cycles, in cycle order.
    pub fn outputs(&self) -> &Receiver<MappingOutput> {
        &self.output_receiver
    }

    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.shared
    }

    /// Close the input, wait for the mapping thread to drain it and return
    /// the mapper.
    pub fn shutdown(mut self) -> Result<LaserMapper> {
        self.input_sender.take();
        let handle = self
            .mapping_handle
            .take()
            .ok_or(MappingError::ThreadPanicked)?;
        handle.join().map_err(|_| MappingError::ThreadPanicked)
    }
}

impl Drop for MappingSystem {
    fn drop(&mut self) {
        if let Some(handle) = self.mapping_handle.take() {
            // Abandoned without `shutdown`: skip the drain.
            self.shared.request_shutdown();
            self.input_sender.take();
            let _ = handle.join();
        }
    }
}

/// Mapping-thread side: pairs inputs and runs cycles.
struct MappingWorker {
    mapper: LaserMapper,
    synchronizer: InputSynchronizer,
    shared: Arc<SharedState>,
    output_sender: Sender<MappingOutput>,
}

impl MappingWorker {
    /// Runs until shutdown is requested or the input channel is closed.
    fn run(&mut self, input_receiver: Receiver<MappingInput>) {
        info!("[MappingThread] started");

        loop {
            if self.shared.is_shutdown_requested() {
                info!("[MappingThread] shutdown requested, exiting");
                break;
            }

            match input_receiver.recv_timeout(RECV_TIMEOUT) {
                Ok(input) => {
                    self.accept(input);
                    // Take everything already queued before pairing.
                    for input in input_receiver.try_iter() {
                        self.accept(input);
                    }
                    self.process_ready();
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    self.process_ready();
                    let (frames, priors) = self.synchronizer.pending();
                    info!(
                        "[MappingThread] input closed after {} cycles, {} frames / {} priors left unpaired",
                        self.mapper.cycles(),
                        frames,
                        priors
                    );
                    break;
                }
            }
        }
    }

    fn accept(&mut self, input: MappingInput) {
        match input {
            MappingInput::Frame(frame) => self.synchronizer.push_frame(frame),
            MappingInput::Prior(prior) => self.synchronizer.push_prior(prior),
        }
    }

    fn process_ready(&mut self) {
        loop {
            match self.synchronizer.next_pair() {
                SyncStatus::Ready(frame, prior) => {
                    let output = self.mapper.process(frame, prior);
                    self.shared.publish(&output.state);
                    if self.output_sender.send(output).is_err() {
                        debug!("[MappingThread] output receiver dropped");
                    }
                }
                SyncStatus::Waiting => break,
                SyncStatus::Desync { frames, priors } => {
                    debug!(
                        "[MappingThread] deferring: {} frames vs {} priors buffered",
                        frames, priors
                    );
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::FeatureSet;
    use crate::registration::SolverState;
    use crate::test_utils::tilted_floor;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pairs_are_processed_and_mapper_returned() {
        let system = MappingSystem::new(MappingConfig::default()).unwrap();
        let points = tilted_floor().sample(&mut StdRng::seed_from_u64(11), 400);

        for n in 0..3 {
            let t = n as f64 * 0.1;
            system
                .push_frame(LidarFrame::new(t, FeatureSet::surface_only(points.clone())))
                .unwrap();
            system.push_prior(GlobalState::identity(t)).unwrap();
        }

        let first = system.outputs().recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(first.cycle, 0);
        assert_eq!(first.report.state, SolverState::AbortedSparseMap);

        let shared = system.shared_state().clone();
        let mapper = system.shutdown().unwrap();

        assert_eq!(mapper.cycles(), 3);
        assert_eq!(shared.cycles(), 3);
        assert_eq!(shared.latest_state().map(|s| s.timestamp_s), Some(0.2));
    }

    #[test]
    fn test_invalid_config_fails_before_spawning() {
        let mut config = MappingConfig::default();
        config.matching.num_workers = 0;
        assert!(MappingSystem::new(config).is_err());
    }
}
