//! Fitness evaluation: a whole generation flies through one shared world
//!
//! Every genome gets a bird and a feed-forward controller. All birds share the
//! pipes and the ground, so the fitness of a genome is how long its bird
//! survives plus a bonus for every pipe it clears.

use std::ops::ControlFlow;

use anyhow::{anyhow, Result};

use super::observation::{next_pipe_index, observe, validate_controller};
use crate::game::{Action, Base, Bird, GameEngine, Pipe};
use crate::neat::{FeedForwardNetwork, Genome, GenomeConfig, NeatConfig};

/// Counters carried from one evaluation call to the next
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainingProgress {
    /// Generations evaluated so far, including the current one
    pub generation: u32,
    /// Highest number of pipes cleared in any generation
    pub best_score: u32,
}

/// Result of evaluating one generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub progress: TrainingProgress,
    /// Pipes cleared this generation
    pub score: u32,
    /// Frames simulated this generation
    pub frames: u64,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    /// `Break` when a frame sink asked to stop
    pub flow: ControlFlow<()>,
}

/// A bird, its controller and the fitness it has earned
pub struct Contestant {
    /// Position of the genome in the evaluated slice
    pub genome_index: usize,
    pub bird: Bird,
    pub network: FeedForwardNetwork,
    pub fitness: f64,
    /// Cleared when the bird is eliminated during the current frame
    pub alive: bool,
}

impl Contestant {
    pub fn new(genome_index: usize, bird: Bird, network: FeedForwardNetwork) -> Self {
        Self {
            genome_index,
            bird,
            network,
            fitness: 0.0,
            alive: true,
        }
    }

    /// Ask the controller whether to flap towards `pipe`
    pub fn decide(&self, pipe: &Pipe, threshold: f64) -> Action {
        let output = self.network.activate(&observe(&self.bird, pipe));
        output
            .first()
            .map_or(Action::Idle, |&out| Action::from_output(out, threshold))
    }
}

/// What a frame sink gets to see after every frame
pub struct FrameView<'a> {
    pub contestants: &'a [Contestant],
    pub pipes: &'a [Pipe],
    pub base: &'a Base,
    pub score: u32,
    pub frame: u64,
    pub generation: u32,
    pub population: usize,
}

/// Observer called once per simulated frame
pub trait FrameSink {
    /// Return `Break` to abandon the run
    fn on_frame(&mut self, view: &FrameView<'_>) -> Result<ControlFlow<()>>;
}

/// Runs unpaced and never stops the run
pub struct Headless;

impl FrameSink for Headless {
    fn on_frame(&mut self, _view: &FrameView<'_>) -> Result<ControlFlow<()>> {
        Ok(ControlFlow::Continue(()))
    }
}

/// Result of a single frame
#[derive(Default)]
pub struct FrameOutcome {
    pub passed_pipe: bool,
    /// Contestants removed this frame, with their final fitness
    pub eliminated: Vec<Contestant>,
}

/// The shared world of one generation
pub struct GenerationRun {
    contestants: Vec<Contestant>,
    pipes: Vec<Pipe>,
    base: Base,
    score: u32,
    frames: u64,
}

impl GenerationRun {
    pub fn new(engine: &mut GameEngine, genomes: &[Genome], config: &GenomeConfig) -> Self {
        let contestants = genomes
            .iter()
            .enumerate()
            .map(|(i, genome)| {
                Contestant::new(
                    i,
                    engine.spawn_bird(),
                    FeedForwardNetwork::create(genome, config),
                )
            })
            .collect();

        Self {
            contestants,
            pipes: vec![engine.spawn_pipe()],
            base: engine.spawn_base(),
            score: 0,
            frames: 0,
        }
    }

    pub fn contestants(&self) -> &[Contestant] {
        &self.contestants
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// No birds left
    pub fn is_over(&self) -> bool {
        self.contestants.is_empty()
    }

    pub fn view(&self, generation: u32, population: usize) -> FrameView<'_> {
        FrameView {
            contestants: &self.contestants,
            pipes: &self.pipes,
            base: &self.base,
            score: self.score,
            frame: self.frames,
            generation,
            population,
        }
    }

    /// Simulate one frame.
    ///
    /// Birds move and decide first, then the ground scrolls, then every pipe is
    /// collision-tested, checked for passing and moved. A passed pipe rewards
    /// the birds still flying at that point. Birds outside the vertical bounds
    /// are eliminated last, and all eliminated birds leave together at the end.
    pub fn step(&mut self, engine: &mut GameEngine) -> FrameOutcome {
        let Some(lead_x) = self.contestants.first().map(|c| c.bird.x) else {
            return FrameOutcome::default();
        };

        let config = engine.config();
        let (frame_reward, pipe_reward, jump_threshold) =
            (config.frame_reward, config.pipe_reward, config.jump_threshold);

        let target = next_pipe_index(&self.pipes, lead_x).map(|i| &self.pipes[i]);
        for contestant in &mut self.contestants {
            contestant.bird.advance();
            contestant.fitness += frame_reward;

            if let Some(pipe) = target {
                if contestant.decide(pipe, jump_threshold) == Action::Jump {
                    contestant.bird.jump();
                }
            }
        }

        self.base.advance();

        let mut passed_pipe = false;
        let mut expired = Vec::with_capacity(self.pipes.len());
        for pipe in &mut self.pipes {
            for contestant in self.contestants.iter_mut().filter(|c| c.alive) {
                if pipe.collide(&contestant.bird) {
                    contestant.alive = false;
                }
            }

            if pipe.check_passed(lead_x) {
                passed_pipe = true;
            }

            expired.push(pipe.is_offscreen());
            pipe.advance();
        }

        if passed_pipe {
            for contestant in self.contestants.iter_mut().filter(|c| c.alive) {
                contestant.fitness += pipe_reward;
            }
            self.score += 1;
            let pipe = engine.spawn_pipe();
            self.pipes.push(pipe);
        }

        // Expiry was decided before the pipes moved; the fresh pipe has no flag
        let mut expired = expired.into_iter();
        self.pipes.retain(|_| !expired.next().unwrap_or(false));

        for contestant in self.contestants.iter_mut().filter(|c| c.alive) {
            if engine.out_of_bounds(&contestant.bird).is_some() {
                contestant.alive = false;
            } else {
                contestant.bird.animate();
            }
        }

        self.frames += 1;

        let (alive, eliminated): (Vec<_>, Vec<_>) = std::mem::take(&mut self.contestants)
            .into_iter()
            .partition(|c| c.alive);
        self.contestants = alive;

        FrameOutcome {
            passed_pipe,
            eliminated,
        }
    }

    /// Hand back the contestants still flying
    pub fn into_survivors(self) -> Vec<Contestant> {
        self.contestants
    }
}

fn write_back(genomes: &mut [Genome], contestant: &Contestant) {
    if let Some(genome) = genomes.get_mut(contestant.genome_index) {
        genome.fitness = Some(contestant.fitness);
    }
}

/// Evaluates whole generations against the game
pub struct FitnessHarness {
    engine: GameEngine,
    max_frames: Option<u64>,
}

impl FitnessHarness {
    /// `max_frames` caps the length of a single generation
    pub fn new(engine: GameEngine, max_frames: Option<u64>) -> Self {
        Self { engine, max_frames }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Fly every genome and store its fitness.
    ///
    /// The generation ends when all birds are gone, when a live bird reaches
    /// the fitness threshold, when the frame cap is hit, or when `sink` asks to
    /// stop. Birds still flying at that point keep the fitness they have.
    pub fn evaluate(
        &mut self,
        genomes: &mut [Genome],
        config: &NeatConfig,
        progress: TrainingProgress,
        sink: &mut dyn FrameSink,
    ) -> Result<GenerationReport> {
        validate_controller(&config.genome)
            .map_err(|e| anyhow!("Genome settings do not fit the game: {}", e))?;

        let mut progress = TrainingProgress {
            generation: progress.generation + 1,
            ..progress
        };

        for genome in genomes.iter_mut() {
            genome.fitness = Some(0.0);
        }

        let threshold =
            (!config.neat.no_fitness_termination).then_some(config.neat.fitness_threshold);
        let mut run = GenerationRun::new(&mut self.engine, genomes, &config.genome);
        let mut flow = ControlFlow::Continue(());

        while !run.is_over() {
            let outcome = run.step(&mut self.engine);
            for contestant in &outcome.eliminated {
                write_back(genomes, contestant);
            }

            if sink
                .on_frame(&run.view(progress.generation, genomes.len()))?
                .is_break()
            {
                flow = ControlFlow::Break(());
                break;
            }

            if let Some(threshold) = threshold {
                if run.contestants().iter().any(|c| c.fitness >= threshold) {
                    log::debug!(
                        "Fitness threshold {} reached after {} frames",
                        threshold,
                        run.frames()
                    );
                    break;
                }
            }

            if self.max_frames.is_some_and(|max| run.frames() >= max) {
                log::debug!(
                    "Frame cap reached with {} birds alive",
                    run.contestants().len()
                );
                break;
            }
        }

        let score = run.score();
        let frames = run.frames();
        for contestant in run.into_survivors() {
            write_back(genomes, &contestant);
        }

        progress.best_score = progress.best_score.max(score);

        let fitnesses: Vec<f64> = genomes.iter().map(Genome::fitness_or_min).collect();
        let best_fitness = fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_fitness = if fitnesses.is_empty() {
            0.0
        } else {
            fitnesses.iter().sum::<f64>() / fitnesses.len() as f64
        };

        log::debug!(
            "Generation {}: score {}, {} frames, best fitness {:.2}",
            progress.generation,
            score,
            frames,
            best_fitness
        );

        Ok(GenerationReport {
            progress,
            score,
            frames,
            best_fitness,
            mean_fitness,
            flow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::neat::{Activation, ConnectionGene, NodeGene};

    /// A controller with no connections: its output is always 0, so it never flaps
    fn idle_genome(key: u64) -> Genome {
        let mut genome = Genome::new(key);
        genome.nodes.insert(
            0,
            NodeGene {
                key: 0,
                bias: 0.0,
                activation: crate::neat::Activation::Tanh,
            },
        );
        genome
    }

    /// Outputs `|y - gap center|`, so it flaps whenever the bird is more than
    /// half a unit away from the gap it steers for
    fn gap_chaser(key: u64) -> Genome {
        let mut genome = idle_genome(key);
        genome.nodes.get_mut(&0).unwrap().activation = Activation::Identity;
        genome.connections.insert(
            (-2, 0),
            ConnectionGene {
                key: (-2, 0),
                weight: 1.0,
                enabled: true,
            },
        );
        genome
    }

    fn engine() -> GameEngine {
        GameEngine::with_seed(GameConfig::default(), 21)
    }

    struct StopAfter(u64);

    impl FrameSink for StopAfter {
        fn on_frame(&mut self, view: &FrameView<'_>) -> Result<ControlFlow<()>> {
            if view.frame >= self.0 {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        }
    }

    #[test]
    fn test_passing_a_pipe_rewards_survivor() {
        let config = NeatConfig::default();
        let mut engine = engine();
        let genomes = vec![idle_genome(1)];
        let mut run = GenerationRun::new(&mut engine, &genomes, &config.genome);
        // Gap 350..550: a falling bird stays inside it for the first frames
        run.pipes = vec![Pipe::with_height(240.0, 350.0, engine.config())];

        let mut passed = 0;
        for _ in 0..10 {
            let outcome = run.step(&mut engine);
            assert!(outcome.eliminated.is_empty());
            if outcome.passed_pipe {
                passed += 1;
            }
        }

        assert_eq!(passed, 1);
        assert_eq!(run.score(), 1);
        let fitness = run.contestants()[0].fitness;
        assert!((fitness - (0.1 * 10.0 + 3.0)).abs() < 1e-9, "fitness {fitness}");
    }

    #[test]
    fn test_pipe_collision_eliminates_without_penalty() {
        let config = NeatConfig::default();
        let mut engine = engine();
        let mut genomes = vec![idle_genome(1), idle_genome(2)];
        let mut run = GenerationRun::new(&mut engine, &genomes, &config.genome);
        // Gap 500..700 over the birds: the first sits inside the top pipe, the
        // second flies through the gap
        run.pipes = vec![Pipe::with_height(229.0, 500.0, engine.config())];
        run.contestants[1].bird.y = 560.0;

        let outcome = run.step(&mut engine);

        assert!(outcome.passed_pipe);
        assert_eq!(outcome.eliminated.len(), 1);
        let crashed = &outcome.eliminated[0];
        assert_eq!(crashed.genome_index, 0);
        assert!(!crashed.alive);
        assert!((crashed.fitness - 0.1).abs() < 1e-9, "fitness {}", crashed.fitness);

        assert_eq!(run.contestants().len(), 1);
        assert_eq!(run.contestants()[0].genome_index, 1);
        assert!((run.contestants()[0].fitness - 3.1).abs() < 1e-9);

        write_back(&mut genomes, crashed);
        assert_eq!(genomes[0].fitness, Some(0.1));
        assert_eq!(genomes[1].fitness, None);
    }

    #[test]
    fn test_bird_above_window_eliminated() {
        let config = NeatConfig::default();
        let mut engine = engine();
        let genomes = vec![idle_genome(1), idle_genome(2)];
        let mut run = GenerationRun::new(&mut engine, &genomes, &config.genome);
        run.contestants[0].bird.y = -100.0;

        let outcome = run.step(&mut engine);

        assert_eq!(outcome.eliminated.len(), 1);
        assert_eq!(outcome.eliminated[0].genome_index, 0);
        assert!((outcome.eliminated[0].fitness - 0.1).abs() < 1e-9);
        assert_eq!(run.contestants().len(), 1);
        assert_eq!(run.contestants()[0].genome_index, 1);
    }

    #[test]
    fn test_birds_steer_for_second_pipe_once_past_first() {
        let config = NeatConfig::default();
        let mut engine = engine();
        let genomes = vec![gap_chaser(1)];
        let game = engine.config().clone();

        // The bird is at y 351.5 when it decides; the lead x 230 is past the
        // first pipe's right edge at 204, so only the second gap counts
        let mut run = GenerationRun::new(&mut engine, &genomes, &config.genome);
        run.pipes = vec![
            Pipe::with_height(100.0, 100.0, &game),
            Pipe::with_height(600.0, 352.0, &game),
        ];
        run.step(&mut engine);
        assert_eq!(run.contestants()[0].bird.velocity, 0.0);

        let mut run = GenerationRun::new(&mut engine, &genomes, &config.genome);
        run.pipes = vec![
            Pipe::with_height(100.0, 352.0, &game),
            Pipe::with_height(600.0, 100.0, &game),
        ];
        run.step(&mut engine);
        assert_eq!(run.contestants()[0].bird.velocity, -10.5);
    }

    #[test]
    fn test_input_count_must_match_observation() {
        let mut config = NeatConfig::default();
        config.genome.num_inputs = 2;
        let mut harness = FitnessHarness::new(engine(), Some(5));
        let mut genomes = vec![idle_genome(1)];

        let result =
            harness.evaluate(&mut genomes, &config, TrainingProgress::default(), &mut Headless);
        assert!(result.is_err());
    }

    #[test]
    fn test_falling_birds_eliminated_at_ground() {
        let config = NeatConfig::default();
        let mut harness = FitnessHarness::new(engine(), None);
        let mut genomes: Vec<Genome> = (1..=3).map(idle_genome).collect();

        let report = harness
            .evaluate(&mut genomes, &config, TrainingProgress::default(), &mut Headless)
            .unwrap();

        // 350 + 1.5 + 6 + 13.5 + 16 * 20 = 691 is the first y with y + 48 >= 730
        assert_eq!(report.frames, 23);
        assert_eq!(report.score, 0);
        assert_eq!(report.progress.generation, 1);
        assert!(report.flow.is_continue());
        for genome in &genomes {
            let fitness = genome.fitness.unwrap();
            assert!((fitness - 2.3).abs() < 1e-9, "fitness {fitness}");
        }
    }

    #[test]
    fn test_sink_can_stop_generation() {
        let config = NeatConfig::default();
        let mut harness = FitnessHarness::new(engine(), None);
        let mut genomes: Vec<Genome> = (1..=2).map(idle_genome).collect();

        let report = harness
            .evaluate(&mut genomes, &config, TrainingProgress::default(), &mut StopAfter(1))
            .unwrap();

        assert!(report.flow.is_break());
        assert_eq!(report.frames, 1);
        for genome in &genomes {
            assert!((genome.fitness.unwrap() - 0.1).abs() < 1e-9);
        }
    }

    #[test]
    fn test_threshold_ends_generation() {
        let mut config = NeatConfig::default();
        config.neat.fitness_threshold = 0.95;
        let mut harness = FitnessHarness::new(engine(), None);
        let mut genomes = vec![idle_genome(1)];

        let report = harness
            .evaluate(&mut genomes, &config, TrainingProgress::default(), &mut Headless)
            .unwrap();

        assert_eq!(report.frames, 10);
        assert!(genomes[0].fitness.unwrap() >= 0.95);
    }

    #[test]
    fn test_frame_cap() {
        let config = NeatConfig::default();
        let mut harness = FitnessHarness::new(engine(), Some(5));
        let mut genomes = vec![idle_genome(1)];

        let report = harness
            .evaluate(&mut genomes, &config, TrainingProgress::default(), &mut Headless)
            .unwrap();

        assert_eq!(report.frames, 5);
        assert!((genomes[0].fitness.unwrap() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_progress_carried_between_calls() {
        let config = NeatConfig::default();
        let mut harness = FitnessHarness::new(engine(), None);
        let mut genomes = vec![idle_genome(1)];
        let progress = TrainingProgress {
            generation: 4,
            best_score: 7,
        };

        let report = harness
            .evaluate(&mut genomes, &config, progress, &mut Headless)
            .unwrap();

        assert_eq!(report.progress.generation, 5);
        assert_eq!(report.progress.best_score, 7);
    }

    #[test]
    fn test_stale_fitness_is_reset() {
        let config = NeatConfig::default();
        let mut harness = FitnessHarness::new(engine(), Some(1));
        let mut genomes = vec![idle_genome(1)];
        genomes[0].fitness = Some(99.0);

        harness
            .evaluate(&mut genomes, &config, TrainingProgress::default(), &mut Headless)
            .unwrap();

        assert!((genomes[0].fitness.unwrap() - 0.1).abs() < 1e-9);
    }
}
