//! Engine behavior independent of any particular workload: scheduling
//! surface, error reporting, recovery after failure and async ordering.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gas_engine::prelude::*;
use gas_engine::{LocalTransport, Phase, Signal, SignalTransport, TransportError, TransportLayer};

/// Counts applies; fails on one vertex if asked to
#[derive(Clone, Default)]
struct Touch {
    fail_on: Option<VertexId>,
}

impl VertexProgram for Touch {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn gather_edges(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::None)
    }

    fn apply(&mut self, _ctx: &mut Context<'_>, v: &mut VertexMut<'_, u64>, _total: ()) -> ProgramResult<()> {
        if self.fail_on == Some(v.id()) {
            return Err(ProgramError::new("refusing to touch"));
        }
        *v.data_mut() += 1;
        Ok(())
    }

    fn scatter_edges(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::None)
    }
}

/// Re-signals itself until it has been applied `limit` times
#[derive(Clone)]
struct SelfLoop {
    limit: u64,
}

impl VertexProgram for SelfLoop {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn apply(&mut self, ctx: &mut Context<'_>, v: &mut VertexMut<'_, u64>, _total: ()) -> ProgramResult<()> {
        *v.data_mut() += 1;
        if *v.data() < self.limit {
            ctx.signal(ctx.vertex_id())?;
        }
        Ok(())
    }

    fn scatter_edges(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::None)
    }
}

/// Signals a vertex id that does not exist
#[derive(Clone)]
struct SignalsGhost;

impl VertexProgram for SignalsGhost {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn apply(&mut self, _ctx: &mut Context<'_>, _v: &mut VertexMut<'_, u64>, _total: ()) -> ProgramResult<()> {
        Ok(())
    }

    fn scatter(
        &self,
        ctx: &mut Context<'_>,
        _v: &VertexRef<'_, u64, ()>,
        _e: &EdgeRef<'_, u64, ()>,
    ) -> ProgramResult<()> {
        ctx.signal(999)
    }
}

/// Stamps each vertex with the order in which it ran
#[derive(Clone)]
struct Stamp {
    clock: Arc<AtomicUsize>,
}

impl VertexProgram for Stamp {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn apply(&mut self, _ctx: &mut Context<'_>, v: &mut VertexMut<'_, u64>, _total: ()) -> ProgramResult<()> {
        *v.data_mut() = self.clock.fetch_add(1, Ordering::SeqCst) as u64;
        Ok(())
    }

    fn scatter_edges(&self, _ctx: &mut Context<'_>, _v: &VertexRef<'_, u64, ()>) -> ProgramResult<EdgeDir> {
        Ok(EdgeDir::None)
    }
}

/// Marks itself and signals out-neighbors that are still unmarked
#[derive(Clone)]
struct MarkUnmarked;

impl VertexProgram for MarkUnmarked {
    type VertexData = u64;
    type EdgeData = ();
    type Gather = ();

    fn apply(&mut self, _ctx: &mut Context<'_>, v: &mut VertexMut<'_, u64>, _total: ()) -> ProgramResult<()> {
        *v.data_mut() = 1;
        Ok(())
    }

    fn scatter(
        &self,
        ctx: &mut Context<'_>,
        _v: &VertexRef<'_, u64, ()>,
        e: &EdgeRef<'_, u64, ()>,
    ) -> ProgramResult<()> {
        if *e.target().data() == 0 {
            ctx.signal_vertex(&e.target());
        }
        Ok(())
    }
}

/// Rejects every batch, counting the attempts
struct Unreachable {
    inner: LocalTransport,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl SignalTransport for Unreachable {
    fn num_partitions(&self) -> usize {
        self.inner.num_partitions()
    }

    async fn send(&self, partition: usize, _signals: &[Signal]) -> Result<(), TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Disconnected(partition))
    }
}

fn path(n: u64, partitions: usize) -> Graph<u64> {
    let mut graph = Graph::with_partitions(partitions);
    for id in 1..n {
        graph.add_edge(id, id + 1, ()).unwrap();
    }
    graph.finalize().unwrap();
    graph
}

fn config(mode: ExecutionMode) -> EngineConfig {
    EngineConfig::default().with_execution_mode(mode).with_seed(42)
}

#[tokio::test]
async fn test_engine_requires_finalized_graph() {
    let mut graph: Graph<u64> = Graph::with_partitions(2);
    graph.add_edge(1, 2, ()).unwrap();
    let result = Engine::new(&mut graph, Touch::default(), EngineConfig::default());
    assert!(matches!(result, Err(EngineError::GraphNotFinalized)));
}

#[tokio::test]
async fn test_signal_unknown_vertex() {
    let mut graph = path(3, 2);
    let mut engine = Engine::new(&mut graph, Touch::default(), EngineConfig::default()).unwrap();
    assert!(matches!(engine.signal(77), Err(EngineError::UnknownVertex(77))));
    assert_eq!(engine.pending_activations(), 0);
}

#[tokio::test]
async fn test_empty_queue_runs_nothing() {
    for mode in [ExecutionMode::Synchronous, ExecutionMode::Asynchronous] {
        let mut graph = path(3, 2);
        let mut engine = Engine::new(&mut graph, Touch::default(), config(mode)).unwrap();
        let summary = engine.start().await.unwrap();
        assert_eq!(summary.mode, mode);
        assert_eq!(summary.supersteps, 0);
        assert_eq!(summary.updates, 0);
    }
}

#[tokio::test]
async fn test_duplicate_signals_coalesce() {
    let mut graph = path(4, 2);
    let mut engine = Engine::new(&mut graph, Touch::default(), EngineConfig::default()).unwrap();
    engine.signal(2).unwrap();
    engine.signal(2).unwrap();
    engine.signal_all();
    assert_eq!(engine.pending_activations(), 4);

    let summary = engine.start().await.unwrap();
    assert_eq!(summary.updates, 4);
    drop(engine);
    assert_eq!(graph.vertex_data(2).unwrap(), 1);
}

#[tokio::test]
async fn test_callback_error_reports_vertex() {
    for mode in [ExecutionMode::Synchronous, ExecutionMode::Asynchronous] {
        let mut graph = path(5, 3);
        let program = Touch { fail_on: Some(4) };
        let mut engine = Engine::new(&mut graph, program, config(mode)).unwrap();
        engine.signal_all();

        let err = engine.start().await.unwrap_err();
        assert!(err.is_callback());
        assert_eq!(err.vertex_id(), Some(4));
        match err {
            EngineError::Callback { phase, source, .. } => {
                assert_eq!(phase, Phase::Apply);
                assert_eq!(source.message(), "refusing to touch");
            }
            other => panic!("Wrong error type: {other}"),
        }
    }
}

#[tokio::test]
async fn test_engine_reusable_after_failure() {
    let mut graph = path(5, 3);
    let program = Touch { fail_on: Some(4) };
    let mut engine = Engine::new(&mut graph, program, EngineConfig::default()).unwrap();
    engine.signal_all();
    assert!(engine.start().await.is_err());
    assert_eq!(engine.pending_activations(), 0);

    engine.signal(1).unwrap();
    let summary = engine.start().await.unwrap();
    assert_eq!(summary.updates, 1);
}

#[tokio::test]
async fn test_self_signal_reenters_queue() {
    for mode in [ExecutionMode::Synchronous, ExecutionMode::Asynchronous] {
        let mut graph: Graph<u64> = Graph::with_partitions(2);
        graph.add_vertex(5, 0).unwrap();
        graph.finalize().unwrap();

        let mut engine = Engine::new(&mut graph, SelfLoop { limit: 3 }, config(mode)).unwrap();
        engine.signal(5).unwrap();
        let summary = engine.start().await.unwrap();
        assert_eq!(summary.updates, 3);
        assert_eq!(summary.signals, 2);
        if mode == ExecutionMode::Synchronous {
            assert_eq!(summary.supersteps, 3);
        }
        drop(engine);
        assert_eq!(graph.vertex_data(5).unwrap(), 3);
    }
}

#[tokio::test]
async fn test_signal_to_unknown_vertex_fails_in_scatter() {
    let mut graph = path(2, 1);
    let mut engine = Engine::new(&mut graph, SignalsGhost, EngineConfig::default()).unwrap();
    engine.signal(1).unwrap();

    match engine.start().await.unwrap_err() {
        EngineError::Callback {
            vertex_id, phase, ..
        } => {
            assert_eq!(vertex_id, 1);
            assert_eq!(phase, Phase::Scatter);
        }
        other => panic!("Wrong error type: {other}"),
    }
}

#[tokio::test]
async fn test_max_supersteps_guard() {
    let mut graph: Graph<u64> = Graph::with_partitions(1);
    graph.add_vertex(1, 0).unwrap();
    graph.finalize().unwrap();

    let config = EngineConfig::default().with_max_supersteps(4);
    let mut engine = Engine::new(&mut graph, SelfLoop { limit: 100 }, config).unwrap();
    engine.signal(1).unwrap();
    let err = engine.start().await.unwrap_err();
    assert!(matches!(err, EngineError::MaxSuperstepsExceeded(4)));
}

#[tokio::test]
async fn test_activate_subset_and_vset() {
    let mut graph = path(6, 4);
    let mut engine = Engine::new(&mut graph, Touch::default(), EngineConfig::default()).unwrap();

    let selected = engine.activate_subset(|v| v.id() % 2 == 0).unwrap();
    assert_eq!(selected, 3);
    engine.start().await.unwrap();

    let odd = engine.select(|v| v.id() % 2 == 1).unwrap();
    assert_eq!(engine.select(|v| v.id() % 2 == 1).unwrap(), odd);
    engine.signal_vset(&odd).unwrap();
    engine.start().await.unwrap();

    let touched = engine.select(|v| *v.data() == 1).unwrap();
    assert_eq!(touched.len(), 6);
}

#[tokio::test]
async fn test_foreign_vertex_set_rejected() {
    let other = path(2, 1);
    let foreign = other.select(|_| true).unwrap();

    let mut graph = path(5, 2);
    let mut engine = Engine::new(&mut graph, Touch::default(), EngineConfig::default()).unwrap();
    assert!(matches!(
        engine.signal_vset(&foreign),
        Err(EngineError::ForeignVertexSet { expected: 5, found: 2 })
    ));
}

#[tokio::test]
async fn test_reseeding_accumulates_elapsed_time() {
    let mut graph = path(3, 2);
    let mut engine = Engine::new(&mut graph, Touch::default(), EngineConfig::default()).unwrap();

    engine.signal_all();
    let first = engine.start().await.unwrap();
    let after_first = engine.elapsed_seconds();
    engine.signal_all();
    let second = engine.start().await.unwrap();

    assert_eq!(first.updates, 3);
    assert_eq!(second.updates, 3);
    assert!(engine.elapsed_seconds() >= after_first);
    let total = engine
        .map_reduce_vertices(|v| *v.data(), |acc, x| *acc += x)
        .unwrap();
    assert_eq!(total, 6);
}

#[tokio::test]
async fn test_async_priority_then_fifo() {
    let mut graph: Graph<u64> = Graph::with_partitions(1);
    for id in 1..=5 {
        graph.add_vertex(id, 0).unwrap();
    }
    graph.finalize().unwrap();

    let program = Stamp {
        clock: Arc::new(AtomicUsize::new(0)),
    };
    let mut engine = Engine::new(&mut graph, program, config(ExecutionMode::Asynchronous)).unwrap();
    engine.signal_with_priority(4, 0.0).unwrap();
    engine.signal_with_priority(2, 1.0).unwrap();
    engine.signal_with_priority(5, 0.0).unwrap();
    engine.signal_with_priority(1, 3.0).unwrap();
    engine.signal_with_priority(3, 1.0).unwrap();
    engine.start().await.unwrap();
    drop(engine);

    let order: Vec<u64> = (1..=5).map(|id| graph.vertex_data(id).unwrap()).collect();
    // Runs 1, then 2 and 3 in arrival order, then 4 and 5
    assert_eq!(order, vec![0, 1, 2, 3, 4]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_many_partitions_touch_every_vertex() {
    let mut graph = path(200, 8);
    let mut engine = Engine::new(&mut graph, Touch::default(), config(ExecutionMode::Asynchronous)).unwrap();
    engine.signal_all();
    let summary = engine.start().await.unwrap();
    assert_eq!(summary.updates, 200);

    let total = engine
        .map_reduce_vertices(|v| *v.data(), |acc, x| *acc += x)
        .unwrap();
    assert_eq!(total, 200);
}

#[tokio::test]
async fn test_sync_scatter_sees_whole_superstep() {
    for partitions in [1, 2] {
        let mut graph: Graph<u64> = Graph::with_partitions(partitions);
        graph.add_edge(1, 2, ()).unwrap();
        graph.add_edge(2, 1, ()).unwrap();
        graph.finalize().unwrap();

        let mut engine = Engine::new(&mut graph, MarkUnmarked, config(ExecutionMode::Synchronous)).unwrap();
        engine.signal_all();
        let summary = engine.start().await.unwrap();

        // Both vertices are marked before either scatters
        assert_eq!(summary.supersteps, 1);
        assert_eq!(summary.updates, 2);
        assert_eq!(summary.signals, 0);
    }
}

#[tokio::test]
async fn test_sync_scatter_sees_whole_superstep_on_larger_cycle() {
    let mut graph: Graph<u64> = Graph::with_partitions(3);
    for id in 1..=9 {
        graph.add_edge(id, id % 9 + 1, ()).unwrap();
    }
    graph.finalize().unwrap();

    let mut engine = Engine::new(&mut graph, MarkUnmarked, config(ExecutionMode::Synchronous)).unwrap();
    engine.activate_subset(|v| v.id() % 2 == 1).unwrap();
    let summary = engine.start().await.unwrap();

    // Odd vertices mark themselves, then only 9 -> 1 points at a marked vertex
    assert_eq!(summary.supersteps, 2);
    assert_eq!(summary.signals, 4);
    drop(engine);
    assert!((1..=9).all(|id| graph.vertex_data(id).unwrap() == 1));
}

#[tokio::test]
async fn test_delivery_failure_through_custom_transport() {
    for mode in [ExecutionMode::Synchronous, ExecutionMode::Asynchronous] {
        let mut graph = path(4, 2);
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let layer: TransportLayer = Arc::new(move |inner: LocalTransport| {
            Arc::new(Unreachable {
                inner,
                attempts: Arc::clone(&counter),
            }) as Arc<dyn SignalTransport>
        });
        let retry = RetryPolicy::new(1)
            .with_backoff_base(Duration::from_millis(1))
            .with_backoff_max(Duration::from_millis(2));

        let mut engine =
            Engine::with_transport(&mut graph, MarkUnmarked, config(mode).with_delivery_retry(retry), layer)
                .unwrap();
        engine.signal(1).unwrap();

        match engine.start().await.unwrap_err() {
            EngineError::DeliveryFailed { attempts: tried, .. } => assert_eq!(tried, 2),
            other => panic!("Wrong error type: {other}"),
        }
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(engine.pending_activations(), 0);
    }
}

#[tokio::test]
async fn test_local_layer_matches_default_engine() {
    let mut graph = path(5, 2);
    let mut engine = Engine::with_transport(
        &mut graph,
        MarkUnmarked,
        config(ExecutionMode::Synchronous),
        gas_engine::local_layer(),
    )
    .unwrap();
    engine.signal(1).unwrap();
    let summary = engine.start().await.unwrap();
    assert_eq!(summary.updates, 5);
    assert_eq!(summary.supersteps, 5);
}
