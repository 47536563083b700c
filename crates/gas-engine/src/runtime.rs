//! Gather/Apply/Scatter execution for a single vertex
//!
//! The protocol is split at the point where the new payload becomes visible
//! to other vertices. [`gather_apply`] reads committed neighbor payloads and
//! produces the new payload without publishing it, [`commit`] publishes it
//! and [`scatter`] walks the scatter edges. The synchronous scheduler puts a
//! barrier between each step; the asynchronous one runs them back to back.

use rand_chacha::ChaCha8Rng;

use crate::channel::Signal;
use crate::error::{EngineError, Phase};
use crate::graph::{Shared, VertexMut};
use crate::program::{Context, GatherValue, VertexProgram};

type SharedGraph<P> = Shared<<P as VertexProgram>::VertexData, <P as VertexProgram>::EdgeData>;

/// Program instance and payload produced by gather+apply, not yet published
pub(crate) struct Applied<P: VertexProgram> {
    pub index: usize,
    pub program: P,
    pub data: P::VertexData,
    pub signals: Vec<Signal>,
}

pub(crate) fn gather_apply<P: VertexProgram>(
    prototype: &P,
    shared: &SharedGraph<P>,
    index: usize,
    superstep: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Applied<P>, EngineError> {
    let topology = &shared.topology;
    let vertex = shared.vertex(index);
    let id = vertex.id();
    let mut program = prototype.clone();
    let mut ctx = Context::new(id, superstep, topology.ids(), rng);

    let dir = program
        .gather_edges(&mut ctx, &vertex)
        .map_err(|e| EngineError::callback(id, Phase::GatherEdges, e))?;

    let mut total = P::Gather::default();
    for edge in topology.incident(index, dir) {
        let partial = program
            .gather(&mut ctx, &vertex, &shared.edge(edge))
            .map_err(|e| EngineError::callback(id, Phase::Gather, e))?;
        total.merge(partial);
    }

    let mut data = vertex.data().clone();
    let mut view = VertexMut::new(id, vertex.num_in_edges(), vertex.num_out_edges(), &mut data);
    program
        .apply(&mut ctx, &mut view, total)
        .map_err(|e| EngineError::callback(id, Phase::Apply, e))?;

    Ok(Applied {
        index,
        program,
        signals: ctx.into_signals(),
        data,
    })
}

/// Program instance and pending signals of a vertex whose payload is published
pub(crate) struct Committed<P: VertexProgram> {
    pub index: usize,
    pub program: P,
    pub signals: Vec<Signal>,
}

/// Publish the payload produced by [`gather_apply`]
pub(crate) fn commit<P: VertexProgram>(applied: Applied<P>, shared: &SharedGraph<P>) -> Committed<P> {
    let Applied {
        index,
        program,
        data,
        signals,
    } = applied;
    *shared.store.write(index) = data;
    Committed {
        index,
        program,
        signals,
    }
}

pub(crate) fn scatter<P: VertexProgram>(
    committed: Committed<P>,
    shared: &SharedGraph<P>,
    superstep: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Signal>, EngineError> {
    let Committed {
        index,
        program,
        mut signals,
    } = committed;

    let topology = &shared.topology;
    let vertex = shared.vertex(index);
    let id = vertex.id();
    let mut ctx = Context::new(id, superstep, topology.ids(), rng);

    let dir = program
        .scatter_edges(&mut ctx, &vertex)
        .map_err(|e| EngineError::callback(id, Phase::ScatterEdges, e))?;
    for edge in topology.incident(index, dir) {
        program
            .scatter(&mut ctx, &vertex, &shared.edge(edge))
            .map_err(|e| EngineError::callback(id, Phase::Scatter, e))?;
    }

    signals.extend(ctx.into_signals());
    Ok(signals)
}

/// Full cycle for one vertex, used by the asynchronous scheduler
pub(crate) fn run_vertex<P: VertexProgram>(
    prototype: &P,
    shared: &SharedGraph<P>,
    index: usize,
    rng: &mut ChaCha8Rng,
) -> Result<Vec<Signal>, EngineError> {
    let applied = gather_apply(prototype, shared, index, 0, rng)?;
    scatter(commit(applied, shared), shared, 0, rng)
}
