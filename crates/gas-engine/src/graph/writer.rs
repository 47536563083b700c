//! Per-partition result files
//!
//! `save` writes one file per partition named `{prefix}_{k}_of_{n}` (k is
//! 1-based), containing the formatted lines of the vertices and/or edges
//! that partition owns. Edges are owned by their source vertex's partition.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{EdgeRef, Graph, VertexRef};
use crate::error::EngineError;

/// Formats vertices and edges as text
///
/// Returned strings are written verbatim, so they should carry their own
/// line terminator.
pub trait GraphWriter<V, E> {
    fn save_vertex(&self, vertex: &VertexRef<'_, V, E>) -> String;

    fn save_edge(&self, _edge: &EdgeRef<'_, V, E>) -> String {
        String::new()
    }
}

/// Which records `save` writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    pub vertices: bool,
    pub edges: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            vertices: true,
            edges: false,
        }
    }
}

impl<V, E> Graph<V, E> {
    /// Write one file per partition, returning their paths in partition order
    pub fn save<W>(
        &self,
        prefix: impl AsRef<Path>,
        writer: &W,
        options: SaveOptions,
    ) -> Result<Vec<PathBuf>, EngineError>
    where
        W: GraphWriter<V, E> + ?Sized,
    {
        let shared = self.shared()?;
        let topology = &shared.topology;
        let prefix = prefix.as_ref();

        if let Some(parent) = prefix.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }

        let num_partitions = topology.num_partitions();
        let mut paths = Vec::with_capacity(num_partitions);
        for partition in 0..num_partitions {
            let path = partition_path(prefix, partition, num_partitions);
            let file = File::create(&path).map_err(|e| EngineError::io(&path, e))?;
            let mut out = BufWriter::new(file);

            for &index in topology.partition(partition) {
                if options.vertices {
                    let line = writer.save_vertex(&shared.vertex(index));
                    out.write_all(line.as_bytes())
                        .map_err(|e| EngineError::io(&path, e))?;
                }
                if options.edges {
                    for &edge in topology.out_edges(index) {
                        let line = writer.save_edge(&shared.edge(edge));
                        out.write_all(line.as_bytes())
                            .map_err(|e| EngineError::io(&path, e))?;
                    }
                }
            }
            out.flush().map_err(|e| EngineError::io(&path, e))?;
            paths.push(path);
        }

        info!(prefix = %prefix.display(), files = paths.len(), "Graph saved");
        Ok(paths)
    }
}

fn partition_path(prefix: &Path, partition: usize, num_partitions: usize) -> PathBuf {
    let mut name = prefix.as_os_str().to_os_string();
    name.push(format!("_{}_of_{}", partition + 1, num_partitions));
    PathBuf::from(name)
}
