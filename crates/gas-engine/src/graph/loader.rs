//! Edge-list loaders
//!
//! `path` may name a single file or a directory, in which case every regular,
//! non-hidden file inside it is read in name order.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Graph, VertexId};
use crate::error::EngineError;

/// Supported edge-list formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// One `source<ws>target` pair per line; blank lines are skipped
    #[default]
    Tsv,
    /// Like `Tsv`, plus `#` comment lines (SNAP datasets)
    Snap,
}

impl fmt::Display for GraphFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphFormat::Tsv => f.write_str("tsv"),
            GraphFormat::Snap => f.write_str("snap"),
        }
    }
}

impl FromStr for GraphFormat {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tsv" => Ok(GraphFormat::Tsv),
            "snap" => Ok(GraphFormat::Snap),
            other => Err(EngineError::config_error(format!(
                "unknown graph format '{other}' (expected tsv or snap)"
            ))),
        }
    }
}

impl GraphFormat {
    /// Parse one line into an edge, `Ok(None)` for lines carrying no edge
    fn parse_line(&self, line: &str) -> Result<Option<(VertexId, VertexId)>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if *self == GraphFormat::Snap && line.starts_with('#') {
            return Ok(None);
        }

        let mut fields = line.split_whitespace();
        let (Some(source), Some(target), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(format!("expected two vertex ids, found '{line}'"));
        };
        let source = source
            .parse()
            .map_err(|_| format!("invalid source vertex id '{source}'"))?;
        let target = target
            .parse()
            .map_err(|_| format!("invalid target vertex id '{target}'"))?;
        Ok(Some((source, target)))
    }
}

impl<V: Default, E: Default> Graph<V, E> {
    /// Load edges from `path`, returning the number of edges added
    pub fn load(&mut self, path: impl AsRef<Path>, format: GraphFormat) -> Result<usize, EngineError> {
        let path = path.as_ref();
        let files = collect_files(path)?;
        let mut loaded = 0;

        for file in &files {
            let reader = BufReader::new(File::open(file).map_err(|e| EngineError::io(file, e))?);
            let mut edges = 0;
            for (number, line) in reader.lines().enumerate() {
                let line = line.map_err(|e| EngineError::io(file, e))?;
                let edge = format
                    .parse_line(&line)
                    .map_err(|message| EngineError::parse(file, number + 1, message))?;
                if let Some((source, target)) = edge {
                    self.add_edge(source, target, E::default())?;
                    edges += 1;
                }
            }
            debug!(file = %file.display(), edges, "Loaded edge file");
            loaded += edges;
        }

        info!(
            path = %path.display(),
            format = %format,
            files = files.len(),
            edges = loaded,
            "Graph loaded"
        );
        Ok(loaded)
    }
}

fn collect_files(path: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let metadata = fs::metadata(path).map_err(|e| EngineError::io(path, e))?;
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(|e| EngineError::io(path, e))? {
        let entry = entry.map_err(|e| EngineError::io(path, e))?;
        let file = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if file.is_file() && !hidden {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_tsv_line() {
        let format = GraphFormat::Tsv;
        assert_eq!(format.parse_line("1\t2"), Ok(Some((1, 2))));
        assert_eq!(format.parse_line("  3   4 "), Ok(Some((3, 4))));
        assert_eq!(format.parse_line(""), Ok(None));
        assert!(format.parse_line("# comment").is_err());
        assert!(format.parse_line("1").is_err());
        assert!(format.parse_line("1 2 3").is_err());
        assert!(format.parse_line("a 2").is_err());
    }

    #[test]
    fn test_parse_snap_comments() {
        let format = GraphFormat::Snap;
        assert_eq!(format.parse_line("# Nodes: 4 Edges: 5"), Ok(None));
        assert_eq!(format.parse_line("10 20"), Ok(Some((10, 20))));
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("TSV".parse::<GraphFormat>().unwrap(), GraphFormat::Tsv);
        assert_eq!("snap".parse::<GraphFormat>().unwrap(), GraphFormat::Snap);
        assert!("adj".parse::<GraphFormat>().is_err());
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = File::create(dir.path().join("part-0")).unwrap();
        writeln!(a, "1\t2\n2\t3").unwrap();
        let mut b = File::create(dir.path().join("part-1")).unwrap();
        writeln!(b, "3\t1\n\n").unwrap();
        File::create(dir.path().join(".hidden")).unwrap();

        let mut graph: Graph<f64> = Graph::with_partitions(2);
        let loaded = graph.load(dir.path(), GraphFormat::Tsv).unwrap();
        assert_eq!(loaded, 3);
        assert_eq!(graph.num_vertices(), 3);
        assert_eq!(graph.num_edges(), 3);
    }

    #[test]
    fn test_load_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.tsv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "1\t2\n2\tx").unwrap();

        let mut graph: Graph<f64> = Graph::with_partitions(1);
        match graph.load(&path, GraphFormat::Tsv) {
            Err(EngineError::Parse { line, message, .. }) => {
                assert_eq!(line, 2);
                assert!(message.contains("'x'"));
            }
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_load_missing_path() {
        let mut graph: Graph<f64> = Graph::with_partitions(1);
        let result = graph.load("/definitely/not/here", GraphFormat::Snap);
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }

    #[test]
    fn test_load_after_finalize_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.tsv");
        std::fs::write(&path, "1 2\n").unwrap();

        let mut graph: Graph<f64> = Graph::with_partitions(1);
        graph.finalize().unwrap();
        let result = graph.load(&path, GraphFormat::Tsv);
        assert!(matches!(result, Err(EngineError::GraphAlreadyFinalized)));
    }
}
