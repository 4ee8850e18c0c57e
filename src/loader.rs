//! TSPLIB EUC_2D instance loading and writing.
//!
//! Parses the line-oriented `KEY : value` header followed by a
//! `NODE_COORD_SECTION` body, as published by TSPLIB95. Only the
//! `EUC_2D` edge weight type is supported; anything else is rejected
//! rather than silently mis-scaled.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::city::{City, Graph};
use crate::error::SolverError;

const SUPPORTED_EDGE_WEIGHT_TYPES: &[&str] = &["EUC_2D"];

/// Split a TSPLIB header line of the form `KEY : value` or `KEY: value`
/// into its trimmed key and value halves.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Parse a TSPLIB-formatted EUC_2D instance from a string.
pub fn parse_tsplib(contents: &str) -> Result<Graph, SolverError> {
    let mut dimension: Option<usize> = None;
    let mut edge_weight_type: Option<String> = None;
    let mut lines = contents.lines();
    let mut in_coord_section = false;
    let mut slots: Vec<Option<City>> = Vec::new();
    let mut seen_ids: HashSet<usize> = HashSet::new();

    while let Some(raw_line) = lines.next() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        if !in_coord_section {
            if line == "NODE_COORD_SECTION" {
                let dim = dimension.ok_or_else(|| {
                    SolverError::ParseError("NODE_COORD_SECTION appeared before DIMENSION".to_string())
                })?;
                slots = vec![None; dim];
                in_coord_section = true;
                continue;
            }
            if line == "EOF" {
                break;
            }
            if let Some((key, value)) = split_header_line(line) {
                match key {
                    "DIMENSION" => {
                        let dim: usize = value
                            .parse()
                            .map_err(|_| SolverError::ParseError(format!("invalid DIMENSION value: {value}")))?;
                        dimension = Some(dim);
                    }
                    "EDGE_WEIGHT_TYPE" => {
                        edge_weight_type = Some(value.to_string());
                    }
                    _ => {}
                }
            }
            continue;
        }

        if line == "EOF" {
            break;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(SolverError::ParseError(format!("malformed coordinate line: {line}")));
        }
        let file_id: usize = fields[0]
            .parse()
            .map_err(|_| SolverError::ParseError(format!("invalid node id: {}", fields[0])))?;
        let x: f64 = fields[1]
            .parse()
            .map_err(|_| SolverError::ParseError(format!("invalid x coordinate: {}", fields[1])))?;
        let y: f64 = fields[2]
            .parse()
            .map_err(|_| SolverError::ParseError(format!("invalid y coordinate: {}", fields[2])))?;

        if file_id == 0 || file_id > slots.len() {
            return Err(SolverError::ParseError(format!(
                "node id {file_id} out of range for DIMENSION {}",
                slots.len()
            )));
        }
        let index = file_id - 1;
        if !seen_ids.insert(file_id) {
            return Err(SolverError::ParseError(format!("duplicate node id {file_id}")));
        }
        slots[index] = Some(City::new(index, x, y));
    }

    let edge_weight_type =
        edge_weight_type.ok_or_else(|| SolverError::ParseError("missing EDGE_WEIGHT_TYPE".to_string()))?;
    if !SUPPORTED_EDGE_WEIGHT_TYPES.contains(&edge_weight_type.as_str()) {
        return Err(SolverError::ParseError(format!(
            "unsupported EDGE_WEIGHT_TYPE: {edge_weight_type} (only EUC_2D is supported)"
        )));
    }

    if slots.is_empty() {
        return Err(SolverError::ParseError("instance has no NODE_COORD_SECTION".to_string()));
    }

    let mut cities = Vec::with_capacity(slots.len());
    for (index, slot) in slots.into_iter().enumerate() {
        let city = slot.ok_or_else(|| SolverError::ParseError(format!("missing coordinates for node id {}", index + 1)))?;
        cities.push(city);
    }

    Graph::new(cities)
}

/// Read and parse a TSPLIB EUC_2D instance file.
pub fn load_tsplib_file(path: &Path) -> Result<Graph, SolverError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| SolverError::ParseError(format!("failed to read {}: {e}", path.display())))?;
    parse_tsplib(&contents)
}

/// Serialize a graph back into TSPLIB EUC_2D format (1-based ids),
/// primarily for round-trip testing and benchmark fixture generation.
pub fn write_tsplib(name: &str, graph: &Graph) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "NAME: {name}");
    let _ = writeln!(out, "TYPE: TSP");
    let _ = writeln!(out, "DIMENSION: {}", graph.num_cities());
    let _ = writeln!(out, "EDGE_WEIGHT_TYPE: EUC_2D");
    let _ = writeln!(out, "NODE_COORD_SECTION");
    for city in &graph.cities {
        let _ = writeln!(out, "{} {} {}", city.id + 1, city.x, city.y);
    }
    let _ = writeln!(out, "EOF");
    out
}
