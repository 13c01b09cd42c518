// src/hierarchy.rs - Hierarchical pore container (per-pore groups plus edge/interior index)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{PoreError, Result};
use crate::output::ensure_writable;
use crate::pore::{Polygon, PoreRecord};

/// One pore's group: attributes, outer ring and inclusion rings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PoreGroup {
    pub index: usize,
    pub is_edge: bool,
    pub area: f64,
    pub perimeter: f64,
    pub num_children: usize,
    /// Outer ring as `[x, y]` points
    pub parent: Vec<[i32; 2]>,
    /// Inclusion rings keyed by their position in the pore
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<usize, Vec<[i32; 2]>>>,
}

/// Every pore of one mosaic, keyed by pore id, plus the edge/interior split
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PoreHierarchy {
    pub contours: BTreeMap<usize, PoreGroup>,
    pub edge_pores: Vec<usize>,
    pub interior_pores: Vec<usize>,
}

fn ring_points(polygon: &Polygon) -> Vec<[i32; 2]> {
    polygon.points().iter().map(|p| [p.x, p.y]).collect()
}

impl PoreHierarchy {
    pub fn from_pores(pores: &[PoreRecord]) -> Self {
        let mut hierarchy = PoreHierarchy::default();

        for pore in pores {
            let children = (!pore.inclusions.is_empty()).then(|| {
                pore.inclusions
                    .iter()
                    .enumerate()
                    .map(|(idx, inclusion)| (idx, ring_points(inclusion)))
                    .collect()
            });

            hierarchy.contours.insert(
                pore.id,
                PoreGroup {
                    index: pore.id,
                    is_edge: pore.is_edge,
                    area: pore.net_area,
                    perimeter: pore.net_perimeter,
                    num_children: pore.num_inclusions(),
                    parent: ring_points(&pore.outer),
                    children,
                },
            );

            if pore.is_edge {
                hierarchy.edge_pores.push(pore.id);
            } else {
                hierarchy.interior_pores.push(pore.id);
            }
        }

        hierarchy
    }

    /// Check internal consistency of a loaded container
    pub fn validate(&self) -> Result<()> {
        for (&id, group) in &self.contours {
            if group.index != id {
                return Err(PoreError::InvalidHierarchy(format!(
                    "group {} carries index {}",
                    id, group.index
                )));
            }

            let stored = group.children.as_ref().map_or(0, BTreeMap::len);
            if stored != group.num_children {
                return Err(PoreError::InvalidHierarchy(format!(
                    "pore {} declares {} children but stores {}",
                    id, group.num_children, stored
                )));
            }

            let listed_edge = self.edge_pores.contains(&id);
            let listed_interior = self.interior_pores.contains(&id);
            if listed_edge == listed_interior || listed_edge != group.is_edge {
                return Err(PoreError::InvalidHierarchy(format!(
                    "pore {} is not listed exactly once in the edge/interior index",
                    id
                )));
            }
        }

        if self.edge_pores.len() + self.interior_pores.len() != self.contours.len() {
            return Err(PoreError::InvalidHierarchy(
                "edge/interior index references unknown pores".to_string(),
            ));
        }

        Ok(())
    }
}

/// Serialize a hierarchy as JSON
pub fn write_pore_hierarchy<P: AsRef<Path>>(
    hierarchy: &PoreHierarchy,
    path: P,
    overwrite: bool,
) -> Result<()> {
    let path = path.as_ref();
    ensure_writable(path, overwrite)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, hierarchy)?;
    writer.flush()?;

    Ok(())
}

/// Load and validate a hierarchy written by `write_pore_hierarchy`
pub fn load_pore_hierarchy<P: AsRef<Path>>(path: P) -> Result<PoreHierarchy> {
    let reader = BufReader::new(File::open(path)?);
    let hierarchy: PoreHierarchy = serde_json::from_reader(reader)?;
    hierarchy.validate()?;
    Ok(hierarchy)
}
