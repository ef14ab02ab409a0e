//! Editable vertex geometry.
//!
//! Renderers expose annotation geometry to the editing tools as a
//! [`CompoundPath`]: the primary vertex path plus any additional sub-paths
//! (polygon holes, disjoint regions). Each vertex carries a selection flag
//! consumed by the vertex-editing tools.

use crate::geometry::ImagePoint;

/// A single editable vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditablePoint {
    pub pos: ImagePoint,
    pub is_selected: bool,
}

impl EditablePoint {
    pub fn new(pos: ImagePoint) -> Self {
        Self {
            pos,
            is_selected: false,
        }
    }

    pub fn selected(pos: ImagePoint) -> Self {
        Self {
            pos,
            is_selected: true,
        }
    }
}

/// A primary path plus zero or more additional sub-paths.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompoundPath {
    pub path: Vec<EditablePoint>,
    pub additional_paths: Vec<Vec<EditablePoint>>,
}

impl CompoundPath {
    pub fn new(path: Vec<EditablePoint>) -> Self {
        Self {
            path,
            additional_paths: Vec::new(),
        }
    }

    pub fn from_points(points: &[ImagePoint]) -> Self {
        Self::new(points.iter().copied().map(EditablePoint::new).collect())
    }

    /// All sub-paths in order: the primary path first, then the additional
    /// ones.
    pub fn all_paths(&self) -> impl Iterator<Item = &Vec<EditablePoint>> {
        std::iter::once(&self.path).chain(self.additional_paths.iter())
    }

    /// Every vertex across every sub-path.
    pub fn all_vertices(&self) -> impl Iterator<Item = &EditablePoint> {
        self.all_paths().flatten()
    }

    /// The bare image points of every sub-path.
    pub fn to_point_paths(&self) -> Vec<Vec<ImagePoint>> {
        self.all_paths()
            .map(|path| path.iter().map(|v| v.pos).collect())
            .collect()
    }
}

/// What deleting the currently selected vertex should do.
#[derive(Debug, Clone, PartialEq)]
pub enum DeletableVertexContext {
    /// The selected vertex sits on a sub-path that would degenerate: the
    /// whole annotation data must be rewritten to the given point paths
    /// (the offending sub-path already dropped).
    Update {
        paths: Vec<Vec<ImagePoint>>,
        sub_path_index: usize,
    },
    /// The vertex can be removed in place from the given sub-path.
    DeleteVertex {
        sub_path_index: usize,
        vertex_index: usize,
    },
}

/// Resolve what deleting the selected vertex of a compound path means.
///
/// A sub-path with three or fewer points is not independently
/// vertex-deletable: removing a vertex there must drop the whole sub-path
/// from the annotation data instead. Returns `None` when no vertex is
/// selected anywhere.
pub fn resolve_deletable_vertex_context(
    compound: &CompoundPath,
) -> Option<DeletableVertexContext> {
    for (sub_path_index, path) in compound.all_paths().enumerate() {
        let Some(vertex_index) = path.iter().position(|v| v.is_selected) else {
            continue;
        };

        if path.len() <= 3 {
            let paths = compound
                .all_paths()
                .enumerate()
                .filter(|(index, _)| *index != sub_path_index)
                .map(|(_, path)| path.iter().map(|v| v.pos).collect())
                .collect();
            return Some(DeletableVertexContext::Update {
                paths,
                sub_path_index,
            });
        }

        return Some(DeletableVertexContext::DeleteVertex {
            sub_path_index,
            vertex_index,
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn path_of(points: &[(f32, f32)], selected: Option<usize>) -> Vec<EditablePoint> {
        points
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                let pos = Point::new(x, y);
                if selected == Some(i) {
                    EditablePoint::selected(pos)
                } else {
                    EditablePoint::new(pos)
                }
            })
            .collect()
    }

    #[test]
    fn test_three_point_sub_path_resolves_to_update() {
        let compound = CompoundPath {
            path: path_of(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)], None),
            additional_paths: vec![path_of(&[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0)], Some(1))],
        };

        match resolve_deletable_vertex_context(&compound) {
            Some(DeletableVertexContext::Update {
                paths,
                sub_path_index,
            }) => {
                assert_eq!(sub_path_index, 1);
                // The degenerate sub-path is dropped; the primary survives.
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].len(), 4);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn test_four_point_sub_path_resolves_to_delete_vertex() {
        let compound = CompoundPath::new(path_of(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            Some(2),
        ));

        assert_eq!(
            resolve_deletable_vertex_context(&compound),
            Some(DeletableVertexContext::DeleteVertex {
                sub_path_index: 0,
                vertex_index: 2,
            })
        );
    }

    #[test]
    fn test_no_selected_vertex_resolves_to_none() {
        let compound = CompoundPath::new(path_of(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            None,
        ));
        assert_eq!(resolve_deletable_vertex_context(&compound), None);
    }

    #[test]
    fn test_primary_three_point_path_drops_itself() {
        let compound = CompoundPath {
            path: path_of(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], Some(0)),
            additional_paths: vec![path_of(
                &[(1.0, 1.0), (2.0, 1.0), (2.0, 2.0), (1.0, 2.0)],
                None,
            )],
        };

        match resolve_deletable_vertex_context(&compound) {
            Some(DeletableVertexContext::Update {
                paths,
                sub_path_index,
            }) => {
                assert_eq!(sub_path_index, 0);
                assert_eq!(paths.len(), 1);
                assert_eq!(paths[0].len(), 4);
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }
}
