use glam::{Vec2, Vec3};
use thiserror::Error;

/// Size in bytes of a single vertex component (all attributes are `f32`).
pub const COMPONENT_SIZE: u32 = std::mem::size_of::<f32>() as u32;

/// Layout problems and malformed vertex data rejected at mesh creation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("vertex layout must declare at least one attribute")]
    EmptyLayout,
    #[error("attribute at location {location} has {components} components (expected 1..=4)")]
    InvalidComponentCount { location: u32, components: u32 },
    #[error("attribute location {0} is declared more than once")]
    DuplicateLocation(u32),
    #[error("attribute at location {location} starts at byte {offset}, not after the previous attribute")]
    NonMonotonicOffset { location: u32, offset: u32 },
    #[error("attribute at location {location} ends at byte {end}, past the {stride}-byte stride")]
    AttributeOutOfBounds { location: u32, end: u32, stride: u32 },
    #[error("mesh has no vertex data")]
    Empty,
    #[error("vertex data is {len} bytes, not a multiple of the {stride}-byte stride")]
    LengthNotMultipleOfStride { len: usize, stride: u32 },
}

/// One `f32`-based vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub offset: u32,
}

impl VertexAttribute {
    pub const fn new(location: u32, components: u32, offset: u32) -> Self {
        Self {
            location,
            components,
            offset,
        }
    }

    /// First byte past the attribute, or `None` if it lies beyond `u32::MAX`.
    fn end(&self) -> Option<u32> {
        self.components
            .checked_mul(COMPONENT_SIZE)
            .and_then(|size| self.offset.checked_add(size))
    }
}

/// Validated attribute layout shared by every vertex of a mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
    stride: u32,
}

impl VertexLayout {
    pub fn new(attributes: Vec<VertexAttribute>) -> Result<Self, MeshError> {
        if attributes.is_empty() {
            return Err(MeshError::EmptyLayout);
        }
        if let Some(bad) = attributes.iter().find(|a| !(1..=4).contains(&a.components)) {
            return Err(MeshError::InvalidComponentCount {
                location: bad.location,
                components: bad.components,
            });
        }
        // at most 16 bytes per attribute
        let stride = attributes
            .iter()
            .try_fold(0u32, |stride, a| stride.checked_add(a.components * COMPONENT_SIZE))
            .ok_or(MeshError::AttributeOutOfBounds {
                location: attributes[attributes.len() - 1].location,
                end: u32::MAX,
                stride: u32::MAX,
            })?;

        let mut previous_end = None;
        let mut seen = Vec::with_capacity(attributes.len());
        for attribute in &attributes {
            if seen.contains(&attribute.location) {
                return Err(MeshError::DuplicateLocation(attribute.location));
            }
            seen.push(attribute.location);
            if previous_end.is_some_and(|end| attribute.offset < end) {
                return Err(MeshError::NonMonotonicOffset {
                    location: attribute.location,
                    offset: attribute.offset,
                });
            }
            match attribute.end() {
                Some(end) if end <= stride => previous_end = Some(end),
                end => {
                    return Err(MeshError::AttributeOutOfBounds {
                        location: attribute.location,
                        end: end.unwrap_or(u32::MAX),
                        stride,
                    })
                }
            }
        }

        Ok(Self { attributes, stride })
    }

    /// Position (3), normal (3) and texture coordinate (2), tightly packed.
    pub fn position_normal_uv() -> Self {
        Self {
            attributes: vec![
                VertexAttribute::new(0, 3, 0),
                VertexAttribute::new(1, 3, 3 * COMPONENT_SIZE),
                VertexAttribute::new(2, 2, 6 * COMPONENT_SIZE),
            ],
            stride: 8 * COMPONENT_SIZE,
        }
    }

    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Bytes between consecutive vertices.
    pub fn stride(&self) -> u32 {
        self.stride
    }
}

/// CPU-side vertex data paired with its layout.
///
/// The vertex count is always derived from the byte length so it can never
/// drift from what is actually uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    vertices: Vec<f32>,
    layout: VertexLayout,
}

impl MeshData {
    pub fn new(vertices: Vec<f32>, layout: VertexLayout) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        let len = vertices.len() * COMPONENT_SIZE as usize;
        if len % layout.stride() as usize != 0 {
            return Err(MeshError::LengthNotMultipleOfStride {
                len,
                stride: layout.stride(),
            });
        }
        Ok(Self { vertices, layout })
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertices(&self) -> &[f32] {
        &self.vertices
    }

    pub fn bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn vertex_count(&self) -> u32 {
        (self.bytes().len() / self.layout.stride() as usize) as u32
    }
}

/// Square pyramid with unit base centred on the origin, apex on +Y.
///
/// Faces are flat shaded: each triangle carries its own face normal.
pub fn pyramid() -> Result<MeshData, MeshError> {
    MeshData::new(pyramid_vertices(), VertexLayout::position_normal_uv())
}

/// Interleaved position/normal/uv data for [`pyramid`].
pub fn pyramid_vertices() -> Vec<f32> {
    let apex = Vec3::new(0.0, 0.5, 0.0);
    let corners = [
        Vec3::new(-0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, 0.5),
        Vec3::new(0.5, -0.5, -0.5),
        Vec3::new(-0.5, -0.5, -0.5),
    ];

    let mut vertices = Vec::with_capacity(18 * 8);
    let mut push_triangle = |points: [(Vec3, Vec2); 3]| {
        let normal = (points[1].0 - points[0].0)
            .cross(points[2].0 - points[0].0)
            .normalize();
        for (position, uv) in points {
            vertices.extend_from_slice(&position.to_array());
            vertices.extend_from_slice(&normal.to_array());
            vertices.extend_from_slice(&uv.to_array());
        }
    };

    // base, facing down
    push_triangle([
        (corners[0], Vec2::new(0.0, 1.0)),
        (corners[3], Vec2::new(0.0, 0.0)),
        (corners[2], Vec2::new(1.0, 0.0)),
    ]);
    push_triangle([
        (corners[2], Vec2::new(1.0, 0.0)),
        (corners[1], Vec2::new(1.0, 1.0)),
        (corners[0], Vec2::new(0.0, 1.0)),
    ]);

    for side in 0..corners.len() {
        let next = (side + 1) % corners.len();
        push_triangle([
            (corners[side], Vec2::new(0.0, 0.0)),
            (corners[next], Vec2::new(1.0, 0.0)),
            (apex, Vec2::new(0.5, 1.0)),
        ]);
    }

    vertices
}
