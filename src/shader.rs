//! WGSL shader programs compiled and reflected on the CPU.
//!
//! Each stage is parsed and validated with naga on its own, then the two
//! stages are linked: the vertex outputs must cover the fragment inputs and
//! uniform blocks shared between the stages must agree on their layout.
//! The linked program keeps a flattened uniform table (for example
//! `lights.points[2].position`) backed by CPU-side block storage which the
//! renderer copies into GPU buffers before each draw.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytemuck::{bytes_of, pod_read_unaligned};
use glam::{Mat4, Vec3};
use naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use naga::{
    AddressSpace, ArraySize, Binding, Handle, Module, ScalarKind, Type, TypeInner, VectorSize,
};
use thiserror::Error;

/// Pipeline stage a [`CompileError`] is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Link => "link",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} stage failed: {log}")]
pub struct CompileError {
    pub stage: ShaderStage,
    pub log: String,
}

impl CompileError {
    fn new(stage: ShaderStage, log: impl Into<String>) -> Self {
        Self {
            stage,
            log: log.into(),
        }
    }
}

/// Value types the uniform setters understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Int,
    Uint,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformKind {
    pub fn size(self) -> usize {
        match self {
            UniformKind::Int | UniformKind::Uint | UniformKind::Float => 4,
            UniformKind::Vec2 => 8,
            UniformKind::Vec3 => 12,
            UniformKind::Vec4 => 16,
            UniformKind::Mat4 => 64,
        }
    }

    fn from_type(inner: &TypeInner) -> Option<Self> {
        match *inner {
            TypeInner::Scalar {
                kind: ScalarKind::Sint,
                width: 4,
            } => Some(UniformKind::Int),
            TypeInner::Scalar {
                kind: ScalarKind::Uint,
                width: 4,
            } => Some(UniformKind::Uint),
            TypeInner::Scalar {
                kind: ScalarKind::Float,
                width: 4,
            } => Some(UniformKind::Float),
            TypeInner::Vector {
                size,
                kind: ScalarKind::Float,
                width: 4,
            } => Some(match size {
                VectorSize::Bi => UniformKind::Vec2,
                VectorSize::Tri => UniformKind::Vec3,
                VectorSize::Quad => UniformKind::Vec4,
            }),
            TypeInner::Matrix {
                columns: VectorSize::Quad,
                rows: VectorSize::Quad,
                width: 4,
            } => Some(UniformKind::Mat4),
            _ => None,
        }
    }
}

/// A uniform the host code expects a program to expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDescriptor {
    pub name: String,
    pub kind: UniformKind,
}

impl UniformDescriptor {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Where a named uniform lives inside the program's block storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformSlot {
    pub block: usize,
    pub offset: u32,
    pub kind: UniformKind,
}

/// CPU copy of one `var<uniform>` binding.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBlock {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    data: Vec<u8>,
}

impl UniformBlock {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Texture,
    Sampler,
}

/// Non-uniform binding (texture or sampler) used by the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceSlot {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct StageSource {
    source: String,
    entry_point: String,
}

/// Successfully linked vertex + fragment program.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    vertex: StageSource,
    fragment: StageSource,
    blocks: Vec<UniformBlock>,
    uniforms: HashMap<String, UniformSlot>,
    resources: Vec<ResourceSlot>,
}

impl ShaderProgram {
    /// Compiles both stages and links them. A stage failure is reported
    /// before linking is attempted.
    pub fn compile(vertex_source: &str, fragment_source: &str) -> Result<Self, CompileError> {
        let vertex = compile_stage(ShaderStage::Vertex, naga::ShaderStage::Vertex, vertex_source)?;
        let fragment = compile_stage(
            ShaderStage::Fragment,
            naga::ShaderStage::Fragment,
            fragment_source,
        )?;
        // The naga modules are dropped here; only sources and reflection survive.
        link(vertex_source, &vertex, fragment_source, &fragment)
    }

    /// Like [`ShaderProgram::compile`] but also requires every descriptor in
    /// `required` to be present with the declared kind.
    pub fn compile_checked(
        vertex_source: &str,
        fragment_source: &str,
        required: &[UniformDescriptor],
    ) -> Result<Self, CompileError> {
        let program = Self::compile(vertex_source, fragment_source)?;
        program.check_uniforms(required)?;
        Ok(program)
    }

    fn check_uniforms(&self, required: &[UniformDescriptor]) -> Result<(), CompileError> {
        for descriptor in required {
            match self.uniforms.get(&descriptor.name) {
                None => {
                    return Err(CompileError::new(
                        ShaderStage::Link,
                        format!("uniform `{}` is not used by the program", descriptor.name),
                    ))
                }
                Some(slot) if slot.kind != descriptor.kind => {
                    return Err(CompileError::new(
                        ShaderStage::Link,
                        format!(
                            "uniform `{}` is {:?}, expected {:?}",
                            descriptor.name, slot.kind, descriptor.kind
                        ),
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn vertex_source(&self) -> &str {
        &self.vertex.source
    }

    pub fn fragment_source(&self) -> &str {
        &self.fragment.source
    }

    pub fn vertex_entry(&self) -> &str {
        &self.vertex.entry_point
    }

    pub fn fragment_entry(&self) -> &str {
        &self.fragment.entry_point
    }

    /// Uniform blocks ordered by `(group, binding)`.
    pub fn uniform_blocks(&self) -> &[UniformBlock] {
        &self.blocks
    }

    pub fn resources(&self) -> &[ResourceSlot] {
        &self.resources
    }

    pub fn uniform(&self, name: &str) -> Option<UniformSlot> {
        self.uniforms.get(name).copied()
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        self.write(name, UniformKind::Int, bytes_of(&value));
    }

    pub fn set_float(&mut self, name: &str, value: f32) {
        self.write(name, UniformKind::Float, bytes_of(&value));
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.write(name, UniformKind::Vec3, bytes_of(&value.to_array()));
    }

    pub fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.write(name, UniformKind::Mat4, bytes_of(&value.to_cols_array()));
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.read(name, UniformKind::Int).map(pod_read_unaligned)
    }

    pub fn float(&self, name: &str) -> Option<f32> {
        self.read(name, UniformKind::Float).map(pod_read_unaligned)
    }

    pub fn vec3(&self, name: &str) -> Option<Vec3> {
        self.read(name, UniformKind::Vec3)
            .map(|bytes| Vec3::from_array(pod_read_unaligned(bytes)))
    }

    pub fn mat4(&self, name: &str) -> Option<Mat4> {
        self.read(name, UniformKind::Mat4)
            .map(|bytes| Mat4::from_cols_array(&pod_read_unaligned(bytes)))
    }

    // Unknown, optimized-out or mistyped names are ignored.
    fn write(&mut self, name: &str, kind: UniformKind, bytes: &[u8]) {
        let Some(slot) = self.uniforms.get(name).copied() else {
            log::trace!("ignoring write to unknown uniform `{name}`");
            return;
        };
        if slot.kind != kind {
            log::trace!("ignoring {kind:?} write to {:?} uniform `{name}`", slot.kind);
            return;
        }
        let start = slot.offset as usize;
        self.blocks[slot.block].data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    fn read(&self, name: &str, kind: UniformKind) -> Option<&[u8]> {
        let slot = self.uniforms.get(name).filter(|slot| slot.kind == kind)?;
        let start = slot.offset as usize;
        Some(&self.blocks[slot.block].data[start..start + kind.size()])
    }
}

struct CompiledStage {
    module: Module,
    info: ModuleInfo,
    entry: usize,
}

fn compile_stage(
    stage: ShaderStage,
    kind: naga::ShaderStage,
    source: &str,
) -> Result<CompiledStage, CompileError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| CompileError::new(stage, err.emit_to_string(source)))?;
    let info = Validator::new(ValidationFlags::all(), Capabilities::empty())
        .validate(&module)
        .map_err(|err| CompileError::new(stage, error_chain(&err)))?;

    let mut entries = module
        .entry_points
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.stage == kind)
        .map(|(index, _)| index);
    let entry = entries
        .next()
        .ok_or_else(|| CompileError::new(stage, format!("no @{stage} entry point")))?;
    if entries.next().is_some() {
        return Err(CompileError::new(
            stage,
            format!("more than one @{stage} entry point"),
        ));
    }

    Ok(CompiledStage {
        module,
        info,
        entry,
    })
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut log = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        log.push_str(": ");
        log.push_str(&inner.to_string());
        source = inner.source();
    }
    log
}

#[derive(Debug, PartialEq)]
struct ReflectedBlock {
    name: String,
    size: u32,
    members: Vec<(String, u32, UniformKind)>,
}

#[derive(Default)]
struct StageReflection {
    blocks: BTreeMap<(u32, u32), ReflectedBlock>,
    resources: BTreeMap<(u32, u32), ResourceSlot>,
}

fn reflect(stage: &CompiledStage) -> StageReflection {
    let module = &stage.module;
    let usage = stage.info.get_entry_point(stage.entry);
    let mut reflection = StageReflection::default();

    for (handle, global) in module.global_variables.iter() {
        if usage[handle].is_empty() {
            continue;
        }
        let (Some(binding), Some(name)) = (&global.binding, &global.name) else {
            continue;
        };
        let key = (binding.group, binding.binding);
        match global.space {
            AddressSpace::Uniform => {
                let size = type_size(module, global.ty);
                let mut members = Vec::new();
                flatten(module, global.ty, name.clone(), 0, size, &mut members);
                reflection.blocks.insert(
                    key,
                    ReflectedBlock {
                        name: name.clone(),
                        size,
                        members,
                    },
                );
            }
            AddressSpace::Handle => {
                let kind = match module.types[global.ty].inner {
                    TypeInner::Image { .. } => ResourceKind::Texture,
                    TypeInner::Sampler { .. } => ResourceKind::Sampler,
                    _ => continue,
                };
                reflection.resources.insert(
                    key,
                    ResourceSlot {
                        name: name.clone(),
                        group: binding.group,
                        binding: binding.binding,
                        kind,
                    },
                );
            }
            _ => {}
        }
    }

    reflection
}

/// Bytes a uniform value of type `ty` occupies.
fn type_size(module: &Module, ty: Handle<Type>) -> u32 {
    match &module.types[ty].inner {
        TypeInner::Struct { span, .. } => *span,
        TypeInner::Array {
            size: ArraySize::Constant(count),
            stride,
            ..
        } => count.get() * stride,
        other => UniformKind::from_type(other).map_or(0, |kind| kind.size() as u32),
    }
}

/// Walks a uniform type and records every settable leaf. `extent` is the
/// number of bytes the value may occupy, used to size arrays nested in
/// structs.
fn flatten(
    module: &Module,
    ty: Handle<Type>,
    path: String,
    offset: u32,
    extent: u32,
    out: &mut Vec<(String, u32, UniformKind)>,
) {
    match &module.types[ty].inner {
        TypeInner::Struct { members, span } => {
            for (index, member) in members.iter().enumerate() {
                let Some(name) = &member.name else {
                    continue;
                };
                let end = members.get(index + 1).map_or(*span, |next| next.offset);
                flatten(
                    module,
                    member.ty,
                    format!("{path}.{name}"),
                    offset + member.offset,
                    end - member.offset,
                    out,
                );
            }
        }
        TypeInner::Array { base, stride, .. } => {
            let count = if *stride == 0 { 0 } else { extent / stride };
            for index in 0..count {
                flatten(
                    module,
                    *base,
                    format!("{path}[{index}]"),
                    offset + index * stride,
                    *stride,
                    out,
                );
            }
        }
        inner => {
            if let Some(kind) = UniformKind::from_type(inner) {
                out.push((path, offset, kind));
            }
        }
    }
}

fn stage_inputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut locations = BTreeMap::new();
    let function = &stage.module.entry_points[stage.entry].function;
    for argument in &function.arguments {
        collect_locations(
            &stage.module,
            argument.ty,
            argument.binding.as_ref(),
            &mut locations,
        );
    }
    locations
}

fn stage_outputs(stage: &CompiledStage) -> BTreeMap<u32, TypeInner> {
    let mut locations = BTreeMap::new();
    if let Some(result) = &stage.module.entry_points[stage.entry].function.result {
        collect_locations(
            &stage.module,
            result.ty,
            result.binding.as_ref(),
            &mut locations,
        );
    }
    locations
}

fn collect_locations(
    module: &Module,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut BTreeMap<u32, TypeInner>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => {
            out.insert(*location, module.types[ty].inner.clone());
        }
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

fn link(
    vertex_source: &str,
    vertex: &CompiledStage,
    fragment_source: &str,
    fragment: &CompiledStage,
) -> Result<ShaderProgram, CompileError> {
    let outputs = stage_outputs(vertex);
    for (location, input) in stage_inputs(fragment) {
        match outputs.get(&location) {
            None => {
                return Err(CompileError::new(
                    ShaderStage::Link,
                    format!("fragment input at location {location} is not written by the vertex stage"),
                ))
            }
            Some(output) if *output != input => {
                return Err(CompileError::new(
                    ShaderStage::Link,
                    format!("location {location} has different types in the vertex and fragment stages"),
                ))
            }
            Some(_) => {}
        }
    }

    let StageReflection {
        mut blocks,
        mut resources,
    } = reflect(vertex);
    let fragment_reflection = reflect(fragment);

    for (key, block) in fragment_reflection.blocks {
        match blocks.get(&key) {
            Some(existing) if *existing != block => {
                return Err(CompileError::new(
                    ShaderStage::Link,
                    format!(
                        "uniform block at group {} binding {} is declared differently by the two stages",
                        key.0, key.1
                    ),
                ))
            }
            Some(_) => {}
            None => {
                blocks.insert(key, block);
            }
        }
    }
    for (key, resource) in fragment_reflection.resources {
        match resources.get(&key) {
            Some(existing) if *existing != resource => {
                return Err(CompileError::new(
                    ShaderStage::Link,
                    format!(
                        "resource at group {} binding {} is declared differently by the two stages",
                        key.0, key.1
                    ),
                ))
            }
            Some(_) => {}
            None => {
                resources.insert(key, resource);
            }
        }
    }

    let mut uniform_blocks = Vec::with_capacity(blocks.len());
    let mut uniforms = HashMap::new();
    for ((group, binding), block) in blocks {
        let index = uniform_blocks.len();
        for (name, offset, kind) in block.members {
            let slot = UniformSlot {
                block: index,
                offset,
                kind,
            };
            if uniforms.insert(name.clone(), slot).is_some() {
                return Err(CompileError::new(
                    ShaderStage::Link,
                    format!("uniform `{name}` is bound more than once"),
                ));
            }
        }
        // Uniform buffer bindings are sized in 16-byte units.
        let size = (block.size as usize + 15) / 16 * 16;
        uniform_blocks.push(UniformBlock {
            name: block.name,
            group,
            binding,
            data: vec![0; size],
        });
    }

    Ok(ShaderProgram {
        vertex: StageSource {
            source: vertex_source.to_owned(),
            entry_point: vertex.module.entry_points[vertex.entry].name.clone(),
        },
        fragment: StageSource {
            source: fragment_source.to_owned(),
            entry_point: fragment.module.entry_points[fragment.entry].name.clone(),
        },
        blocks: uniform_blocks,
        uniforms,
        resources: resources.into_values().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTEX: &str = r#"
struct Globals {
    view_proj: mat4x4<f32>,
    tint: vec3<f32>,
    strength: f32,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(@location(0) position: vec3<f32>) -> VertexOutput {
    var out: VertexOutput;
    out.position = globals.view_proj * vec4<f32>(position, 1.0);
    out.color = globals.tint * globals.strength;
    return out;
}
"#;

    const FRAGMENT: &str = r#"
struct Light {
    color: vec3<f32>,
    enabled: i32,
}

struct Settings {
    lights: array<Light, 2>,
    exposure: f32,
}

@group(0) @binding(1)
var<uniform> settings: Settings;

@group(0) @binding(2)
var<uniform> unused: vec4<f32>;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    var total = color;
    for (var i = 0; i < 2; i = i + 1) {
        if (settings.lights[i].enabled != 0) {
            total = total + settings.lights[i].color;
        }
    }
    return vec4<f32>(total * settings.exposure, 1.0);
}
"#;

    fn program() -> ShaderProgram {
        ShaderProgram::compile(VERTEX, FRAGMENT).unwrap()
    }

    #[test]
    fn reflects_uniforms_from_both_stages() {
        let program = program();
        assert_eq!(program.vertex_entry(), "vs_main");
        assert_eq!(program.fragment_entry(), "fs_main");
        assert_eq!(program.uniform_blocks().len(), 2);
        assert_eq!(
            program.uniform("globals.tint"),
            Some(UniformSlot {
                block: 0,
                offset: 64,
                kind: UniformKind::Vec3
            })
        );
        assert_eq!(
            program.uniform("globals.strength").map(|slot| slot.offset),
            Some(76)
        );
        let second_light = program.uniform("settings.lights[1].enabled").unwrap();
        assert_eq!(second_light.block, 1);
        assert_eq!(second_light.offset, 16 + 12);
        assert_eq!(second_light.kind, UniformKind::Int);
        assert!(program.uniform("settings.lights[2].color").is_none());
        assert_eq!(program.uniform_count(), 3 + 4 + 1);
    }

    #[test]
    fn top_level_uniform_arrays_reflect_every_element() {
        let fragment = r#"
@group(0) @binding(1)
var<uniform> offsets: array<vec4<f32>, 2>;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0) + offsets[0] + offsets[1];
}
"#;
        let program = ShaderProgram::compile_checked(
            VERTEX,
            fragment,
            &[UniformDescriptor::new("offsets[1]", UniformKind::Vec4)],
        )
        .unwrap();
        let block = &program.uniform_blocks()[1];
        assert_eq!(block.name, "offsets");
        assert_eq!(block.size(), 32);
        assert_eq!(
            program.uniform("offsets[1]"),
            Some(UniformSlot {
                block: 1,
                offset: 16,
                kind: UniformKind::Vec4
            })
        );
        assert!(program.uniform("offsets[2]").is_none());
    }

    #[test]
    fn unused_uniforms_are_optimized_out() {
        let program = program();
        assert!(program.uniform_blocks().iter().all(|b| b.name != "unused"));
    }

    #[test]
    fn setters_write_and_read_back() {
        let mut program = program();
        let view_proj = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        program.set_mat4("globals.view_proj", view_proj);
        program.set_vec3("globals.tint", Vec3::new(0.25, 0.5, 0.75));
        program.set_float("globals.strength", 2.0);
        program.set_int("settings.lights[1].enabled", 1);

        assert_eq!(program.mat4("globals.view_proj"), Some(view_proj));
        assert_eq!(program.vec3("globals.tint"), Some(Vec3::new(0.25, 0.5, 0.75)));
        assert_eq!(program.float("globals.strength"), Some(2.0));
        assert_eq!(program.int("settings.lights[1].enabled"), Some(1));
        assert_eq!(program.int("settings.lights[0].enabled"), Some(0));

        let block = &program.uniform_blocks()[0];
        assert_eq!(&block.bytes()[76..80], &2.0f32.to_ne_bytes());
    }

    #[test]
    fn unknown_or_mistyped_uniforms_are_ignored() {
        let mut program = program();
        let before = program.uniform_blocks().to_vec();
        program.set_float("globals.missing", 1.0);
        program.set_float("globals.tint", 1.0);
        program.set_int("globals.strength", 7);
        assert_eq!(program.uniform_blocks(), &before[..]);
        assert_eq!(program.float("globals.tint"), None);
    }

    #[test]
    fn invalid_vertex_source_names_vertex_stage() {
        let err = ShaderProgram::compile("fn vs_main( {", FRAGMENT).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);
        assert!(!err.log.is_empty());
    }

    #[test]
    fn invalid_fragment_source_names_fragment_stage() {
        let broken = FRAGMENT.replace("vec4<f32>(total", "vec4<f32>(undefined_value");
        let err = ShaderProgram::compile(VERTEX, &broken).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Fragment);
        assert!(err.to_string().starts_with("fragment stage failed"));
    }

    #[test]
    fn missing_entry_point_is_a_stage_error() {
        let err = ShaderProgram::compile(FRAGMENT, FRAGMENT).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Vertex);
        assert!(err.log.contains("entry point"));
    }

    #[test]
    fn unmatched_fragment_input_fails_to_link() {
        let fragment = FRAGMENT.replace("@location(0) color: vec3<f32>", "@location(3) color: vec3<f32>");
        let err = ShaderProgram::compile(VERTEX, &fragment).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Link);
        assert!(err.log.contains("location 3"));
    }

    #[test]
    fn conflicting_block_layouts_fail_to_link() {
        let fragment = r#"
struct Globals {
    tint: vec3<f32>,
}

@group(0) @binding(0)
var<uniform> globals: Globals;

@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color * globals.tint, 1.0);
}
"#;
        let err = ShaderProgram::compile(VERTEX, fragment).unwrap_err();
        assert_eq!(err.stage, ShaderStage::Link);
    }

    #[test]
    fn checked_compile_rejects_missing_or_mistyped_uniforms() {
        let ok = ShaderProgram::compile_checked(
            VERTEX,
            FRAGMENT,
            &[
                UniformDescriptor::new("globals.tint", UniformKind::Vec3),
                UniformDescriptor::new("settings.exposure", UniformKind::Float),
            ],
        );
        assert!(ok.is_ok());

        let typo = ShaderProgram::compile_checked(
            VERTEX,
            FRAGMENT,
            &[UniformDescriptor::new("globals.tnit", UniformKind::Vec3)],
        )
        .unwrap_err();
        assert_eq!(typo.stage, ShaderStage::Link);
        assert!(typo.log.contains("globals.tnit"));

        let mistyped = ShaderProgram::compile_checked(
            VERTEX,
            FRAGMENT,
            &[UniformDescriptor::new("globals.strength", UniformKind::Int)],
        )
        .unwrap_err();
        assert_eq!(mistyped.stage, ShaderStage::Link);
    }
}
