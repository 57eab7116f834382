//! Shader compilation, program linking and introspection, and the shadow
//! store for uniform variables. Uniform writes land in a local byte buffer
//! and are uploaded in one batch right before a draw, one GL call per
//! variable that actually changed.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::gl::Gl;
use crate::native::ResourceType;
use crate::Share;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    Vertex,
    Pixel,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CreateShaderError {
    ObjectCreationFailed,
    CompilationFailed(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CreateProgramError {
    ObjectCreationFailed,
    LinkageFailed(String),
}

/// A compiled shader object.
pub struct Shader {
    share: Rc<Share>,
    pub name: u32,
    pub stage: Stage,
}

impl Shader {
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::Shader
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.share.context.delete_shader(self.name);
    }
}

pub fn create_shader(
    share: Rc<Share>,
    stage: Stage,
    source: &str,
) -> Result<Shader, CreateShaderError> {
    let gl = &share.context;
    let target = match stage {
        Stage::Vertex => glow::VERTEX_SHADER,
        Stage::Pixel => glow::FRAGMENT_SHADER,
    };
    let name = gl.create_shader(target);
    if name == 0 {
        return Err(CreateShaderError::ObjectCreationFailed);
    }
    gl.shader_source(name, source);
    gl.compile_shader(name);
    info!("\tCompiled shader {}", name);

    let status = gl.get_shader_compile_status(name);
    let log = gl.get_shader_info_log(name);
    if status {
        if !log.is_empty() {
            warn!("\tLog: {}", log);
        }
        Ok(Shader { share, name, stage })
    } else {
        gl.delete_shader(name);
        Err(CreateShaderError::CompilationFailed(log))
    }
}

/// The native type of a uniform variable.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UniformType {
    F32,
    F32Vector2,
    F32Vector3,
    F32Vector4,
    I32,
    I32Vector2,
    I32Vector3,
    I32Vector4,
    F32Matrix2,
    F32Matrix3,
    F32Matrix4,
}

impl UniformType {
    pub fn from_gl(storage: u32) -> Option<Self> {
        use self::UniformType::*;
        match storage {
            glow::FLOAT => Some(F32),
            glow::FLOAT_VEC2 => Some(F32Vector2),
            glow::FLOAT_VEC3 => Some(F32Vector3),
            glow::FLOAT_VEC4 => Some(F32Vector4),
            glow::INT => Some(I32),
            glow::INT_VEC2 => Some(I32Vector2),
            glow::INT_VEC3 => Some(I32Vector3),
            glow::INT_VEC4 => Some(I32Vector4),
            glow::FLOAT_MAT2 => Some(F32Matrix2),
            glow::FLOAT_MAT3 => Some(F32Matrix3),
            glow::FLOAT_MAT4 => Some(F32Matrix4),
            _ => None,
        }
    }

    /// Byte size of a single element of this type.
    pub fn byte_size(&self) -> usize {
        use self::UniformType::*;
        match *self {
            F32 | I32 => 4,
            F32Vector2 | I32Vector2 => 8,
            F32Vector3 | I32Vector3 => 12,
            F32Vector4 | I32Vector4 => 16,
            F32Matrix2 => 16,
            F32Matrix3 => 36,
            F32Matrix4 => 64,
        }
    }

    fn is_integer(&self) -> bool {
        use self::UniformType::*;
        match *self {
            I32 | I32Vector2 | I32Vector3 | I32Vector4 => true,
            _ => false,
        }
    }

    fn is_matrix(&self) -> bool {
        use self::UniformType::*;
        match *self {
            F32Matrix2 | F32Matrix3 | F32Matrix4 => true,
            _ => false,
        }
    }

    /// Component count of vector types, matrix dimension for matrices.
    fn components(&self) -> u8 {
        use self::UniformType::*;
        match *self {
            F32 | I32 => 1,
            F32Vector2 | I32Vector2 | F32Matrix2 => 2,
            F32Vector3 | I32Vector3 | F32Matrix3 => 3,
            F32Vector4 | I32Vector4 | F32Matrix4 => 4,
        }
    }
}

/// Reflection record of an active vertex attribute.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AttributeVar {
    pub name: String,
    pub location: i32,
    pub ty: u32,
}

/// Handle of a uniform variable within one program.
pub type UniformHandle = usize;

struct UniformSlot {
    name: String,
    location: i32,
    ty: UniformType,
    count: usize,
    store: Vec<u8>,
    dirty: bool,
}

/// A linked program with introspected inputs and a uniform shadow store.
pub struct Program {
    share: Rc<Share>,
    pub name: u32,
    pub attributes: Vec<AttributeVar>,
    uniforms: RefCell<Vec<UniformSlot>>,
}

impl Program {
    pub fn build(share: Rc<Share>, shaders: &[&Shader]) -> Result<Rc<Program>, CreateProgramError> {
        let names: SmallVec<[u32; 2]> = shaders.iter().map(|s| s.name).collect();
        let gl = &share.context;
        let name = gl.create_program();
        if name == 0 {
            return Err(CreateProgramError::ObjectCreationFailed);
        }
        for &sh in &names {
            gl.attach_shader(name, sh);
        }
        gl.link_program(name);
        info!("\tLinked program {}", name);

        let status = gl.get_program_link_status(name);
        let log = gl.get_program_info_log(name);
        if !status {
            gl.delete_program(name);
            return Err(CreateProgramError::LinkageFailed(log));
        }
        if !log.is_empty() {
            warn!("\tLog: {}", log);
        }

        let attributes = query_attributes(gl.as_ref(), name);
        let uniforms = query_uniforms(gl.as_ref(), name);
        let program = Program {
            share: share.clone(),
            name,
            attributes,
            uniforms: RefCell::new(uniforms),
        };
        Ok(Rc::new(program))
    }

    pub fn resource_type(&self) -> ResourceType {
        ResourceType::Program
    }

    /// Resolves a uniform name to a handle usable with the setters.
    pub fn uniform_handle(&self, name: &str) -> Option<UniformHandle> {
        self.uniforms.borrow().iter().position(|u| u.name == name)
    }

    pub fn uniform_count(&self) -> usize {
        self.uniforms.borrow().len()
    }

    /// Writes float data into the shadow store. Returns `false`, leaving
    /// the store untouched, if the handle is bad, the uniform is not a
    /// float vector, or the data does not fit the declared size.
    pub fn set_uniform_f32(&self, handle: UniformHandle, values: &[f32]) -> bool {
        self.set_raw(handle, as_bytes_f32(values), |ty| {
            !ty.is_integer() && !ty.is_matrix()
        })
    }

    /// As [`set_uniform_f32`](Self::set_uniform_f32), for integer vectors.
    pub fn set_uniform_i32(&self, handle: UniformHandle, values: &[i32]) -> bool {
        self.set_raw(handle, as_bytes_i32(values), |ty| ty.is_integer())
    }

    /// As [`set_uniform_f32`](Self::set_uniform_f32), for matrices given in
    /// column-major order.
    pub fn set_uniform_matrix(&self, handle: UniformHandle, values: &[f32]) -> bool {
        self.set_raw(handle, as_bytes_f32(values), |ty| ty.is_matrix())
    }

    fn set_raw<F>(&self, handle: UniformHandle, bytes: Vec<u8>, type_ok: F) -> bool
    where
        F: Fn(&UniformType) -> bool,
    {
        let mut uniforms = self.uniforms.borrow_mut();
        let slot = match uniforms.get_mut(handle) {
            Some(slot) => slot,
            None => {
                error!("Uniform handle {} out of range", handle);
                return false;
            }
        };
        if !type_ok(&slot.ty) {
            error!("Type mismatch writing uniform '{}'", slot.name);
            return false;
        }
        if bytes.len() > slot.store.len() {
            error!(
                "Uniform '{}' overflow: {} bytes into {}",
                slot.name,
                bytes.len(),
                slot.store.len()
            );
            return false;
        }
        slot.store[..bytes.len()].copy_from_slice(&bytes);
        slot.dirty = true;
        true
    }

    /// Uploads every dirty uniform with a single GL call each and clears
    /// the dirty flags. The program must be in use.
    pub fn update_uniforms(&self, gl: &dyn Gl) {
        let mut uniforms = self.uniforms.borrow_mut();
        for slot in uniforms.iter_mut() {
            if !slot.dirty {
                continue;
            }
            if slot.ty.is_matrix() {
                gl.uniform_matrix_f32(slot.location, slot.ty.components(), &as_f32(&slot.store));
            } else if slot.ty.is_integer() {
                gl.uniform_i32(slot.location, slot.ty.components(), &as_i32(&slot.store));
            } else {
                gl.uniform_f32(slot.location, slot.ty.components(), &as_f32(&slot.store));
            }
            slot.dirty = false;
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.share.context.delete_program(self.name);
    }
}

fn query_attributes(gl: &dyn Gl, prog: u32) -> Vec<AttributeVar> {
    let num = gl.get_active_attribute_count(prog);
    (0..num)
        .filter_map(|i| {
            let var = gl.get_active_attribute(prog, i)?;
            let loc = gl.get_attrib_location(prog, &var.name);
            // built-ins legitimately report location -1
            if loc == -1 && !var.name.starts_with("gl_") {
                error!("Invalid location {} for attribute {}", loc, var.name);
            }
            info!("\t\tAttrib[{}] = '{}'\t{:#x}", loc, var.name, var.ty);
            if var.name.starts_with("gl_") {
                None
            } else {
                Some(AttributeVar {
                    name: var.name,
                    location: loc,
                    ty: var.ty,
                })
            }
        })
        .collect()
}

fn query_uniforms(gl: &dyn Gl, prog: u32) -> Vec<UniformSlot> {
    let num = gl.get_active_uniform_count(prog);
    (0..num)
        .filter_map(|i| {
            let var = gl.get_active_uniform(prog, i)?;
            if var.name.starts_with("gl_") {
                return None;
            }
            let ty = match UniformType::from_gl(var.ty) {
                Some(ty) => ty,
                None => {
                    error!("Unrecognized uniform storage: {:#x}", var.ty);
                    return None;
                }
            };
            let loc = gl.get_uniform_location(prog, &var.name);
            if loc < 0 {
                error!("Invalid location for uniform '{}'", var.name);
                return None;
            }
            let count = (var.size.max(1)) as usize;
            info!("\t\tUniform[{}] = '{}'\t{:?}[{}]", loc, var.name, ty, count);
            Some(UniformSlot {
                name: var.name,
                location: loc,
                ty,
                count,
                store: vec![0; ty.byte_size() * count],
                dirty: false,
            })
        })
        .collect()
}

fn as_bytes_f32(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn as_bytes_i32(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

fn as_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn as_i32(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
