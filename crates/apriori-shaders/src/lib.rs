//! Overlay shader bytecode for the Apriori renderer.
//!
//! GLSL sources live in `shaders/`. The SPIR-V is either loaded at runtime
//! from `overlay.vert.spv` / `overlay.frag.spv`, or compiled at build time
//! and embedded with the `embedded` feature.

use apriori_gpu::OverlayShaders;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name of the compiled vertex stage.
pub const VERTEX_FILE: &str = "overlay.vert.spv";
/// File name of the compiled fragment stage.
pub const FRAGMENT_FILE: &str = "overlay.frag.spv";

/// SPIR-V magic number, first word of every module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("failed to read shader {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid SPIR-V in {name}: {reason}")]
    InvalidSpirv { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ShaderError>;

/// Decode SPIR-V bytes into words, fixing endianness.
pub fn decode_spirv(name: &str, bytes: &[u8]) -> Result<Vec<u32>> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|e| {
        ShaderError::InvalidSpirv {
            name: name.to_string(),
            reason: e.to_string(),
        }
    })?;

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&word) => Err(ShaderError::InvalidSpirv {
            name: name.to_string(),
            reason: format!("bad magic number {word:#010x}"),
        }),
        None => Err(ShaderError::InvalidSpirv {
            name: name.to_string(),
            reason: "empty module".to_string(),
        }),
    }
}

/// Overlay vertex and fragment bytecode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpirvShaders {
    vertex: Vec<u32>,
    fragment: Vec<u32>,
}

impl SpirvShaders {
    /// Decode both stages from raw SPIR-V bytes.
    pub fn from_bytes(vertex: &[u8], fragment: &[u8]) -> Result<Self> {
        Ok(Self {
            vertex: decode_spirv(VERTEX_FILE, vertex)?,
            fragment: decode_spirv(FRAGMENT_FILE, fragment)?,
        })
    }

    /// Load [`VERTEX_FILE`] and [`FRAGMENT_FILE`] from `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read(&path).map_err(|source| ShaderError::Io { path, source })
        };

        let shaders = Self::from_bytes(&read(VERTEX_FILE)?, &read(FRAGMENT_FILE)?)?;
        tracing::debug!(
            dir = %dir.display(),
            vertex_words = shaders.vertex.len(),
            fragment_words = shaders.fragment.len(),
            "Loaded overlay shaders"
        );
        Ok(shaders)
    }

    /// Bytecode compiled into the binary at build time.
    #[cfg(feature = "embedded")]
    pub fn embedded() -> Result<Self> {
        Self::from_bytes(
            include_bytes!(concat!(env!("OUT_DIR"), "/overlay.vert.spv")),
            include_bytes!(concat!(env!("OUT_DIR"), "/overlay.frag.spv")),
        )
    }
}

impl OverlayShaders for SpirvShaders {
    fn vertex_overlay(&self) -> &[u32] {
        &self.vertex
    }

    fn fragment_overlay(&self) -> &[u32] {
        &self.fragment
    }
}
