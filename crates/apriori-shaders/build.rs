//! Build script compiling the overlay GLSL shaders to SPIR-V.
//!
//! Compilation only runs with the `embedded` feature; without it the
//! bytecode is loaded at runtime from `.spv` files.

fn main() {
    println!("cargo:rerun-if-changed=shaders/");

    #[cfg(feature = "embedded")]
    embedded::compile_all();
}

#[cfg(feature = "embedded")]
mod embedded {
    use shaderc::{Compiler, ShaderKind};
    use std::env;
    use std::fs;
    use std::path::Path;

    pub fn compile_all() {
        let out_dir = env::var("OUT_DIR").unwrap();
        let shader_dir = Path::new("shaders");
        let compiler = Compiler::new().expect("Failed to create shader compiler");

        compile_shader(
            &compiler,
            shader_dir.join("overlay.vert"),
            Path::new(&out_dir).join("overlay.vert.spv"),
            ShaderKind::Vertex,
        );
        compile_shader(
            &compiler,
            shader_dir.join("overlay.frag"),
            Path::new(&out_dir).join("overlay.frag.spv"),
            ShaderKind::Fragment,
        );
    }

    fn compile_shader(
        compiler: &Compiler,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
        kind: ShaderKind,
    ) {
        let input_path = input.as_ref();
        let output_path = output.as_ref();

        let source = fs::read_to_string(input_path)
            .unwrap_or_else(|e| panic!("Failed to read shader {input_path:?}: {e}"));
        let file_name = input_path.file_name().unwrap().to_str().unwrap();

        // The renderer targets Vulkan 1.0.
        let mut options =
            shaderc::CompileOptions::new().expect("Failed to create compile options");
        options.set_target_env(
            shaderc::TargetEnv::Vulkan,
            shaderc::EnvVersion::Vulkan1_0 as u32,
        );
        options.set_target_spirv(shaderc::SpirvVersion::V1_0);
        options.set_optimization_level(shaderc::OptimizationLevel::Performance);

        let result = compiler
            .compile_into_spirv(&source, kind, file_name, "main", Some(&options))
            .unwrap_or_else(|e| panic!("Failed to compile shader {input_path:?}: {e}"));

        if result.get_num_warnings() > 0 {
            println!(
                "cargo:warning=Shader warnings in {input_path:?}: {}",
                result.get_warning_messages()
            );
        }

        fs::write(
            output_path,
            bytemuck::cast_slice::<u32, u8>(result.as_binary()),
        )
        .unwrap_or_else(|e| panic!("Failed to write shader {output_path:?}: {e}"));
    }
}
