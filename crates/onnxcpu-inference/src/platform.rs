//! Native runtime library per operating system and architecture.

use std::path::{Path, PathBuf};

use crate::error::InferenceError;
use crate::Result;

/// Directory the runtime libraries are shipped in, relative to the module.
pub const LIBRARY_DIR: &str = "third_party";

/// A runtime library built for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeLibrary {
    pub os: &'static str,
    pub arch: &'static str,
    pub file_name: &'static str,
}

impl NativeLibrary {
    /// Location of the library inside `dir`.
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name)
    }

    /// Location of the library in the default [`LIBRARY_DIR`].
    pub fn default_path(&self) -> PathBuf {
        self.path_in(Path::new(LIBRARY_DIR))
    }
}

const SUPPORTED: &[NativeLibrary] = &[
    NativeLibrary { os: "windows", arch: "x86_64", file_name: "onnxruntime.dll" },
    NativeLibrary { os: "macos", arch: "aarch64", file_name: "onnxruntime_arm64.dylib" },
    NativeLibrary { os: "linux", arch: "aarch64", file_name: "onnxruntime_arm64.so" },
    NativeLibrary { os: "linux", arch: "x86_64", file_name: "onnxruntime.so" },
    NativeLibrary { os: "android", arch: "x86", file_name: "onnx-android-x86.so" },
    NativeLibrary { os: "android", arch: "aarch64", file_name: "onnx-android-arm64-v8a.so" },
];

/// All platforms a runtime library is shipped for.
pub fn supported_platforms() -> &'static [NativeLibrary] {
    SUPPORTED
}

/// Look up the library for an OS / architecture pair.
pub fn library_for(os: &str, arch: &str) -> Result<&'static NativeLibrary> {
    SUPPORTED
        .iter()
        .find(|lib| lib.os == os && lib.arch == arch)
        .ok_or_else(|| InferenceError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        })
}

/// Library for the platform this binary was built for.
pub fn current_library() -> Result<&'static NativeLibrary> {
    library_for(std::env::consts::OS, std::env::consts::ARCH)
}
