//! Toolkit image references
//!
//! The action is published as one repository with a tag per toolchain
//! variant (`main-ubuntu22.04`, `gcc12-ubuntu22.04`, ...). Callers pick a
//! variant; the environment can redirect the repository or replace the
//! whole reference so a different toolkit build can be tested without
//! touching any test case.

/// Full image reference override, e.g. `my-registry/toolkit:dev`
pub const IMAGE_ENV: &str = "ACTION_CXX_TOOLKIT_IMAGE";
/// Repository override, combined with the selected variant as the tag
pub const REPO_ENV: &str = "ACTION_CXX_TOOLKIT_REPO";

pub const DEFAULT_REPO: &str = "lucteo/action-cxx-toolkit";
pub const DEFAULT_VARIANT: &str = "main-ubuntu22.04";

/// Toolchains published for one Ubuntu base
pub struct UbuntuRelease {
    pub version: &'static str,
    pub clang: &'static [&'static str],
    pub gcc: &'static [&'static str],
    pub nvcc: &'static [&'static str],
    /// (NVHPC version, CUDA flavour)
    pub nvhpc: &'static [(&'static str, &'static str)],
}

const NVCC: &[&str] = &["11.7.1", "11.8.0"];
const NVHPC: &[(&str, &str)] = &[
    ("22.7", "11.7"),
    ("22.7", "_multi"),
    ("22.9", "11.7"),
    ("22.9", "_multi"),
    ("22.11", "11.8"),
    ("22.11", "_multi"),
];

pub const RELEASES: &[UbuntuRelease] = &[
    UbuntuRelease {
        version: "20.04",
        clang: &["7", "8", "9", "10", "11", "12", "13", "14", "15", "dev"],
        gcc: &["7", "8", "9", "10", "11"],
        nvcc: NVCC,
        nvhpc: NVHPC,
    },
    UbuntuRelease {
        version: "22.04",
        clang: &["14", "15", "dev"],
        gcc: &["9", "10", "11", "12"],
        nvcc: NVCC,
        nvhpc: NVHPC,
    },
];

/// Every published tag, in publication order
pub fn variants() -> Vec<String> {
    let mut tags = Vec::new();
    for release in RELEASES {
        let u = release.version;
        tags.push(format!("main-ubuntu{}", u));
        for v in release.clang {
            tags.push(format!("clang{}-ubuntu{}", v, u));
        }
        for v in release.gcc {
            tags.push(format!("gcc{}-ubuntu{}", v, u));
            for cuda in release.nvcc {
                tags.push(format!("gcc{}-cuda{}-ubuntu{}", v, cuda, u));
            }
            for (hpc, cuda) in release.nvhpc {
                tags.push(format!("gcc{}-cuda{}-nvhpc{}-ubuntu{}", v, cuda, hpc, u));
            }
        }
    }
    tags
}

pub fn is_known_variant(variant: &str) -> bool {
    variants().iter().any(|tag| tag == variant)
}

/// Pick the image reference
///
/// Precedence: explicit reference, then the full-image override, then
/// `<repo override or default repo>:<variant>`.
pub fn resolve_image(
    explicit: Option<&str>,
    image_override: Option<&str>,
    repo_override: Option<&str>,
    variant: &str,
) -> String {
    if let Some(image) = explicit.or(image_override).filter(|s| !s.is_empty()) {
        return image.to_string();
    }
    let repo = repo_override
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_REPO);
    format!("{}:{}", repo, variant)
}

/// `resolve_image` fed from the process environment
pub fn image_from_env(explicit: Option<&str>, variant: &str) -> String {
    let image_override = std::env::var(IMAGE_ENV).ok();
    let repo_override = std::env::var(REPO_ENV).ok();
    resolve_image(
        explicit,
        image_override.as_deref(),
        repo_override.as_deref(),
        variant,
    )
}
