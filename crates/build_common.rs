// README-to-rustdoc helper shared by every crate's build script.
// Pulled in with: include!("../build_common.rs");
//
// The including build.rs must import:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Copy a crate's README.md into `OUT_DIR` with links rewritten for rustdoc.
///
/// - `](src/queue.rs)` becomes `](queue)` so the link resolves to the module
/// - `](../../README.md` points at the repository URL from the workspace manifest
fn process_readme_for_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");
    println!("cargo:rerun-if-changed=../../Cargo.toml");

    let Ok(readme) = fs::read_to_string(Path::new(crate_dir).join("README.md")) else {
        return;
    };

    let mut doc = readme.replace("](src/", "](").replace(".rs)", ")");
    if let Some(url) = workspace_repository(crate_dir) {
        doc = doc.replace("](../../README.md", &format!("]({url}"));
    }

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    fs::write(Path::new(&out_dir).join("README_GENERATED.md"), doc)
        .expect("OUT_DIR is writable");
}

/// The `repository = "..."` value of the workspace Cargo.toml, if any.
fn workspace_repository(crate_dir: &str) -> Option<String> {
    let manifest = Path::new(crate_dir).parent()?.parent()?.join("Cargo.toml");
    let content = fs::read_to_string(manifest).ok()?;

    content.lines().map(str::trim).find_map(|line| {
        let value = line.strip_prefix("repository")?.trim_start().strip_prefix('=')?;
        let value = value.trim().strip_prefix('"')?;
        value.find('"').map(|end| value[..end].to_string())
    })
}
