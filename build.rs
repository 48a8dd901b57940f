//! Build script: bake the installed alias name into packaged launchers

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PYMANAGER_EXE_NAME");

    // Packaging sets this per alias (py, pyw, python3, ...). When it is unset
    // the launcher derives its alias from argv[0] at runtime.
    if let Ok(name) = std::env::var("PYMANAGER_EXE_NAME") {
        if !name.is_empty() {
            println!("cargo:rustc-env=PYMANAGER_EXE_NAME={name}");
        }
    }
}
