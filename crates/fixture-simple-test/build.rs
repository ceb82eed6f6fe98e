use std::env;
use std::fs;
use std::path::PathBuf;

fn main() {
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    for script in ["memory.x", "link.x"] {
        fs::copy(format!("../harness/{}", script), out.join(script)).unwrap();
        println!("cargo:rerun-if-changed=../harness/{}", script);
    }

    // Host builds (clippy, docs) must not pick up the firmware linker scripts.
    if env::var("CARGO_CFG_TARGET_ARCH").as_deref() == Ok("riscv32") {
        println!("cargo:rustc-link-search={}", out.display());
        println!("cargo:rustc-link-arg=-Tmemory.x");
        println!("cargo:rustc-link-arg=-Tlink.x");
    }
}
