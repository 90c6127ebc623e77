// All the code apart from a facade lives in `lib.rs`, so the binary can be
// left out of wasm builds.

#[cfg(not(target_family = "wasm"))]
fn main() -> color_eyre::eyre::Result<()> {
    erqc::cli::main()
}

#[cfg(target_family = "wasm")]
fn main() {
    panic!("WASM not supported by `erqc` the binary; use the library.");
}
