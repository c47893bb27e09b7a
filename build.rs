//! Build script to track include_str! dependencies.
//! Ensures cargo rebuilds when the embedded sample CSV changes.

fn main() {
    println!("cargo:rerun-if-changed=resources/sample_import.csv");
}
