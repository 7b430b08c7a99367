//! Generates foreign-language bindings for the `mfkit` library.

fn main() {
    uniffi::uniffi_bindgen_main();
}
