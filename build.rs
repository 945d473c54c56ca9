fn main() {
    // Exposes GIT_COMMIT_HASH and friends to the crate through OUT_DIR/built.rs.
    built::write_built_file().expect("Failed to acquire build-time information");
}
