pub mod disk;

/// Directory under the root reserved for in-flight uploads; never a gallery.
pub const TEMP_DIR_NAME: &str = ".temp";
