//! IR generation use case

mod generate_ir;

pub use generate_ir::{generate_file_ir, FileInput};
