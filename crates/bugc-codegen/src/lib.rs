//! Component C10: lowers an analyzed [`bugc_ir::Module`] (post `bugc-check`,
//! `bugc-irgen`, `bugc-analysis`) into EVM bytecode.
//!
//! [`function`] emits one function's instructions against a symbolic model
//! of the EVM stack ([`stack`]); [`module`] assigns every function its
//! memory region and call linkage, then concatenates and patches the
//! runtime and deployment blobs.

mod codes;
mod error;
mod function;
mod module;
mod opcodes;
mod stack;

pub use error::CodegenError;
pub use function::Role;
pub use module::{compile_module, CodegenOutput};
