pub mod cfg;
pub mod common;
pub mod dataflow;
pub mod dom;
pub mod opt;
pub mod regalloc;
pub mod ssa;
