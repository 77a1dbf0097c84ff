pub mod fixtures;
pub mod nodes;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use nodes::*;
