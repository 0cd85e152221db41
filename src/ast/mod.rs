mod ids;
mod module;
mod node;

pub use ids::*;
pub use module::Module;
pub use node::*;
