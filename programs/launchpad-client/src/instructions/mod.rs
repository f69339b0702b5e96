pub mod initialize;
pub mod create;
pub mod buy;
pub mod sell;
pub mod oracle;
pub mod unlock;

pub use initialize::*;
pub use create::*;
pub use buy::*;
pub use sell::*;
pub use oracle::*;
pub use unlock::*;
