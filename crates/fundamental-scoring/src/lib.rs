pub mod bands;
pub mod growth;
pub mod margin;
pub mod ranker;
pub mod trend;

pub use bands::*;
pub use growth::*;
pub use margin::*;
pub use ranker::*;
pub use trend::*;
