//! Permutation-flow-shop algorithms: the incremental tableau (C4), iterated
//! local search (C5), and bidirectional beam search (C6).

pub mod beam_search;
pub mod local_search;
pub mod tableau;

pub use beam_search::{BeamSearchParameters, Guide};
pub use local_search::IlsParameters;
pub use tableau::Tableau;
