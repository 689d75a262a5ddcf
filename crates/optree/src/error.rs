//! crate-wide error type
//!
//! Every module keeps its own error enum; this one folds them together
//! for callers that drive the whole pipeline and only want a single `?`.
use crate::access::AccessError;
use crate::adapt::AdaptError;
use crate::eval::EvalError;
use crate::load::LoadError;
use crate::path::PathError;
use crate::transform::ParseError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Path(#[from] PathError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Adapt(#[from] AdaptError),
    #[error(transparent)]
    Load(#[from] LoadError),
}

pub type Result<T> = std::result::Result<T, Error>;
